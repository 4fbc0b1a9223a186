use crate::auth::authenticate;
use crate::comments::comment_view;
use crate::config::*;
use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::helpers::{json, now_iso, validate_uuid};
use crate::core::query_params::{page_params, parse_query_params, total_pages};
use crate::core::uploads;
use crate::models::models::{ContentRequest, Post, PostView, PostsPage, UserSummary};
use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use spin_sdk::http::{Request, Response};
use std::sync::OnceLock;
use uuid::Uuid;

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("Regex should compile"))
}

/// Sanitize post markup and turn bare URLs into links.
fn filter_post_content(content: &str) -> String {
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
        })
        .to_string()
}

fn validate_content(content: &str) -> Result<String, ApiError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Post content is required".to_string()));
    }
    if trimmed.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Post cannot exceed {} characters",
            MAX_POST_LENGTH
        )));
    }
    Ok(filter_post_content(trimmed))
}

/// Attach the author summary and up to `comment_limit` recent comments.
/// `None` populates the full thread.
pub fn post_view(
    db: &Documents,
    post: &Post,
    comment_limit: Option<usize>,
) -> anyhow::Result<Option<PostView>> {
    let author = match db.user(&post.author)? {
        Some(user) => UserSummary::from(&user),
        // Author is gone; the post is unrenderable.
        None => return Ok(None),
    };

    // Comment ids are stored oldest-first; the view is newest-first.
    let take = comment_limit.unwrap_or(post.comments.len());
    let mut comments = Vec::new();
    for id in post.comments.iter().rev().take(take) {
        if let Some(comment) = db.comment(id)? {
            if let Some(view) = comment_view(db, &comment)? {
                comments.push(view);
            }
        }
    }

    Ok(Some(PostView {
        id: post.id.clone(),
        author,
        content: post.content.clone(),
        image: post.image.clone(),
        likes: post.likes.clone(),
        like_count: post.likes.len(),
        comments,
        comment_count: post.comments.len(),
        created_at: post.created_at.clone(),
        updated_at: post.updated_at.clone(),
    }))
}

/// Accepts multipart form data or a plain JSON body.
pub fn create_post(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let content_type = req.header("content-type").and_then(|h| h.as_str());
    let is_multipart = content_type
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    // Content is validated before any blob is written so a rejected
    // request cannot leave an orphaned image behind.
    let (content, image) = if is_multipart {
        let form = match uploads::parse_multipart(content_type, req.body()) {
            Ok(form) => form,
            Err(err) => return Ok(err.into()),
        };
        let raw = form.fields.get("content").map(String::as_str).unwrap_or_default();
        let content = match validate_content(raw) {
            Ok(content) => content,
            Err(err) => return Ok(err.into()),
        };
        let image = match form.files.get("image") {
            Some(file) => {
                match uploads::store_image(db, file, "", MAX_POST_IMAGE_BYTES) {
                    Ok(path) => Some(path),
                    Err(err) => return Ok(err.into()),
                }
            }
            None => None,
        };
        (content, image)
    } else {
        let body: ContentRequest = match serde_json::from_slice(req.body()) {
            Ok(body) => body,
            Err(e) => {
                return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into())
            }
        };
        let content = match validate_content(&body.content) {
            Ok(content) => content,
            Err(err) => return Ok(err.into()),
        };
        (content, None)
    };

    let post = Post {
        id: Uuid::new_v4().to_string(),
        author: user_id,
        content,
        image,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now_iso(),
        updated_at: None,
    };

    db.insert_post(&post)?;

    match post_view(db, &post, Some(0))? {
        Some(view) => json(201, &view),
        None => Ok(ApiError::InternalError("Post author missing after insert".to_string()).into()),
    }
}

/// Shared pagination over a pre-filtered set of posts, newest-first.
fn paginate_posts(
    db: &Documents,
    mut posts: Vec<Post>,
    page: usize,
    limit: usize,
) -> anyhow::Result<PostsPage> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = posts.len();

    let mut views = Vec::new();
    for post in posts.into_iter().skip((page - 1) * limit).take(limit) {
        if let Some(view) = post_view(db, &post, Some(FEED_COMMENT_PREVIEW))? {
            views.push(view);
        }
    }

    Ok(PostsPage {
        posts: views,
        current_page: page,
        total_pages: total_pages(total, limit),
        total_posts: total,
    })
}

/// The feed: the viewer's own posts plus those of everyone they follow.
pub fn list_feed(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let viewer = match db.user(&user_id)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);

    let mut eligible = Vec::new();
    for id in db.feed_ids()? {
        if let Some(post) = db.post(&id)? {
            if post.author == user_id || viewer.following.contains(&post.author) {
                eligible.push(post);
            }
        }
    }

    json(200, &paginate_posts(db, eligible, page, limit)?)
}

pub fn list_user_posts(req: &Request, db: &Documents, user_id: &str) -> anyhow::Result<Response> {
    if !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("Invalid user id".to_string()).into());
    }
    if db.user(user_id)?.is_none() {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    }

    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);

    let mut posts = Vec::new();
    for id in db.user_post_ids(user_id)? {
        if let Some(post) = db.post(&id)? {
            posts.push(post);
        }
    }

    json(200, &paginate_posts(db, posts, page, limit)?)
}

pub fn get_post(db: &Documents, post_id: &str) -> anyhow::Result<Response> {
    let post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    match post_view(db, &post, None)? {
        Some(view) => json(200, &view),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

/// Author-only edit.
pub fn update_post(req: &Request, db: &Documents, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    if post.author != user_id {
        return Ok(ApiError::Forbidden("Not authorized to edit this post".to_string()).into());
    }

    let body: ContentRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into()),
    };

    let content = match validate_content(&body.content) {
        Ok(content) => content,
        Err(err) => return Ok(err.into()),
    };

    if post.content != content {
        post.content = content;
        post.updated_at = Some(now_iso());
        db.put_post(&post)?;
    }

    match post_view(db, &post, None)? {
        Some(view) => json(200, &view),
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

/// Author-only delete, cascading to the post's comments and stored image.
pub fn delete_post(req: &Request, db: &Documents, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    if post.author != user_id {
        return Ok(ApiError::Forbidden("Not authorized to delete this post".to_string()).into());
    }

    for comment_id in &post.comments {
        db.delete(&comment_key(comment_id))?;
    }
    if let Some(image) = &post.image {
        uploads::delete_stored(db, image)?;
    }
    db.remove_post(&post)?;

    json(200, &serde_json::json!({ "message": "Post deleted successfully" }))
}

/// Idempotent like toggle.
pub fn like_post(req: &Request, db: &Documents, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let was_liked = post.likes.iter().any(|id| id == &user_id);
    if was_liked {
        post.likes.retain(|id| id != &user_id);
    } else {
        post.likes.push(user_id);
    }
    db.put_post(&post)?;

    json(
        200,
        &serde_json::json!({ "liked": !was_liked, "likeCount": post.likes.len() }),
    )
}
