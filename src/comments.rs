//! Comments are their own documents, referenced by id from the post.
//! Replies live inside their comment and have no independent like or
//! delete operations.

use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::helpers::{json, now_iso, sanitize_text};
use crate::core::query_params::{page_params, parse_query_params, total_pages};
use crate::models::models::{
    Comment, CommentView, CommentsPage, Reply, ReplyView, TextRequest, UserSummary,
};
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

fn validate_text(text: &str, what: &str) -> Result<String, ApiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} text is required", what)));
    }
    if trimmed.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "{} cannot exceed {} characters",
            what, MAX_COMMENT_LENGTH
        )));
    }
    Ok(sanitize_text(trimmed))
}

/// Attach author summaries. Returns `None` when the comment author no
/// longer exists.
pub fn comment_view(db: &Documents, comment: &Comment) -> anyhow::Result<Option<CommentView>> {
    let user = match db.user(&comment.user)? {
        Some(user) => UserSummary::from(&user),
        None => return Ok(None),
    };

    let mut replies = Vec::new();
    for reply in &comment.replies {
        if let Some(author) = db.user(&reply.user)? {
            replies.push(ReplyView {
                id: reply.id.clone(),
                user: UserSummary::from(&author),
                text: reply.text.clone(),
                created_at: reply.created_at.clone(),
            });
        }
    }

    Ok(Some(CommentView {
        id: comment.id.clone(),
        post: comment.post.clone(),
        user,
        content: comment.content.clone(),
        likes: comment.likes.clone(),
        like_count: comment.likes.len(),
        replies,
        created_at: comment.created_at.clone(),
    }))
}

pub fn create_comment(req: &Request, db: &Documents, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let body: TextRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into()),
    };

    let content = match validate_text(&body.text, "Comment") {
        Ok(content) => content,
        Err(err) => return Ok(err.into()),
    };

    let mut post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        post: post.id.clone(),
        user: user_id,
        content,
        likes: Vec::new(),
        replies: Vec::new(),
        created_at: now_iso(),
    };

    db.put_comment(&comment)?;
    post.comments.push(comment.id.clone());
    db.put_post(&post)?;

    match comment_view(db, &comment)? {
        Some(view) => json(201, &view),
        None => {
            Ok(ApiError::InternalError("Comment author missing after insert".to_string()).into())
        }
    }
}

/// Newest-first paginated comments for one post.
pub fn list_comments(req: &Request, db: &Documents, post_id: &str) -> anyhow::Result<Response> {
    let post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);
    let total = post.comments.len();

    let mut views = Vec::new();
    for id in post
        .comments
        .iter()
        .rev()
        .skip((page - 1) * limit)
        .take(limit)
    {
        if let Some(comment) = db.comment(id)? {
            if let Some(view) = comment_view(db, &comment)? {
                views.push(view);
            }
        }
    }

    json(
        200,
        &CommentsPage {
            comments: views,
            current_page: page,
            total_pages: total_pages(total, limit),
            total_comments: total,
        },
    )
}

/// Look up a comment and check it belongs to the post in the path.
fn comment_on_post(
    db: &Documents,
    post_id: &str,
    comment_id: &str,
) -> anyhow::Result<Result<Comment, ApiError>> {
    if db.post(post_id)?.is_none() {
        return Ok(Err(ApiError::NotFound("Post not found".to_string())));
    }
    match db.comment(comment_id)? {
        Some(comment) if comment.post == post_id => Ok(Ok(comment)),
        _ => Ok(Err(ApiError::NotFound("Comment not found".to_string()))),
    }
}

/// Idempotent like toggle.
pub fn like_comment(
    req: &Request,
    db: &Documents,
    post_id: &str,
    comment_id: &str,
) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut comment = match comment_on_post(db, post_id, comment_id)? {
        Ok(comment) => comment,
        Err(err) => return Ok(err.into()),
    };

    let was_liked = comment.likes.iter().any(|id| id == &user_id);
    if was_liked {
        comment.likes.retain(|id| id != &user_id);
    } else {
        comment.likes.push(user_id);
    }
    db.put_comment(&comment)?;

    json(
        200,
        &serde_json::json!({ "liked": !was_liked, "likeCount": comment.likes.len() }),
    )
}

/// Permitted to the comment author or the post author.
pub fn delete_comment(
    req: &Request,
    db: &Documents,
    post_id: &str,
    comment_id: &str,
) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut post = match db.post(post_id)? {
        Some(post) => post,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let comment = match db.comment(comment_id)? {
        Some(comment) if comment.post == post_id => comment,
        _ => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    if comment.user != user_id && post.author != user_id {
        return Ok(
            ApiError::Forbidden("Not authorized to delete this comment".to_string()).into(),
        );
    }

    post.comments.retain(|id| id != comment_id);
    db.put_post(&post)?;
    db.delete(&comment_key(comment_id))?;

    json(200, &serde_json::json!({ "message": "Comment deleted successfully" }))
}

pub fn add_reply(
    req: &Request,
    db: &Documents,
    post_id: &str,
    comment_id: &str,
) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let body: TextRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into()),
    };

    let text = match validate_text(&body.text, "Reply") {
        Ok(text) => text,
        Err(err) => return Ok(err.into()),
    };

    let mut comment = match comment_on_post(db, post_id, comment_id)? {
        Ok(comment) => comment,
        Err(err) => return Ok(err.into()),
    };

    comment.replies.push(Reply {
        id: Uuid::new_v4().to_string(),
        user: user_id,
        text,
        created_at: now_iso(),
    });
    db.put_comment(&comment)?;

    match comment_view(db, &comment)? {
        Some(view) => json(200, &view),
        None => Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_bounds() {
        assert!(validate_text("", "Comment").is_err());
        assert!(validate_text("  \n ", "Comment").is_err());
        assert!(validate_text(&"y".repeat(MAX_COMMENT_LENGTH), "Comment").is_ok());
        assert!(validate_text(&"y".repeat(MAX_COMMENT_LENGTH + 1), "Comment").is_err());
    }

    #[test]
    fn comment_text_is_plain() {
        let out = validate_text("<b>nice</b> post", "Comment").unwrap();
        assert_eq!(out, "nice post");
    }
}
