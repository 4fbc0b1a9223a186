use crate::auth::authenticate;
use crate::config::*;
use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::helpers::{json, sanitize_text, validate_uuid};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::uploads;
use crate::models::models::{AuthUser, UpdateProfileRequest, UserCard, UserProfile, UserSummary};
use regex::RegexBuilder;
use spin_sdk::http::{Request, Response};

fn summaries(db: &Documents, ids: &[String]) -> anyhow::Result<Vec<UserSummary>> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = db.user(id)? {
            out.push(UserSummary::from(&user));
        }
    }
    Ok(out)
}

/// Public profile with populated edges and the post count.
pub fn get_user_profile(db: &Documents, username: &str) -> anyhow::Result<Response> {
    let user = match db.user_by_username(&username.to_lowercase())? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let profile = UserProfile {
        followers: summaries(db, &user.followers)?,
        following: summaries(db, &user.following)?,
        posts_count: db.user_post_ids(&user.id)?.len(),
        id: user.id,
        name: user.name,
        username: user.username,
        bio: user.bio,
        profile_picture: user.profile_picture,
        created_at: user.created_at,
    };

    json(200, &profile)
}

/// Lookup by id.
pub fn get_user_by_id(req: &Request, db: &Documents, id: &str) -> anyhow::Result<Response> {
    if authenticate(req, db).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }
    if !validate_uuid(id) {
        return Ok(ApiError::BadRequest("Invalid user id".to_string()).into());
    }
    match db.user(id)? {
        Some(user) => json(200, &UserCard::from(&user)),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

/// Self-update only.
pub fn update_profile(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let body: UpdateProfileRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into()),
    };

    let mut user = match db.user(&user_id)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    if let Some(name) = &body.name {
        let name = sanitize_text(name.trim());
        if name.is_empty() {
            return Ok(ApiError::BadRequest("Name cannot be empty".to_string()).into());
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Ok(ApiError::BadRequest("Name is too long".to_string()).into());
        }
        user.name = name;
    }

    if let Some(bio) = &body.bio {
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest(format!(
                "Bio cannot exceed {} characters",
                MAX_BIO_LENGTH
            ))
            .into());
        }
        let bio = sanitize_text(bio.trim());
        user.bio = if bio.is_empty() { None } else { Some(bio) };
    }

    // Only externally hosted pictures can be set here; uploads go
    // through the dedicated endpoint.
    if let Some(picture) = &body.profile_picture {
        let picture = picture.trim();
        if picture.is_empty() {
            user.profile_picture = None;
        } else if picture.starts_with("http://") || picture.starts_with("https://") {
            user.profile_picture = Some(picture.to_string());
        } else {
            return Ok(
                ApiError::BadRequest("Profile picture must be an http(s) URL".to_string()).into(),
            );
        }
    }

    db.put_user(&user)?;
    json(200, &AuthUser::from(&user))
}

/// Case-insensitive substring match over name and username, capped.
pub fn search_users(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    if authenticate(req, db).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let params = parse_query_params(req.uri());
    let query = match get_string(&params, "q") {
        Some(q) => q,
        None => return Ok(ApiError::BadRequest("Search query is required".to_string()).into()),
    };

    let pattern = match RegexBuilder::new(&regex::escape(&query))
        .case_insensitive(true)
        .build()
    {
        Ok(p) => p,
        Err(_) => return Ok(ApiError::BadRequest("Invalid search query".to_string()).into()),
    };

    let mut results = Vec::new();
    for id in db.user_ids()? {
        if results.len() >= SEARCH_RESULT_LIMIT {
            break;
        }
        if let Some(user) = db.user(&id)? {
            if pattern.is_match(&user.name) || pattern.is_match(&user.username) {
                results.push(UserCard::from(&user));
            }
        }
    }

    json(200, &results)
}

/// Users the viewer does not follow yet, newest-registered first, capped.
pub fn explore_users(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let viewer = match db.user(&user_id)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let mut results = Vec::new();
    for id in db.user_ids()?.iter().rev() {
        if results.len() >= EXPLORE_RESULT_LIMIT {
            break;
        }
        if id == &user_id || viewer.following.contains(id) {
            continue;
        }
        if let Some(user) = db.user(id)? {
            results.push(UserCard::from(&user));
        }
    }

    json(200, &results)
}

/// Multipart avatar upload; replaces any previously stored picture.
pub fn upload_profile_picture(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let content_type = req.header("content-type").and_then(|h| h.as_str());
    let form = match uploads::parse_multipart(content_type, req.body()) {
        Ok(form) => form,
        Err(err) => return Ok(err.into()),
    };

    let file = match form.files.get("avatar") {
        Some(file) => file,
        None => return Ok(ApiError::BadRequest("No file uploaded".to_string()).into()),
    };

    let mut user = match db.user(&user_id)? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let path = match uploads::store_image(db, file, "profile-", MAX_AVATAR_BYTES) {
        Ok(path) => path,
        Err(err) => return Ok(err.into()),
    };

    // Drop the old locally hosted picture; external URLs are untouched.
    if let Some(old) = &user.profile_picture {
        uploads::delete_stored(db, old)?;
    }

    user.profile_picture = Some(path.clone());
    db.put_user(&user)?;

    json(
        200,
        &serde_json::json!({
            "message": "Profile picture uploaded successfully",
            "profilePicture": path,
        }),
    )
}
