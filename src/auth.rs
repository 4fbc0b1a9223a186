//! Register, login and `me`, plus the bearer-token check the private
//! routes share.

use crate::config::*;
use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, json, now_iso, sanitize_text, verify_password};
use crate::core::token;
use crate::models::models::{AuthUser, LoginRequest, RegisterRequest, User};
use regex::Regex;
use spin_sdk::http::{Request, Response};
use std::sync::OnceLock;
use uuid::Uuid;

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[\w.+-]+@[\w-]+(\.[\w-]+)+$").expect("Regex should compile")
    })
}

/// Field-level validation for registration. Returns the first failure.
fn validate_registration(body: &RegisterRequest) -> Option<String> {
    if body.name.trim().is_empty()
        || body.username.trim().is_empty()
        || body.email.trim().is_empty()
        || body.password.is_empty()
    {
        return Some("Please fill in all fields".to_string());
    }
    if body.name.chars().count() > MAX_NAME_LENGTH {
        return Some("Name is too long".to_string());
    }
    let username_len = body.username.trim().chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_len) {
        return Some(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        ));
    }
    if body.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !email_regex().is_match(body.email.trim()) {
        return Some("Please provide a valid email".to_string());
    }
    if let Some(bio) = &body.bio {
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Some(format!("Bio cannot exceed {} characters", MAX_BIO_LENGTH));
        }
    }
    None
}

pub fn register(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let body: RegisterRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into()),
    };

    if let Some(message) = validate_registration(&body) {
        return Ok(ApiError::BadRequest(message).into());
    }

    let username = sanitize_text(body.username.trim()).to_lowercase();
    let email = body.email.trim().to_lowercase();
    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Ok(ApiError::BadRequest("Username must not be markup".to_string()).into());
    }

    // Uniform disclosure policy: never reveal which field collided.
    if db.user_by_email(&email)?.is_some() || db.user_by_username(&username)?.is_some() {
        return Ok(ApiError::Conflict("Email or username already in use".to_string()).into());
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: sanitize_text(body.name.trim()),
        username,
        email,
        password: hash_password(&body.password)?,
        bio: body
            .bio
            .as_deref()
            .map(|b| sanitize_text(b.trim()))
            .filter(|b| !b.is_empty()),
        profile_picture: None,
        following: Vec::new(),
        followers: Vec::new(),
        created_at: now_iso(),
    };

    db.insert_user(&user)?;
    log::info!("registered user {}", user.username);

    let token = token::issue(&user.id)?;
    json(
        201,
        &serde_json::json!({ "token": token, "user": AuthUser::from(&user) }),
    )
}

pub fn login(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let body: LoginRequest = match serde_json::from_slice(req.body()) {
        Ok(body) => body,
        Err(e) => return Ok(ApiError::BadRequest(format!("Invalid request body: {}", e)).into()),
    };

    let identifier = body.identifier.trim().to_lowercase();

    // The identifier may be an email or a username. A miss and a wrong
    // password produce the same response.
    let user = match db.user_by_email(&identifier)? {
        Some(user) => Some(user),
        None => db.user_by_username(&identifier)?,
    };

    match user {
        Some(user) if verify_password(&body.password, &user.password) => {
            let token = token::issue(&user.id)?;
            json(
                200,
                &serde_json::json!({ "token": token, "user": AuthUser::from(&user) }),
            )
        }
        _ => json(401, &serde_json::json!({ "message": "Invalid credentials" })),
    }
}

pub fn me(req: &Request, db: &Documents) -> anyhow::Result<Response> {
    let user_id = match authenticate(req, db) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    match db.user(&user_id)? {
        Some(user) => json(200, &AuthUser::from(&user)),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

/// Returns the acting user's id when the request carries a valid bearer
/// token for a user that still exists.
pub fn authenticate(req: &Request, db: &Documents) -> Option<String> {
    let auth_header = req.header("authorization")?.as_str().unwrap_or_default();
    let token = auth_header.strip_prefix("Bearer ")?;
    let user_id = token::verify(token)?;
    match db.user(&user_id) {
        Ok(Some(_)) => Some(user_id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_body() -> RegisterRequest {
        RegisterRequest {
            name: "Jane Doe".to_string(),
            username: "janedoe".to_string(),
            email: "jane@example.com".to_string(),
            password: "secret99".to_string(),
            bio: None,
        }
    }

    #[test]
    fn registration_validation_accepts_good_input() {
        assert!(validate_registration(&valid_body()).is_none());
    }

    #[test]
    fn registration_validation_rejects_bad_input() {
        let mut body = valid_body();
        body.password = "short".to_string();
        assert!(validate_registration(&body).is_some());

        let mut body = valid_body();
        body.username = "ab".to_string();
        assert!(validate_registration(&body).is_some());

        let mut body = valid_body();
        body.email = "not-an-email".to_string();
        assert!(validate_registration(&body).is_some());

        let mut body = valid_body();
        body.name = String::new();
        assert!(validate_registration(&body).is_some());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{"identifier":"jane","password":"pw","admin":true}"#;
        assert!(serde_json::from_str::<LoginRequest>(raw).is_err());
    }
}
