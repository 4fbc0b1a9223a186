//! Environment-driven configuration and compile-time limits.

// === Content limits ===
pub const MAX_POST_LENGTH: usize = 2000;
pub const MAX_COMMENT_LENGTH: usize = 500;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MIN_PASSWORD_LENGTH: usize = 6;

// === Upload ceilings ===
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_POST_IMAGE_BYTES: usize = 5 * 1024 * 1024;

// === Paging ===
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;
pub const FEED_COMMENT_PREVIEW: usize = 2;
pub const SEARCH_RESULT_LIMIT: usize = 10;
pub const EXPLORE_RESULT_LIMIT: usize = 20;

// === Store keys ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const FEED_KEY: &str = "feed";

pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn comment_key(id: &str) -> String {
    format!("comment:{}", id)
}

pub fn upload_key(name: &str) -> String {
    format!("upload:{}", name)
}

// === Environment ===

pub fn token_secret() -> String {
    std::env::var("SPHERE_TOKEN_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string())
}

pub fn token_expiry_days() -> i64 {
    std::env::var("SPHERE_TOKEN_EXPIRY_DAYS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(30)
}

/// Comma-separated list of CORS-allowed origins. Empty means same-origin only.
pub fn allowed_origins() -> Vec<String> {
    std::env::var("SPHERE_ALLOWED_ORIGINS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn is_production() -> bool {
    std::env::var("SPHERE_ENV")
        .map(|v| v == "production")
        .unwrap_or(false)
}

pub fn listen_addr() -> String {
    std::env::var("SPHERE_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
