//! Server-rendered profile pages at `GET /{username}`.

use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::static_server::Assets;
use spin_sdk::http::Response;

pub fn render_user_profile(db: &Documents, username: &str) -> anyhow::Result<Response> {
    let user = match db.user_by_username(&username.to_lowercase())? {
        Some(user) => user,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let template = Assets::get("profile.html")
        .ok_or_else(|| anyhow::anyhow!("Profile template not found"))?
        .data
        .to_vec();

    let mut html = String::from_utf8(template)?;

    html = html.replace("PROFILE_NAME", &html_escape::encode_text(&user.name));
    html = html.replace("PROFILE_USERNAME", &html_escape::encode_text(&user.username));
    html = html.replace(
        "PROFILE_FOLLOWERS",
        &user.followers.len().to_string(),
    );
    html = html.replace(
        "PROFILE_FOLLOWING",
        &user.following.len().to_string(),
    );
    html = html.replace(
        "PROFILE_POSTS",
        &db.user_post_ids(&user.id)?.len().to_string(),
    );

    let avatar = user
        .profile_picture
        .as_deref()
        .filter(|p| p.starts_with("/uploads/") || p.starts_with("https://"))
        .unwrap_or("/avatar-placeholder.svg");
    html = html.replace(
        "PROFILE_AVATAR",
        &html_escape::encode_double_quoted_attribute(avatar),
    );

    let bio_section = user
        .bio
        .as_ref()
        .map(|bio| {
            format!(
                r#"<p class="profile-bio">{}</p>"#,
                html_escape::encode_text(bio)
            )
        })
        .unwrap_or_default();
    html = html.replace("PROFILE_BIO", &bio_section);

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.into_bytes())
        .build())
}
