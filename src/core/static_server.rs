//! The embedded SPA: everything under `static/` is compiled into the
//! component and served for non-API paths.

use crate::core::errors::ApiError;
use rust_embed::RustEmbed;
use spin_sdk::http::Response;

#[derive(RustEmbed)]
#[folder = "static"]
pub struct Assets;

pub fn serve_static(path: &str) -> anyhow::Result<Response> {
    let file_path = match path {
        "/" | "/index.html" => "index.html",
        _ => path.trim_start_matches('/'),
    };

    let file = match Assets::get(file_path) {
        Some(file) => file,
        None => return Ok(ApiError::NotFound("File not found".to_string()).into()),
    };

    let mime = mime_guess::from_path(file_path).first_or_octet_stream();
    let mut builder = Response::builder();
    builder.status(200);
    builder.header("Content-Type", mime.as_ref());
    // The shell must stay fresh; scripts and styles can be cached briefly.
    if file_path != "index.html" {
        builder.header("Cache-Control", "public, max-age=3600");
    }
    Ok(builder.body(file.data.to_vec()).build())
}
