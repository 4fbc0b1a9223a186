//! The asset store: multipart upload parsing, image blobs, `/uploads/*`.

use crate::config;
use crate::core::db::Documents;
use crate::core::errors::ApiError;
use multipart::server::Multipart;
use spin_sdk::http::Response;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use uuid::Uuid;

pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

/// Parse a `multipart/form-data` body into text fields and files.
pub fn parse_multipart(content_type: Option<&str>, body: &[u8]) -> Result<FormData, ApiError> {
    let content_type = content_type
        .ok_or_else(|| ApiError::BadRequest("Expected multipart/form-data".to_string()))?;
    if !content_type.starts_with("multipart/form-data") {
        return Err(ApiError::BadRequest("Expected multipart/form-data".to_string()));
    }
    let boundary = extract_boundary(content_type)
        .ok_or_else(|| ApiError::BadRequest("Missing multipart boundary".to_string()))?;

    let mut form = FormData::default();
    let mut parts = Multipart::with_body(Cursor::new(body), boundary);

    while let Some(mut entry) = parts
        .read_entry()
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = entry.headers.name.to_string();
        let mut data = Vec::new();
        entry
            .data
            .read_to_end(&mut data)
            .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?;

        if entry.headers.filename.is_some() || entry.headers.content_type.is_some() {
            form.files.insert(
                name,
                UploadedFile {
                    filename: entry.headers.filename.clone(),
                    content_type: entry.headers.content_type.as_ref().map(|m| m.to_string()),
                    data,
                },
            );
        } else {
            let text = String::from_utf8(data)
                .map_err(|_| ApiError::BadRequest("Form field is not valid UTF-8".to_string()))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

fn extract_boundary(content_type: &str) -> Option<String> {
    let marker = "boundary=";
    let start = content_type.find(marker)? + marker.len();
    let boundary = content_type[start..]
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches('"');
    if boundary.is_empty() {
        None
    } else {
        Some(boundary.to_string())
    }
}

/// Validate an uploaded image and write it under a generated name.
/// Returns the servable `/uploads/{name}` path.
pub fn store_image(
    db: &Documents,
    file: &UploadedFile,
    prefix: &str,
    max_bytes: usize,
) -> Result<String, ApiError> {
    let is_image = file
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(ApiError::BadRequest("Only image files are allowed".to_string()));
    }
    if file.data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if file.data.len() > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File too large (max {} MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    let name = format!("{}{}.{}", prefix, Uuid::new_v4(), file_extension(file));
    db.put_blob(&config::upload_key(&name), &file.data)
        .map_err(ApiError::from)?;
    Ok(format!("/uploads/{}", name))
}

fn file_extension(file: &UploadedFile) -> String {
    let from_name = file
        .filename
        .as_deref()
        .and_then(|f| std::path::Path::new(f).extension().and_then(|e| e.to_str()))
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        file.content_type
            .as_deref()
            .and_then(|ct| ct.strip_prefix("image/"))
            .map(|sub| sub.to_ascii_lowercase())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "img".to_string())
    })
}

/// Remove a previously stored image. External URLs and unknown paths are
/// left alone.
pub fn delete_stored(db: &Documents, path: &str) -> anyhow::Result<()> {
    if let Some(name) = path.strip_prefix("/uploads/") {
        if !name.is_empty() && !name.contains('/') {
            db.delete(&config::upload_key(name))?;
        }
    }
    Ok(())
}

/// Serve `/uploads/{name}`.
pub fn serve(db: &Documents, name: &str) -> anyhow::Result<Response> {
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Ok(ApiError::NotFound("File not found".to_string()).into());
    }
    match db.get_blob(&config::upload_key(name))? {
        Some(data) => {
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", mime.as_ref())
                .header("Cache-Control", "public, max-age=31536000, immutable")
                .body(data)
                .build())
        }
        None => Ok(ApiError::NotFound("File not found".to_string()).into()),
    }
}
