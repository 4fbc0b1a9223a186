pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod follow;
pub mod models;
pub mod posts;
pub mod templates;
pub mod users;

use crate::core::db::Documents;
use crate::core::errors::ApiError;
use crate::core::helpers::{json, now_iso};
use spin_sdk::http::{Method, Request, Response};
#[cfg(target_arch = "wasm32")]
use spin_sdk::http_component;

#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl spin_sdk::http::IntoResponse> {
    Ok(handle_request(req))
}

/// The one canonical route table, shared by the Spin component and the
/// native adapter binary.
pub fn handle_request(req: Request) -> Response {
    let origin = req
        .header("origin")
        .and_then(|h| h.as_str())
        .map(str::to_string);

    if req.method() == &Method::Options {
        return with_cors(preflight(), origin.as_deref());
    }

    let resp = match route(&req) {
        Ok(resp) => resp,
        Err(err) => {
            log::error!("unhandled error on {} {}: {}", req.method(), req.path(), err);
            ApiError::from(err).into()
        }
    };
    with_cors(resp, origin.as_deref())
}

fn route(req: &Request) -> anyhow::Result<Response> {
    let path = req.path();
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (req.method(), segments.as_slice()) {
        (Method::Get, ["api", "health"]) => health(),
        // Everything that touches the store goes through one readiness
        // gate: fail fast with 503 before any handler runs.
        (_, ["api", ..]) | (Method::Get, ["uploads", ..]) => match Documents::open() {
            Ok(db) => dispatch_api(req, &db, segments.as_slice()),
            Err(err) => Ok(err.into()),
        },
        (Method::Get, []) => crate::core::static_server::serve_static("/"),
        (Method::Get, _) if path.contains('.') => crate::core::static_server::serve_static(path),
        (Method::Get, [username]) => match Documents::open() {
            Ok(db) => templates::render_user_profile(&db, username),
            Err(err) => Ok(err.into()),
        },
        _ => not_found(path),
    }
}

fn dispatch_api(req: &Request, db: &Documents, segments: &[&str]) -> anyhow::Result<Response> {
    match (req.method(), segments) {
        // Auth
        (Method::Post, ["api", "auth", "register"]) => auth::register(req, db),
        (Method::Post, ["api", "auth", "login"]) => auth::login(req, db),
        (Method::Get, ["api", "auth", "me"]) => auth::me(req, db),

        // Users
        (Method::Get, ["api", "users", "search"]) => users::search_users(req, db),
        (Method::Get, ["api", "users", "explore"]) => users::explore_users(req, db),
        (Method::Put, ["api", "users", "profile"]) => users::update_profile(req, db),
        (Method::Post, ["api", "users", "upload-profile-picture"]) => {
            users::upload_profile_picture(req, db)
        }
        (Method::Get, ["api", "users", "id", id]) => users::get_user_by_id(req, db, id),
        (Method::Post, ["api", "users", id, "follow"]) => follow::handle_follow(req, db, id),
        (Method::Get, ["api", "users", username]) => users::get_user_profile(db, username),

        // Posts
        (Method::Post, ["api", "posts"]) => posts::create_post(req, db),
        (Method::Get, ["api", "posts"]) => posts::list_feed(req, db),
        (Method::Get, ["api", "posts", "user", id]) => posts::list_user_posts(req, db, id),
        (Method::Get, ["api", "posts", id]) => posts::get_post(db, id),
        (Method::Put, ["api", "posts", id]) => posts::update_post(req, db, id),
        (Method::Delete, ["api", "posts", id]) => posts::delete_post(req, db, id),
        (Method::Post, ["api", "posts", id, "like"]) => posts::like_post(req, db, id),

        // Comments
        (Method::Post, ["api", "posts", id, "comment"]) => comments::create_comment(req, db, id),
        (Method::Get, ["api", "posts", id, "comments"]) => comments::list_comments(req, db, id),
        (Method::Post, ["api", "posts", pid, "comments", cid, "like"]) => {
            comments::like_comment(req, db, pid, cid)
        }
        (Method::Post, ["api", "posts", pid, "comments", cid, "reply"]) => {
            comments::add_reply(req, db, pid, cid)
        }
        (Method::Delete, ["api", "posts", pid, "comments", cid]) => {
            comments::delete_comment(req, db, pid, cid)
        }

        // Uploaded images
        (Method::Get, ["uploads", name]) => crate::core::uploads::serve(db, name),

        _ => not_found(req.path()),
    }
}

fn health() -> anyhow::Result<Response> {
    let database = match Documents::open() {
        Ok(db) if db.probe() => "connected",
        _ => "unavailable",
    };
    json(
        200,
        &serde_json::json!({
            "status": "OK",
            "database": database,
            "timestamp": now_iso(),
        }),
    )
}

fn not_found(path: &str) -> anyhow::Result<Response> {
    json(
        404,
        &serde_json::json!({ "message": "Route not found", "path": path }),
    )
}

fn preflight() -> Response {
    Response::builder()
        .status(204)
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Authorization, Content-Type")
        .header("Access-Control-Max-Age", "86400")
        .body(Vec::new())
        .build()
}

/// Reflect the origin onto the response when it is on the allow-list.
fn with_cors(resp: Response, origin: Option<&str>) -> Response {
    let Some(origin) = origin else { return resp };
    if !config::allowed_origins().iter().any(|o| o == origin) {
        return resp;
    }

    let mut builder = Response::builder();
    builder.status(*resp.status());
    for (name, value) in resp.headers() {
        builder.header(name, value.as_str().unwrap_or_default());
    }
    builder.header("Access-Control-Allow-Origin", origin);
    builder.header("Vary", "Origin");
    builder.body(resp.body().to_vec()).build()
}
