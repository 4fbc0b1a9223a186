//! Native development server: adapts actix-web requests onto the shared
//! route table.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    mod adapter {
        use actix_web::{HttpRequest, HttpResponse};
        use spin_sdk::http::{Method, Request, Response};

        pub fn to_spin_request(
            req: &HttpRequest,
            body: actix_web::web::Bytes,
        ) -> anyhow::Result<Request> {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                _ => Method::Get,
            };

            let uri = req.uri().to_string();
            let mut builder = Request::builder();
            let mut with_headers = builder.method(method).uri(&uri);

            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    with_headers = with_headers.header(name.as_str(), val_str);
                }
            }

            Ok(with_headers.body(body.to_vec()).build())
        }

        pub fn to_actix_response(spin_resp: Response) -> HttpResponse {
            let status = *spin_resp.status();
            let mut response = HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );
            for (name, value) in spin_resp.headers() {
                if let Some(val_str) = value.as_str() {
                    response.insert_header((name, val_str));
                }
            }
            response.body(spin_resp.body().to_vec())
        }
    }

    async fn handle_all(req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let spin_req = match adapter::to_spin_request(&req, body) {
            Ok(r) => r,
            Err(_) => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"message": "Invalid request"}))
            }
        };

        adapter::to_actix_response(socialsphere::handle_request(spin_req))
    }

    pub async fn run() -> std::io::Result<()> {
        env_logger::init();

        let addr = socialsphere::config::listen_addr();
        log::info!("server listening on http://{}", addr);

        HttpServer::new(|| App::new().default_service(web::route().to(handle_all)))
            .bind(addr)?
            .run()
            .await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
