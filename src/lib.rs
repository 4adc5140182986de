pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::RelayConfig;
use crate::services::ingress::IngressService;
use crate::services::relay::BlobRelay;
use crate::utils::validation::MAX_UPLOAD_SIZE;
use axum::{Router, middleware::from_fn, routing::get, routing::post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom on top of the payload ceiling for multipart framing.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::get_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::UploadForm,
            api::handlers::health::HealthResponse,
            models::UploadResponse,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "Upload and retrieval of relayed objects"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

/// Shared by every request handler. The relay session inside is the one
/// opened at startup.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<dyn BlobRelay>,
    pub ingress: Arc<IngressService>,
    pub config: RelayConfig,
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_size.max(MAX_UPLOAD_SIZE) + MULTIPART_OVERHEAD;
    let static_dir = state.config.static_dir.clone();

    let mut app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload", post(api::handlers::files::upload_file))
        .route("/file/:handle", get(api::handlers::files::get_file))
        // Path used by earlier releases
        .route("/image/:handle", get(api::handlers::files::get_file));

    if let Some(dir) = static_dir {
        app = app
            .nest_service("/static", ServeDir::new(&dir))
            .route_service("/", ServeFile::new(dir.join("index.html")));
    }

    app.layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
