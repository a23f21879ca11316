pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod kinds;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

/// Room for form fields and multipart framing on top of the file payload.
const BODY_SLACK: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Directorate Content API",
        version = "1.0.0",
        description = "Content management API for the directorate website. Every content kind \
            (leader, service, relation, charter, task, egovernment, structure, rekvizit, \
            employer, landarea, project) shares the same routes under `/api/{kind}`."
    ),
    tags(
        (name = "Content", description = "Create, list, update and delete content records"),
    ),
)]
struct ApiDoc;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    let body_limit = usize::try_from(state.config.storage.max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_SLACK);
    let uploads = ServeDir::new(&state.config.storage.uploads_dir);
    let cors = cors_layer(&state.config.server.cors);

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .nest_service("/uploads", uploads)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
