pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pagesmith API",
        version = "0.1.0",
        description = "Intake for generate-publish-notify rounds"
    ),
    paths(routes::health_check, routes::submit_task),
    components(schemas(
        routes::HealthResponse,
        routes::SubmitResponse,
        error::ErrorResponse,
        pagesmith_core::TaskRequest,
        pagesmith_core::Attachment,
        pagesmith_core::EvaluationPayload,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tasks", description = "Round intake endpoints"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    let router = Router::new()
        .route("/health", get(routes::health_check))
        .route("/api-endpoint", post(routes::submit_task))
        .route("/api/openapi.json", get(routes::openapi_json));

    let router = match static_dir {
        Some(dir) => router
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service("/static", ServeDir::new(&dir)),
        None => router.route("/", get(routes::index)),
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
