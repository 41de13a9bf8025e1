use axum::response::Html;
use axum::Json;
use utoipa::OpenApi;

use crate::ApiDoc;

pub const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Built-in intake page, served when no static directory is configured.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
