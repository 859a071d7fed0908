pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Toolbelt Studio API",
        version = "0.1.0",
        description = "Answers user requests by synthesizing single-purpose tools on demand and executing them"
    ),
    paths(
        routes::health_check,
        routes::start_session,
        routes::get_session,
        routes::sse::events_stream,
    ),
    components(schemas(
        routes::HealthResponse,
        routes::SessionResponse,
        toolbelt_core::SessionRequest,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Toolbelt session endpoints"),
        (name = "events", description = "Real-time event streaming (SSE)"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health_check))
        .route("/start-session", post(routes::start_session))
        .route("/api/sessions/{id}", get(routes::get_session))
        .route("/api/events", get(routes::sse::events_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
