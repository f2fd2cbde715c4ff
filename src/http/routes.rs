use super::handlers;
use super::state::AppState;
use super::ws;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let recordings = ServeDir::new(&state.orchestrator.config().recordings_dir);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Voice relay socket
        .route("/ws/voice", get(ws::ws_handler))
        // Section queries
        .route("/sections/:section_id", get(handlers::get_section))
        .route(
            "/sections/:section_id/utterances",
            get(handlers::get_section_utterances),
        )
        // Finished recordings
        .nest_service("/recordings", recordings)
        // Request logging and CORS
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
