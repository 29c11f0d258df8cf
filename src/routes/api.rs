use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::handlers::{diagnostics, execute, health_check, ready_check};
use crate::state::AppState;
use crate::ws::handler::websocket_handler;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/diagnostics", get(diagnostics))
        .route("/execute", post(execute))
        .with_state(app_state)
}

/// Assemble the full application: REST API under `/api`, the WebSocket
/// endpoint at `/ws`, and Swagger UI.
pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    let api_routes = create_api_routes(app_state.clone());
    let ws_routes = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(app_state);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
