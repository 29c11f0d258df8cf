use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::clients::exec_client::lookup_language;
use crate::models::{ErrorResponse, ExecuteRequest};
use crate::state::AppState;

const EXECUTION_NOT_CONFIGURED: &str = "Code execution is not configured. \
Set EXEC_CLIENT_ID and EXEC_CLIENT_SECRET in the server environment to enable it.";

/// Proxy a code submission to the external execution service.
///
/// The service is an opaque request/response collaborator with no state
/// shared with the session engine; when its credentials are missing the
/// endpoint stays up and explains itself instead of failing.
pub async fn execute(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorResponse>)> {
    let Some(client) = &app_state.exec_client else {
        return Ok((
            StatusCode::OK,
            Json(json!({ "output": EXECUTION_NOT_CONFIGURED, "error": null })),
        ));
    };

    let Some(language) = lookup_language(&req.language) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                code: 400,
                status: "error".to_string(),
                error: format!("Unsupported language: {}", req.language),
            }),
        ));
    };

    info!("Executing {} snippet ({} bytes)", req.language, req.code.len());
    match client.execute(&req.code, &language, &req.input).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => {
            error!("Code execution failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: 500,
                    status: "error".to_string(),
                    error: "Code execution failed".to_string(),
                }),
            ))
        }
    }
}
