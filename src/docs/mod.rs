use utoipa::OpenApi;

use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Engine and host diagnostics
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses(
        (status = 200, description = "Connection, room and host statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Execute a code snippet via the external execution service
#[utoipa::path(
    post,
    path = "/api/execute",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Execution output, or a notice when execution is not configured"),
        (status = 400, description = "Unsupported language", body = ErrorResponse),
        (status = 500, description = "Execution service failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn execute_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        execute_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, ExecuteRequest, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
