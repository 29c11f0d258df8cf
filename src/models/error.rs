use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Faults a protocol handler can report.
///
/// Validation problems carry the caller-facing message; internal faults
/// are logged in full and reported to the caller only generically.
/// Patch conflicts and lookups on absent rooms are not errors; they
/// resolve to silent drops and empty results inside the handlers.
#[derive(Debug)]
pub enum EngineError {
    Validation(String),
    Internal(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation error: {}", msg),
            EngineError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}
