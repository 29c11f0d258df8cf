use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for the code execution proxy
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExecuteRequest {
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub input: String,
}
