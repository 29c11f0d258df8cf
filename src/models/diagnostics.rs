use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Engine and host statistics returned by the diagnostics endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub n_conn: u32,
    pub n_rooms: u32,
    pub n_members: u32,
    pub n_presence: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
    pub timestamp: String,
}
