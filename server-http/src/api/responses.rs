use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub backends: Vec<BackendStats>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStats {
    pub id: usize,
    /// Lookups that missed the cache and went to the store
    pub store_reads: u64,
}

// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// === Seat Models ===

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatsResponse {
    pub bus_id: String,
    pub free_seats: i64,
    pub backend: usize,
    pub cached: bool,
    pub duration_ms: f64,
}
