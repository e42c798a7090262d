pub mod responses;

pub use responses::{BackendStats, ErrorResponse, HealthResponse, SeatsResponse};
