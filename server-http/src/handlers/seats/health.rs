use crate::api::{BackendStats, HealthResponse};
use crate::state::AppState;
use axum::{Json, extract::State};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let backends = state
        .backends()
        .iter()
        .map(|backend| BackendStats {
            id: backend.id,
            store_reads: backend.seats.store_reads(),
        })
        .collect();

    Json(HealthResponse {
        message: "OK".into(),
        backends,
    })
}
