use crate::api::{ErrorResponse, SeatsResponse};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use freeseats::planes::data::SeatOperations;
use std::time::Instant;
use tracing::{error, info};

type ApiError = (StatusCode, Json<ErrorResponse>);

const USAGE: &str = "Use requests:
GET /1 - for get tickets for bus 1
GET /2A - for get tickets for bus 2A
POST /1 - for sell ticket for bus 1
POST /2A - for sell ticket for bus 2A
";

/// GET /
pub async fn index() -> &'static str {
    USAGE
}

/// GET /:bus_id
pub async fn get_free_seats(
    State(state): State<AppState>,
    Path(bus_id): Path<String>,
) -> Result<Json<SeatsResponse>, ApiError> {
    let backend = state.pick_backend();
    info!("GET: bus={}, backend={}", bus_id, backend.id);

    let start = Instant::now();
    let lookup = backend
        .seats
        .get_free_seats(&bus_id)
        .await
        .map_err(into_api_error)?;

    Ok(Json(SeatsResponse {
        bus_id,
        free_seats: lookup.free_seats,
        backend: backend.id,
        cached: lookup.cached(),
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

/// POST /:bus_id
pub async fn sell_ticket(
    State(state): State<AppState>,
    Path(bus_id): Path<String>,
) -> Result<Json<SeatsResponse>, ApiError> {
    let backend = state.pick_backend();
    info!("POST: bus={}, backend={}", bus_id, backend.id);

    let start = Instant::now();
    let free_seats = backend
        .seats
        .sell_ticket(&bus_id)
        .await
        .map_err(into_api_error)?;

    Ok(Json(SeatsResponse {
        bus_id,
        free_seats,
        backend: backend.id,
        cached: false,
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

fn into_api_error(err: shared::Error) -> ApiError {
    let status = match &err {
        shared::Error::NotFound => StatusCode::NOT_FOUND,
        e if e.is_conflict() => StatusCode::PRECONDITION_FAILED,
        _ => {
            error!("request failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(ErrorResponse::new(err.to_string())))
}
