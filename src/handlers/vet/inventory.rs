use crate::{
    auth::VetUser,
    errors::ApiError,
    handlers::common::{created_response, list_response, map_service_error, success_response, validate_input},
    services::medication_egress::EgressInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(overview))
        .route("/alerts", get(alerts))
}

pub fn egress_routes() -> Router<AppState> {
    Router::new().route("/", get(list_egress).post(record_egress))
}

async fn overview(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let overview = state
        .services
        .inventory
        .overview()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(overview))
}

async fn alerts(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = state
        .services
        .inventory
        .alerts()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(alerts))
}

async fn list_egress(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let egress = state
        .services
        .egress
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(list_response(egress))
}

/// Dispenses medication; 422 when the catalogued stock is too low.
async fn record_egress(
    State(state): State<AppState>,
    vet: VetUser,
    Json(payload): Json<EgressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let egress = state
        .services
        .egress
        .record(vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(egress))
}
