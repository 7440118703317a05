use crate::{
    auth::VetUser,
    errors::ApiError,
    handlers::common::{list_response, map_service_error, no_content_response, success_response},
    services::appointments::{AppointmentFilter, AppointmentInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AgendaQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: AppointmentFilter,
}

pub fn vet_appointments_routes() -> Router<AppState> {
    Router::new()
        .route("/agenda", get(agenda))
        .route("/appointments", get(list_appointments))
        .route(
            "/appointments/:id",
            get(appointment_detail)
                .put(update_appointment)
                .delete(delete_appointment),
        )
}

/// The day's bookings (today by default) and the week ahead.
async fn agenda(
    State(state): State<AppState>,
    _vet: VetUser,
    Query(query): Query<AgendaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    let agenda = state
        .services
        .appointments
        .agenda(date)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(agenda))
}

async fn list_appointments(
    State(state): State<AppState>,
    _vet: VetUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let appointments = state
        .services
        .appointments
        .list(query.filter)
        .await
        .map_err(map_service_error)?;
    Ok(list_response(appointments))
}

async fn appointment_detail(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .appointments
        .detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn update_appointment(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppointmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = state
        .services
        .appointments
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(appointment))
}

async fn delete_appointment(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .appointments
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
