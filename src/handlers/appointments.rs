use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{created_response, list_response, map_service_error, success_response},
    services::appointments::AppointmentInput,
    AppState,
};
use axum::{
    extract::{Json, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AvailableHoursQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AvailableHours {
    pub date: NaiveDate,
    pub hours: Vec<String>,
}

/// Booking endpoints for pet owners.
pub fn appointments_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(my_appointments).post(book_appointment))
        .route("/available-hours", get(available_hours))
}

async fn my_appointments(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let appointments = state
        .services
        .appointments
        .mine(user.id())
        .await
        .map_err(map_service_error)?;
    Ok(list_response(appointments))
}

async fn book_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AppointmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    // Required fields and slot rules are reported together by the service.
    let appointment = state
        .services
        .appointments
        .book(&user.user, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(appointment))
}

async fn available_hours(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<AvailableHoursQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = state
        .services
        .appointments
        .available_hours(query.date)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(AvailableHours {
        date: query.date,
        hours: hours
            .into_iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect(),
    }))
}
