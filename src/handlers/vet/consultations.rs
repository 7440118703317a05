use crate::{
    auth::VetUser,
    errors::ApiError,
    handlers::common::{created_response, list_response, map_service_error, success_response, validate_input},
    services::{
        consultations::{ConsultationFilter, ConsultationInput},
        prescriptions::{PrescriptionInput, PrescriptionItemInput},
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

pub fn consultations_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_consultations).post(create_consultation))
        .route("/:id", get(consultation_detail).put(update_consultation))
        .route("/:id/complete", post(complete_consultation))
        .route("/:id/prescriptions", post(issue_prescription))
}

pub fn prescriptions_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_prescriptions))
        .route("/:id", get(prescription_detail))
        .route("/:id/items", post(add_prescription_item))
}

async fn list_consultations(
    State(state): State<AppState>,
    _vet: VetUser,
    Query(filter): Query<ConsultationFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let consultations = state
        .services
        .consultations
        .list(filter)
        .await
        .map_err(map_service_error)?;
    Ok(list_response(consultations))
}

/// Opens a consultation for a patient, or for the pet an appointment was
/// booked for.
async fn create_consultation(
    State(state): State<AppState>,
    vet: VetUser,
    Json(payload): Json<ConsultationInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let consultation = state
        .services
        .consultations
        .create(vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(consultation))
}

async fn consultation_detail(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .consultations
        .detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn update_consultation(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsultationInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let consultation = state
        .services
        .consultations
        .update(id, vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(consultation))
}

async fn complete_consultation(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let consultation = state
        .services
        .consultations
        .complete(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(consultation))
}

async fn issue_prescription(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PrescriptionInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let prescription = state
        .services
        .prescriptions
        .create(id, vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(prescription))
}

async fn list_prescriptions(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let prescriptions = state
        .services
        .prescriptions
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(list_response(prescriptions))
}

async fn prescription_detail(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let prescription = state
        .services
        .prescriptions
        .detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(prescription))
}

async fn add_prescription_item(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PrescriptionItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let item = state
        .services
        .prescriptions
        .add_item(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(item))
}
