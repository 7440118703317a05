use crate::{
    auth::VetUser,
    errors::ApiError,
    handlers::common::{
        created_response, list_response, map_service_error, success_response, validate_input,
        SearchParams,
    },
    services::{
        clinical_records::ClinicalRecordInput,
        patients::PatientInput,
        treatments::{TreatmentInput, TreatmentStatusInput},
        vaccines::VaccineInput,
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use uuid::Uuid;

pub fn patients_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_patients).post(create_patient))
        .route(
            "/:id",
            get(patient_detail).put(update_patient).delete(deactivate_patient),
        )
        .route("/:id/record", get(patient_record).post(open_record))
        .route("/:id/vaccines", get(patient_vaccines).post(register_vaccine))
        .route("/:id/treatments", get(patient_treatments).post(register_treatment))
}

pub fn records_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_records))
        .route("/:id", get(record_detail).put(update_record))
}

pub fn vaccines_routes() -> Router<AppState> {
    Router::new().route("/", get(list_vaccines))
}

pub fn treatments_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_treatments))
        .route("/:id/status", put(set_treatment_status))
}

async fn list_patients(
    State(state): State<AppState>,
    _vet: VetUser,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let patients = state
        .services
        .patients
        .list(params.search.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(list_response(patients))
}

async fn create_patient(
    State(state): State<AppState>,
    vet: VetUser,
    Json(payload): Json<PatientInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let pet = state
        .services
        .patients
        .create(&vet, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(pet))
}

async fn patient_detail(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .patients
        .detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn update_patient(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PatientInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let pet = state
        .services
        .patients
        .update(&vet, id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(pet))
}

async fn deactivate_patient(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = state
        .services
        .patients
        .deactivate(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(pet))
}

async fn patient_record(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .records
        .detail_for_pet(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// 201 with the new record, or 200 with the one the patient already has.
async fn open_record(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClinicalRecordInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (record, created) = state
        .services
        .records
        .create(id, vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(if created {
        created_response(record)
    } else {
        success_response(record)
    })
}

async fn patient_vaccines(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .patients
        .get(id)
        .await
        .map_err(map_service_error)?;
    let vaccines = state
        .services
        .vaccines
        .list(Some(id))
        .await
        .map_err(map_service_error)?;
    Ok(list_response(vaccines))
}

async fn register_vaccine(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VaccineInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let vaccine = state
        .services
        .vaccines
        .register(id, vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(vaccine))
}

async fn patient_treatments(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .patients
        .get(id)
        .await
        .map_err(map_service_error)?;
    let treatments = state
        .services
        .treatments
        .list(Some(id))
        .await
        .map_err(map_service_error)?;
    Ok(list_response(treatments))
}

async fn register_treatment(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TreatmentInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let treatment = state
        .services
        .treatments
        .register(id, vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(treatment))
}

async fn list_records(
    State(state): State<AppState>,
    _vet: VetUser,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .services
        .records
        .list(params.search.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(list_response(records))
}

async fn record_detail(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .records
        .detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

async fn update_record(
    State(state): State<AppState>,
    vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClinicalRecordInput>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .services
        .records
        .update(id, vet.id(), payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

async fn list_vaccines(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let vaccines = state
        .services
        .vaccines
        .list(None)
        .await
        .map_err(map_service_error)?;
    Ok(list_response(vaccines))
}

async fn list_treatments(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let treatments = state
        .services
        .treatments
        .list(None)
        .await
        .map_err(map_service_error)?;
    Ok(list_response(treatments))
}

async fn set_treatment_status(
    State(state): State<AppState>,
    _vet: VetUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TreatmentStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    let treatment = state
        .services
        .treatments
        .set_status(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(treatment))
}
