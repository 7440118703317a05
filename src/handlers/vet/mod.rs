/// Clinic API handlers. Every route requires the veterinarian flag.
pub mod appointments;
pub mod consultations;
pub mod inventory;
pub mod patients;

// Re-export route builders
pub use appointments::vet_appointments_routes;
pub use consultations::{consultations_routes, prescriptions_routes};
pub use inventory::{egress_routes, inventory_routes};
pub use patients::{patients_routes, records_routes, treatments_routes, vaccines_routes};

use crate::{
    auth::VetUser,
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::users::UpdateVetProfileInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

pub fn vet_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/profile", get(get_profile).put(update_profile))
        .merge(vet_appointments_routes())
        .nest("/patients", patients_routes())
        .nest("/records", records_routes())
        .nest("/consultations", consultations_routes())
        .nest("/prescriptions", prescriptions_routes())
        .nest("/vaccines", vaccines_routes())
        .nest("/treatments", treatments_routes())
        .nest("/inventory", inventory_routes())
        .nest("/egress", egress_routes())
}

async fn dashboard(
    State(state): State<AppState>,
    _vet: VetUser,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state
        .services
        .dashboard
        .vet()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(dashboard))
}

async fn get_profile(vet: VetUser) -> Result<impl IntoResponse, ApiError> {
    let profile = vet.profile.clone().ok_or(ApiError::Unauthorized)?;
    Ok(success_response(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    vet: VetUser,
    Json(payload): Json<UpdateVetProfileInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let profile = vet.profile.clone().ok_or(ApiError::Unauthorized)?;
    let updated = state
        .services
        .users
        .update_vet_profile(profile, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}
