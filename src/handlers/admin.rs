use crate::{
    auth::{Role, StaffUser},
    errors::ApiError,
    handlers::common::{created_response, list_response, map_service_error, no_content_response, success_response, validate_input},
    services::users::{CreateUserInput, UpdateUserInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<Role>,
}

/// Back-office endpoints for staff and superusers.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
}

async fn dashboard(
    State(state): State<AppState>,
    _staff: StaffUser,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state
        .services
        .dashboard
        .admin()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(dashboard))
}

async fn list_users(
    State(state): State<AppState>,
    _staff: StaffUser,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .services
        .users
        .list(query.role)
        .await
        .map_err(map_service_error)?;
    Ok(list_response(users))
}

async fn create_user(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(payload): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state
        .services
        .users
        .create_user(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(user))
}

async fn update_user(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state
        .services
        .users
        .update_user(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(user))
}

async fn delete_user(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if staff.id() == id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }
    state
        .services
        .users
        .delete_user(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
