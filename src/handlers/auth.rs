use crate::{
    auth::{AuthUser, Role},
    entities::vet_profile,
    errors::ApiError,
    handlers::common::{created_response, map_service_error, no_content_response, success_response, validate_input},
    services::users::{LoginInput, SignupInput, UserSummary},
    session::Session,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::info;

/// Who is logged in and where their home screen is.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user: UserSummary,
    pub profile: Option<vet_profile::Model>,
    pub landing: &'static str,
}

impl AccountResponse {
    fn new(user: &AuthUser) -> Self {
        Self {
            user: UserSummary::new(&user.user, user.profile.as_ref()),
            profile: user.profile.clone(),
            landing: user.role().landing_path(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LandingResponse {
    pub role: Role,
    pub path: &'static str,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/landing", get(landing))
}

/// Creates a customer account and logs it in. Never grants staff or
/// veterinarian rights.
async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<SignupInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state
        .services
        .users
        .signup(payload)
        .await
        .map_err(map_service_error)?;
    session.login(user.id);

    let account = AuthUser { user, profile: None };
    Ok(created_response(AccountResponse::new(&account)))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let user = state
        .services
        .users
        .authenticate(payload)
        .await
        .map_err(map_service_error)?;
    session.login(user.id);

    let (user, profile) = state
        .services
        .users
        .find_with_profile(user.id)
        .await
        .map_err(map_service_error)?
        .ok_or(ApiError::Unauthorized)?;
    Ok(success_response(AccountResponse::new(&AuthUser { user, profile })))
}

async fn logout(session: Session) -> impl IntoResponse {
    if let Some(user_id) = session.user_id() {
        info!(user_id = %user_id, "user logged out");
    }
    session.logout();
    no_content_response()
}

async fn me(user: AuthUser) -> impl IntoResponse {
    success_response(AccountResponse::new(&user))
}

/// Role-based home: staff to the admin dashboard, veterinarians to the
/// clinic dashboard, everyone else to the store.
async fn landing(user: AuthUser) -> impl IntoResponse {
    let role = user.role();
    success_response(LandingResponse {
        role,
        path: role.landing_path(),
    })
}
