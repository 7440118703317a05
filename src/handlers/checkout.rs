use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{created_response, map_service_error, success_response},
    services::checkout::CheckoutInput,
    session::Session,
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::get,
    Router,
};

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout_form).post(checkout))
        .route("/confirmation", get(confirmation))
}

/// Customer details to pre-fill the form with, plus what is being bought.
async fn checkout_form(
    State(state): State<AppState>,
    user: AuthUser,
    session: Session,
) -> impl IntoResponse {
    success_response(serde_json::json!({
        "prefill": state.services.checkout.prefill(&user),
        "cart": state.services.cart.view(&session),
    }))
}

async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    session: Session,
    Json(payload): Json<CheckoutInput>,
) -> Result<impl IntoResponse, ApiError> {
    // Field rules run inside the service, after the empty-cart check.
    let summary = state
        .services
        .checkout
        .checkout(&session, &user, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(summary))
}

async fn confirmation(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .services
        .checkout
        .confirmation(&session)
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}
