use crate::{
    errors::ApiError,
    handlers::common::{map_service_error, success_response, validate_input},
    services::cart::{AddToCartInput, UpdateCartItemInput},
    session::Session,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};

/// Creates the router for the session cart. No login is needed to shop.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).delete(clear_cart))
        .route("/items", post(add_to_cart))
        .route("/items/:key", put(update_cart_item).delete(remove_cart_item))
}

async fn view_cart(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    success_response(state.services.cart.view(&session))
}

async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AddToCartInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state
        .services
        .cart
        .add(&session, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(state.services.cart.view(&session)))
}

async fn update_cart_item(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
    Json(payload): Json<UpdateCartItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    state
        .services
        .cart
        .update(&session, &key, payload.quantity)
        .map_err(map_service_error)?;
    Ok(success_response(state.services.cart.view(&session)))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    session: Session,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .cart
        .remove(&session, &key)
        .map_err(map_service_error)?;
    Ok(success_response(state.services.cart.view(&session)))
}

async fn clear_cart(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    state.services.cart.clear(&session);
    success_response(state.services.cart.view(&session))
}
