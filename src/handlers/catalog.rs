use crate::{
    auth::StaffUser,
    errors::ApiError,
    handlers::common::{
        created_response, list_response, map_service_error, no_content_response,
        success_response, validate_input, PaginatedResponse,
    },
    services::catalog::{CatalogService, ProductInput, ProductSearch},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

/// Per-category CRUD, addressed by type tag and product code.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/:tag", get(list_category).post(create_product))
        .route(
            "/:tag/:code",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Cross-category search and lookup by id.
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(search_products))
        .route("/:id", get(get_product_by_id))
}

async fn list_category(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CatalogService::parse_tag(&tag).map_err(map_service_error)?;
    let products = state
        .services
        .catalog
        .list_by_category(category)
        .await
        .map_err(map_service_error)?;
    Ok(list_response(products))
}

async fn get_product(
    State(state): State<AppState>,
    Path((tag, code)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CatalogService::parse_tag(&tag).map_err(map_service_error)?;
    let product = state
        .services
        .catalog
        .get_by_code(category, &code)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn create_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(tag): Path<String>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CatalogService::parse_tag(&tag).map_err(map_service_error)?;
    validate_input(&payload)?;
    let product = state
        .services
        .catalog
        .create(category, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

async fn update_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path((tag, code)): Path<(String, String)>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CatalogService::parse_tag(&tag).map_err(map_service_error)?;
    validate_input(&payload)?;
    let product = state
        .services
        .catalog
        .update(category, &code, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

async fn delete_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path((tag, code)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let category = CatalogService::parse_tag(&tag).map_err(map_service_error)?;
    state
        .services
        .catalog
        .delete(category, &code)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductSearch>,
) -> Result<impl IntoResponse, ApiError> {
    let per_page = state.config.page_size(params.per_page);
    let page = state
        .services
        .catalog
        .search(params, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        page.products,
        page.page,
        page.per_page,
        page.total,
    )))
}

async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_by_id(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}
