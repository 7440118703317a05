//! Vet Clinic API Library
//!
//! Backend for a veterinary clinic with an attached pet store: product
//! catalog and inventory, session cart and checkout, appointment booking
//! and the clinical workflow used by the veterinarians.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod services;
pub mod session;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use utoipa::ToSchema;

use crate::session::{SessionSettings, SessionStore};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub sessions: SessionStore,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: config::AppConfig) -> Self {
        let db = Arc::new(db);
        let services = handlers::AppServices::new(db.clone(), &config);
        let sessions = SessionStore::new(SessionSettings::from(&config));
        Self {
            db,
            config,
            sessions,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// All `/api/v1` routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/catalog", handlers::catalog::catalog_routes())
        .nest("/products", handlers::catalog::products_routes())
        .nest("/cart", handlers::cart::cart_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/appointments", handlers::appointments::appointments_routes())
        .nest("/vet", handlers::vet::vet_routes())
        .nest("/admin", handlers::admin::admin_routes())
}

/// CORS policy from configuration: explicit origins when set, permissive
/// otherwise. [`config::AppConfig`] validation already rejects the
/// permissive fallback outside development unless it was opted into.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    match configured_origins {
        Some(origins) => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(cfg.cors_allow_credentials),
        None => {
            ::tracing::info!(
                "Using permissive CORS because explicit origins were not configured"
            );
            CorsLayer::permissive()
        }
    }
}

/// Full application: health checks, the v1 API and the middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::<AppState>::new()
        .route("/", get(|| async { "vetclinic-api up" }))
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api/v1", api_v1_routes())
        // Session cookie resolution for carts and logins
        .layer(axum::middleware::from_fn_with_state(
            state.sessions.clone(),
            session::session_middleware,
        ))
        .layer(axum::middleware::from_fn(request_logging_middleware))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "vetclinic-api",
        "timestamp": Utc::now().to_rfc3339(),
        "environment": state.config.environment,
        "active_sessions": state.sessions.len(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(err) => {
            ::tracing::warn!(error = %err, "database health check failed");
            "unhealthy"
        }
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(health_data))
}

// Request logging middleware
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    ::tracing::debug!(method = %method, uri = %uri, "Incoming request");

    let response = next.run(request).await;

    ::tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
