#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use chrono::{Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use tower::ServiceExt;
use vetclinic_api::{
    auth::Role,
    build_router,
    config::AppConfig,
    db,
    entities::product::{self, ProductCategory},
    services::{
        catalog::ProductInput,
        users::{CreateUserInput, UserSummary},
    },
    AppState,
};

pub const PASSWORD: &str = "secret123";

/// Helper harness for spinning up the application backed by an in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps the in-memory database alive and shared.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.session_cookie_name = "vetclinic_session".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(pool, cfg);
        let router = build_router(state.clone());

        Self { router, state }
    }

    /// Send a request against the router with an optional session cookie.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates an account with the given role and the shared test password.
    pub async fn create_user(&self, username: &str, role: Role) -> UserSummary {
        self.state
            .services
            .users
            .create_user(CreateUserInput {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: String::new(),
                last_name: String::new(),
                password: PASSWORD.to_string(),
                role,
            })
            .await
            .expect("create test user")
    }

    /// Logs in through the API and returns the `name=value` cookie pair.
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                Some(serde_json::json!({ "username": username, "password": PASSWORD })),
                None,
            )
            .await;
        assert_eq!(response.status(), 200, "login should succeed for {}", username);
        session_cookie(&response).expect("login sets a session cookie")
    }

    /// Creates a user with `role` and returns a logged-in cookie for it.
    pub async fn login_as(&self, username: &str, role: Role) -> String {
        self.create_user(username, role).await;
        self.login(username).await
    }

    pub async fn seed_product(
        &self,
        category: ProductCategory,
        code: &str,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> product::Model {
        self.state
            .services
            .catalog
            .create(
                category,
                ProductInput {
                    code: code.to_string(),
                    name: name.to_string(),
                    brand: None,
                    price,
                    stock,
                    description: None,
                    attributes: BTreeMap::new(),
                },
            )
            .await
            .expect("seed product for tests")
    }
}

/// The `name=value` part of the session `Set-Cookie` header, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("vetclinic_session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// A date safely in the future for booking tests.
pub fn future_date(days: i64) -> NaiveDate {
    Local::now().date_naive() + Duration::days(days)
}

pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        other => other.to_string().parse().expect("decimal number"),
    }
}
