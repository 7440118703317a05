//! Integration tests for accounts, sessions and the admin user endpoints.

mod common;

use axum::http::Method;
use common::{response_json, session_cookie, TestApp};
use serde_json::json;
use vetclinic_api::auth::Role;

fn signup(username: &str, confirm: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "first_name": "Ana",
        "last_name": "Perez",
        "password": "secret123",
        "password_confirm": confirm
    })
}

#[tokio::test]
async fn signup_creates_a_logged_in_customer() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/auth/signup", Some(signup("ana", "secret123")), None)
        .await;
    assert_eq!(response.status(), 201);
    let cookie = session_cookie(&response).expect("signup logs the user in");

    let body = response_json(response).await;
    assert_eq!(body["user"]["role"], "client");
    assert_eq!(body["user"]["is_staff"], false);
    assert_eq!(body["landing"], "/store");

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 200);
    let me = response_json(response).await;
    assert_eq!(me["user"]["username"], "ana");
    assert_eq!(me["user"]["full_name"], "Ana Perez");
}

#[tokio::test]
async fn signup_reports_taken_usernames_and_mismatched_passwords() {
    let app = TestApp::new().await;
    app.create_user("ana", Role::Client).await;

    let response = app
        .request(Method::POST, "/api/v1/auth/signup", Some(signup("ana", "secret123")), None)
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert_eq!(
        body["field_errors"]["fields"]["username"][0],
        "A user with that username already exists."
    );

    let response = app
        .request(Method::POST, "/api/v1/auth/signup", Some(signup("luis", "other123")), None)
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["password_confirm"].is_array());
}

#[tokio::test]
async fn bad_credentials_are_a_form_level_error() {
    let app = TestApp::new().await;
    app.create_user("ana", Role::Client).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "ana", "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    let message = body["field_errors"]["non_field"][0].as_str().unwrap_or_default();
    assert!(message.starts_with("Please enter a correct username and password"));
}

#[tokio::test]
async fn landing_depends_on_role() {
    let app = TestApp::new().await;
    let cases = [
        ("admin", Role::Admin, "/admin/dashboard"),
        ("vet", Role::Vet, "/vet/dashboard"),
        ("client", Role::Client, "/store"),
    ];

    for (username, role, path) in cases {
        let cookie = app.login_as(username, role).await;
        let response = app
            .request(Method::GET, "/api/v1/auth/landing", None, Some(&cookie))
            .await;
        assert_eq!(response.status(), 200);
        let body = response_json(response).await;
        assert_eq!(body["path"], path, "landing for {}", username);
    }

    let response = app
        .request(Method::GET, "/api/v1/auth/landing", None, None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    let cookie = app.login_as("ana", Role::Client).await;

    let response = app
        .request(Method::POST, "/api/v1/auth/logout", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 204);

    let response = app
        .request(Method::GET, "/api/v1/auth/me", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_manages_users_but_not_itself() {
    let app = TestApp::new().await;
    let admin = app.login_as("admin", Role::Admin).await;
    let admin_id = app
        .state
        .services
        .users
        .find_by_username("admin")
        .await
        .expect("lookup admin")
        .expect("admin exists")
        .id;

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/users",
            Some(json!({
                "username": "newvet",
                "email": "newvet@example.com",
                "password": "secret123",
                "role": "vet"
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 201);
    let created = response_json(response).await;
    assert_eq!(created["is_vet"], true);
    let created_id = created["id"].as_str().expect("user id").to_string();

    let response = app
        .request(Method::GET, "/api/v1/admin/users", None, Some(&admin))
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/users/{}", created_id),
            Some(json!({ "is_vet": false })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["is_vet"], false);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/users/{}", admin_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 400);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/admin/users/{}", created_id),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn admin_endpoints_reject_non_staff() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;

    let response = app
        .request(Method::GET, "/api/v1/admin/users", None, Some(&vet))
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .request(Method::GET, "/api/v1/admin/dashboard", None, None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn health_and_status_respond() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "healthy");

    let response = app.request(Method::GET, "/status", None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["service"], "vetclinic-api");
    assert_eq!(body["data"]["environment"], "test");
}
