//! Integration tests for the clinic: patients, clinical records,
//! consultations, prescriptions, vaccines and treatments.

mod common;

use axum::http::Method;
use common::{decimal, future_date, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use vetclinic_api::auth::Role;

async fn register_patient(app: &TestApp, vet: &str, body: Value) -> String {
    let response = app
        .request(Method::POST, "/api/v1/vet/patients", Some(body), Some(vet))
        .await;
    assert_eq!(response.status(), 201);
    let pet = response_json(response).await;
    pet["id"].as_str().expect("patient id").to_string()
}

#[tokio::test]
async fn patient_defaults_to_the_registering_vet_as_owner() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;

    let id = register_patient(&app, &vet, json!({ "name": "Luna", "species": "cat" })).await;

    let response = app
        .request(Method::GET, &format!("/api/v1/vet/patients/{}", id), None, Some(&vet))
        .await;
    assert_eq!(response.status(), 200);
    let detail = response_json(response).await;
    assert_eq!(detail["pet"]["name"], "Luna");
    assert_eq!(detail["owner_username"], "vet");
    assert!(detail["record"].is_null());
}

#[tokio::test]
async fn patient_can_be_assigned_to_an_existing_owner() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;
    app.create_user("ana", Role::Client).await;

    register_patient(
        &app,
        &vet,
        json!({ "name": "Rocky", "species": "dog", "sex": "male", "owner_username": "ana" }),
    )
    .await;

    let response = app
        .request(Method::GET, "/api/v1/vet/patients", None, Some(&vet))
        .await;
    let body = response_json(response).await;
    let patients = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0]["owner_username"], "ana");
}

#[tokio::test]
async fn opening_a_record_twice_returns_the_existing_one() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;
    let id = register_patient(&app, &vet, json!({ "name": "Max", "species": "dog" })).await;
    let uri = format!("/api/v1/vet/patients/{}/record", id);

    let response = app
        .request(Method::POST, &uri, Some(json!({ "allergies": "Penicillin" })), Some(&vet))
        .await;
    assert_eq!(response.status(), 201);
    let first = response_json(response).await;

    let response = app
        .request(Method::POST, &uri, Some(json!({ "allergies": "None" })), Some(&vet))
        .await;
    assert_eq!(response.status(), 200);
    let second = response_json(response).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(second["allergies"], "Penicillin");

    let response = app.request(Method::GET, &uri, None, Some(&vet)).await;
    assert_eq!(response.status(), 200);
    let detail = response_json(response).await;
    assert_eq!(detail["pet"]["name"], "Max");
    assert_eq!(detail["total_consultations"], 0);
}

#[tokio::test]
async fn consultation_prescription_and_completion() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;
    let pet_id = register_patient(&app, &vet, json!({ "name": "Toby", "species": "dog" })).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/vet/consultations",
            Some(json!({
                "pet_id": pet_id,
                "reason": "Skin irritation",
                "diagnosis": "Dermatitis",
                "cost": "15000"
            })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 201);
    let consultation = response_json(response).await;
    assert_eq!(consultation["status"], "pending");
    assert_eq!(decimal(&consultation["cost"]), dec!(15000));
    let consultation_id = consultation["id"].as_str().expect("consultation id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/vet/consultations/{}/prescriptions", consultation_id),
            Some(json!({
                "instructions": "Give with food",
                "valid_until": future_date(30).to_string(),
                "items": [
                    { "medication": "Prednisolone", "dose": "5mg", "frequency": "every 12h", "duration": "7 days" },
                    { "medication": "Chlorhexidine shampoo", "dose": "1 wash", "frequency": "weekly", "duration": "4 weeks", "quantity": 2 }
                ]
            })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 201);
    let prescription = response_json(response).await;
    let items = prescription["items"].as_array().cloned().unwrap_or_default();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["quantity"], 1);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/vet/consultations/{}/complete", consultation_id),
            None,
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["status"], "completed");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/vet/consultations/{}", consultation_id),
            None,
            Some(&vet),
        )
        .await;
    let detail = response_json(response).await;
    assert_eq!(detail["pet"]["name"], "Toby");
    assert_eq!(detail["prescriptions"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn consultation_needs_a_patient_and_a_reason() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/vet/consultations",
            Some(json!({ "reason": "" })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["reason"].is_array());

    let response = app
        .request(
            Method::POST,
            "/api/v1/vet/consultations",
            Some(json!({ "reason": "Checkup" })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["pet_id"].is_array());
}

#[tokio::test]
async fn vaccine_due_date_cannot_precede_application() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;
    let pet_id = register_patient(&app, &vet, json!({ "name": "Kira", "species": "dog" })).await;
    let uri = format!("/api/v1/vet/patients/{}/vaccines", pet_id);
    let applied = future_date(0);

    let response = app
        .request(
            Method::POST,
            &uri,
            Some(json!({
                "name": "Rabies",
                "applied_on": applied.to_string(),
                "next_due": future_date(-10).to_string()
            })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["next_due"].is_array());

    let response = app
        .request(
            Method::POST,
            &uri,
            Some(json!({
                "name": "Rabies",
                "applied_on": applied.to_string(),
                "next_due": future_date(365).to_string(),
                "lot": "RB-2291"
            })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app.request(Method::GET, &uri, None, Some(&vet)).await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn treatment_status_can_be_closed() {
    let app = TestApp::new().await;
    let vet = app.login_as("vet", Role::Vet).await;
    let pet_id = register_patient(&app, &vet, json!({ "name": "Milo", "species": "cat" })).await;
    let started = future_date(-5);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/vet/patients/{}/treatments", pet_id),
            Some(json!({ "name": "Antibiotic course", "started_on": started.to_string() })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 201);
    let treatment = response_json(response).await;
    assert_eq!(treatment["status"], "active");
    let uri = format!(
        "/api/v1/vet/treatments/{}/status",
        treatment["id"].as_str().expect("treatment id")
    );

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "status": "completed", "ended_on": future_date(-6).to_string() })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 400, "end before start is refused");
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["ended_on"].is_array());

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({ "status": "completed", "ended_on": future_date(0).to_string() })),
            Some(&vet),
        )
        .await;
    assert_eq!(response.status(), 200);
    let closed = response_json(response).await;
    assert_eq!(closed["status"], "completed");
    assert_eq!(closed["ended_on"], future_date(0).to_string());
}

#[tokio::test]
async fn clinic_routes_are_vet_only() {
    let app = TestApp::new().await;
    let client = app.login_as("client", Role::Client).await;
    let staff = app.login_as("admin", Role::Admin).await;

    for cookie in [&client, &staff] {
        let response = app
            .request(Method::GET, "/api/v1/vet/patients", None, Some(cookie))
            .await;
        assert_eq!(response.status(), 403);
    }

    let response = app
        .request(Method::GET, "/api/v1/vet/records", None, None)
        .await;
    assert_eq!(response.status(), 401);
}
