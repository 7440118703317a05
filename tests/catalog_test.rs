//! Integration tests for the product catalog.

mod common;

use axum::http::Method;
use common::{decimal, response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use vetclinic_api::{auth::Role, entities::product::ProductCategory};

fn bed(code: &str) -> serde_json::Value {
    json!({
        "code": code,
        "name": "Orthopedic Bed",
        "brand": "PetBed",
        "price": "35000",
        "stock": 10,
        "description": "Orthopedic bed for large dogs",
        "attributes": { "size": "Large", "material": "Foam" }
    })
}

#[tokio::test]
async fn category_listing_is_public_and_wrapped_in_data() {
    let app = TestApp::new().await;
    app.seed_product(ProductCategory::DogFoodAdult, "PA002", "Pro Plan Adult", dec!(22000), 40)
        .await;
    app.seed_product(ProductCategory::DogFoodAdult, "PA001", "Eukanuba Adult", dec!(23000), 35)
        .await;
    app.seed_product(ProductCategory::DogFoodPuppy, "PC001", "Puppy Food", dec!(26000), 45)
        .await;

    let response = app.request(Method::GET, "/api/v1/catalog/pa", None, None).await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let products = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["name"], "Eukanuba Adult");
    assert!(products.iter().all(|p| p["category"] == "pa"));
}

#[tokio::test]
async fn unknown_tag_is_not_found() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/catalog/fish", None, None).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn staff_can_manage_products() {
    let app = TestApp::new().await;
    let admin = app.login_as("admin", Role::Admin).await;

    let response = app
        .request(Method::POST, "/api/v1/catalog/cama", Some(bed("CAM001")), Some(&admin))
        .await;
    assert_eq!(response.status(), 201);
    let created = response_json(response).await;
    assert_eq!(created["attributes"]["size"], "Large");

    let response = app
        .request(Method::POST, "/api/v1/catalog/cama", Some(bed("CAM001")), Some(&admin))
        .await;
    assert_eq!(response.status(), 400, "duplicate code within a category");
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["code"].is_array());

    let mut changed = bed("CAM001");
    changed["price"] = json!("32000.50");
    changed["stock"] = json!(4);
    let response = app
        .request(Method::PUT, "/api/v1/catalog/cama/CAM001", Some(changed), Some(&admin))
        .await;
    assert_eq!(response.status(), 200);
    let updated = response_json(response).await;
    assert_eq!(decimal(&updated["price"]), dec!(32000.50));
    assert_eq!(updated["stock"], 4);

    let response = app
        .request(Method::DELETE, "/api/v1/catalog/cama/CAM001", None, Some(&admin))
        .await;
    assert_eq!(response.status(), 204);

    let response = app
        .request(Method::GET, "/api/v1/catalog/cama/CAM001", None, None)
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn customers_cannot_manage_products() {
    let app = TestApp::new().await;
    let client = app.login_as("client", Role::Client).await;

    let response = app
        .request(Method::POST, "/api/v1/catalog/cama", Some(bed("CAM009")), Some(&client))
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .request(Method::POST, "/api/v1/catalog/cama", Some(bed("CAM009")), None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn attributes_foreign_to_the_category_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.login_as("admin", Role::Admin).await;

    let mut payload = bed("SHM010");
    payload["name"] = json!("Shampoo");
    let response = app
        .request(Method::POST, "/api/v1/catalog/shampoo", Some(payload), Some(&admin))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["attributes"].is_array());
}

#[tokio::test]
async fn invalid_price_and_stock_are_reported() {
    let app = TestApp::new().await;
    let admin = app.login_as("admin", Role::Admin).await;

    let mut payload = bed("CAM002");
    payload["price"] = json!("0");
    payload["stock"] = json!(-1);
    let response = app
        .request(Method::POST, "/api/v1/catalog/cama", Some(payload), Some(&admin))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    let fields = &body["field_errors"]["fields"];
    assert!(fields["price"].is_array());
    assert!(fields["stock"].is_array());
}

#[tokio::test]
async fn blank_code_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.login_as("admin", Role::Admin).await;

    let response = app
        .request(Method::POST, "/api/v1/catalog/cama", Some(bed("   ")), Some(&admin))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["code"].is_array());
}

#[tokio::test]
async fn product_search_filters_and_paginates() {
    let app = TestApp::new().await;
    app.seed_product(ProductCategory::Medication, "MED001", "Vitamin D3", dec!(12000), 40)
        .await;
    app.seed_product(ProductCategory::Medication, "MED002", "Calcium Plus", dec!(10000), 35)
        .await;
    app.seed_product(ProductCategory::Toy, "JUG001", "Vitamin Ball", dec!(5000), 5)
        .await;

    let response = app
        .request(Method::GET, "/api/v1/products?search=VITAMIN", None, None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);

    let response = app
        .request(Method::GET, "/api/v1/products?search=vitamin&category=med", None, None)
        .await;
    let body = response_json(response).await;
    let data = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["code"], "MED001");

    let response = app
        .request(Method::GET, "/api/v1/products?per_page=2&page=2", None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let response = app
        .request(Method::GET, "/api/v1/products?page=18446744073709551615", None, None)
        .await;
    assert_eq!(response.status(), 400, "page offset overflow");
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["page"].is_array());

    let response = app
        .request(Method::GET, "/api/v1/products?page=500", None, None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn product_lookup_by_id() {
    let app = TestApp::new().await;
    let toy = app
        .seed_product(ProductCategory::Toy, "JUG002", "Rubber Bone", dec!(10000), 30)
        .await;

    let uri = format!("/api/v1/products/{}", toy.id);
    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["code"], "JUG002");

    let uri = format!("/api/v1/products/{}", uuid::Uuid::new_v4());
    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 404);
}
