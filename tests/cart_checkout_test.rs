//! Integration tests for the session cart and checkout.
//!
//! Tests cover:
//! - Adding, merging, updating and removing cart lines
//! - The cart surviving login
//! - Checkout validation and the empty-cart guard
//! - Order confirmation and persistence

mod common;

use axum::http::Method;
use common::{decimal, response_json, session_cookie, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use vetclinic_api::{
    auth::Role,
    entities::{order, order_line, product::ProductCategory},
};

fn shipping(method: &str) -> serde_json::Value {
    json!({
        "full_name": "Ana Perez",
        "email": "ana@example.com",
        "phone": "+56911112222",
        "address": "Av. Siempre Viva 742",
        "city": "Santiago",
        "postal_code": "8320000",
        "payment_method": method
    })
}

#[tokio::test]
async fn adding_the_same_product_twice_merges_into_one_line() {
    let app = TestApp::new().await;
    let toy = app
        .seed_product(ProductCategory::Toy, "JUG001", "Rubber Bone", dec!(10000), 30)
        .await;

    let add = json!({ "type_tag": "juguete", "product_id": toy.id });
    let response = app
        .request(Method::POST, "/api/v1/cart/items", Some(add.clone()), None)
        .await;
    assert_eq!(response.status(), 200);
    let cookie = session_cookie(&response).expect("anonymous cart gets a session");

    let response = app
        .request(Method::POST, "/api/v1/cart/items", Some(add), Some(&cookie))
        .await;
    let cart = response_json(response).await;

    let lines = cart["lines"].as_array().cloned().unwrap_or_default();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 2);
    assert_eq!(decimal(&lines[0]["subtotal"]), dec!(20000));
    assert_eq!(decimal(&cart["total"]), dec!(20000));
    assert_eq!(cart["item_count"], 2);
}

#[tokio::test]
async fn updating_and_removing_lines_keeps_totals_consistent() {
    let app = TestApp::new().await;
    let food = app
        .seed_product(ProductCategory::CatFoodAdult, "AGA001", "Adult Cat", dec!(19.99), 10)
        .await;
    let snack = app
        .seed_product(ProductCategory::CatSnack, "SNG001", "Cat Snack", dec!(2.50), 10)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "type_tag": "aga", "product_id": food.id, "quantity": 1 })),
            None,
        )
        .await;
    let cookie = session_cookie(&response).expect("session cookie");
    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "type_tag": "snackg", "product_id": snack.id, "quantity": 4 })),
        Some(&cookie),
    )
    .await;

    let food_key = format!("aga_{}", food.id);
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/cart/items/{}", food_key),
            Some(json!({ "quantity": 3 })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), 200);
    let cart = response_json(response).await;
    assert_eq!(decimal(&cart["total"]), dec!(69.97));

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/cart/items/{}", food_key),
            Some(json!({ "quantity": 0 })),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), 400, "quantity below one is rejected");

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/items/{}", food_key),
            None,
            Some(&cookie),
        )
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(1));
    assert_eq!(decimal(&cart["total"]), dec!(10.00));

    let response = app
        .request(Method::DELETE, "/api/v1/cart/items/aga_missing", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 404);

    // Adding clamps a non-positive quantity to one instead of rejecting it.
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "type_tag": "snackg", "product_id": snack.id, "quantity": 0 })),
            Some(&cookie),
        )
        .await;
    assert!(response.status().is_success());
    let response = app.request(Method::GET, "/api/v1/cart", None, Some(&cookie)).await;
    let cart = response_json(response).await;
    assert_eq!(cart["lines"][0]["quantity"], 5);
    assert_eq!(decimal(&cart["total"]), dec!(12.50));
}

#[tokio::test]
async fn unknown_type_tag_is_rejected() {
    let app = TestApp::new().await;
    let toy = app
        .seed_product(ProductCategory::Toy, "JUG001", "Ball", dec!(5), 3)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "type_tag": "nope", "product_id": toy.id })),
            None,
        )
        .await;
    assert!(response.status().is_client_error());

    // Right id, wrong category.
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "type_tag": "collar", "product_id": toy.id })),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn checkout_with_empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let cookie = app.login_as("buyer", Role::Client).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(shipping("cash")), Some(&cookie))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert_eq!(body["field_errors"]["non_field"][0], "Your cart is empty.");

    let count = order::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count orders");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn checkout_requires_login() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(shipping("cash")), None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn card_payment_requires_card_fields() {
    let app = TestApp::new().await;
    let bed = app
        .seed_product(ProductCategory::Bed, "CAM001", "Orthopedic Bed", dec!(35000), 10)
        .await;
    let cookie = app.login_as("buyer", Role::Client).await;
    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "type_tag": "cama", "product_id": bed.id })),
        Some(&cookie),
    )
    .await;

    let mut payload = shipping("card");
    payload["card_number"] = json!("");
    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&cookie))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    let fields = &body["field_errors"]["fields"];
    for name in ["card_number", "card_expiry", "card_cvv"] {
        assert!(fields[name].is_array(), "{} should be required: {}", name, body);
    }

    // Nothing was consumed by the failed attempt.
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&cookie))
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn missing_checkout_fields_are_field_errors() {
    let app = TestApp::new().await;
    let bed = app
        .seed_product(ProductCategory::Bed, "CAM001", "Orthopedic Bed", dec!(35000), 10)
        .await;
    let cookie = app.login_as("buyer", Role::Client).await;
    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "type_tag": "cama", "product_id": bed.id })),
        Some(&cookie),
    )
    .await;

    let mut payload = shipping("cash");
    if let Some(fields) = payload.as_object_mut() {
        fields.remove("full_name");
        fields.remove("payment_method");
    }
    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&cookie))
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    let fields = &body["field_errors"]["fields"];
    assert!(fields["full_name"].is_array(), "missing full_name: {}", body);
    assert!(fields["payment_method"].is_array(), "missing payment_method: {}", body);
    assert!(fields["city"].is_null());

    let mut payload = shipping("bitcoin");
    payload["full_name"] = json!("");
    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&cookie))
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["field_errors"]["fields"]["full_name"].is_array());
    assert!(body["field_errors"]["fields"]["payment_method"].is_array());
}

#[tokio::test]
async fn cart_survives_login_and_cash_checkout_completes() {
    let app = TestApp::new().await;
    let collar = app
        .seed_product(ProductCategory::Collar, "COL001", "Adjustable Collar", dec!(12000), 30)
        .await;
    app.create_user("buyer", Role::Client).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "type_tag": "collar", "product_id": collar.id, "quantity": 2 })),
            None,
        )
        .await;
    let anonymous = session_cookie(&response).expect("anonymous session");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "username": "buyer", "password": common::PASSWORD })),
            Some(&anonymous),
        )
        .await;
    assert_eq!(response.status(), 200);
    let cookie = session_cookie(&response).expect("login rotates the session");
    assert_ne!(cookie, anonymous);

    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(shipping("cash")), Some(&cookie))
        .await;
    assert_eq!(response.status(), 201);
    let summary = response_json(response).await;
    let code = summary["code"].as_str().expect("order code").to_string();
    assert_eq!(code.len(), 10);
    assert_eq!(decimal(&summary["total"]), dec!(24000));
    assert!(summary["card_last4"].is_null());

    let response = app
        .request(Method::GET, "/api/v1/checkout/confirmation", None, Some(&cookie))
        .await;
    assert_eq!(response.status(), 200);
    let confirmation = response_json(response).await;
    assert_eq!(confirmation["code"], code.as_str());

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&cookie))
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(0));

    let orders = order::Entity::find()
        .all(&*app.state.db)
        .await
        .expect("load orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].code, code);
    let lines = order_line::Entity::find()
        .count(&*app.state.db)
        .await
        .expect("count order lines");
    assert_eq!(lines, 1);
}

#[tokio::test]
async fn card_checkout_keeps_only_the_last_four_digits() {
    let app = TestApp::new().await;
    let shampoo = app
        .seed_product(ProductCategory::Shampoo, "SHM001", "Flea Shampoo", dec!(8000), 25)
        .await;
    let cookie = app.login_as("buyer", Role::Client).await;
    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(json!({ "type_tag": "shampoo", "product_id": shampoo.id })),
        Some(&cookie),
    )
    .await;

    let mut payload = shipping("card");
    payload["card_number"] = json!("4111 1111 1111 1234");
    payload["card_expiry"] = json!("12/30");
    payload["card_cvv"] = json!("123");
    let response = app
        .request(Method::POST, "/api/v1/checkout", Some(payload), Some(&cookie))
        .await;
    assert_eq!(response.status(), 201);

    let summary = response_json(response).await;
    assert_eq!(summary["card_last4"], "1234");
    assert_eq!(summary["payment_method"], "card");
}

#[tokio::test]
async fn confirmation_without_an_order_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/checkout/confirmation", None, None)
        .await;
    assert_eq!(response.status(), 404);
}
