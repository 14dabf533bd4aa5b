mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use storefront_api::routes::build_router;
use tower::ServiceExt;

use common::{StubGateway, create_user, setup_state, token_for};

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
}

fn order_body() -> Value {
    json!({
        "order_items": [
            { "product": "p-1", "name": "Lamp", "qty": 2, "price": 500, "image": "/img/lamp.png" }
        ],
        "shipping_address": {
            "name": "Asha Rao",
            "address": "12 MG Road",
            "city": "Pune",
            "state": "MH",
            "postal_code": "411001",
            "country": "India",
            "phone": "9876543210"
        },
        "payment_method": "Cashfree",
        "promo_code": "sprint10",
        "delivery_option": "express",
        "protection": true,
        "total_price": 1
    })
}

#[tokio::test]
async fn missing_token_is_401() {
    let state = setup_state(Arc::new(StubGateway::default())).await.expect("state");
    let app = build_router(state);

    let body = order_body();
    let request = json_request("POST", "/api/orders")
        .body(Body::from(body.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, access denied");
    assert_eq!(body["data"]["code"], "unauthorized");

    let request = Request::builder()
        .uri("/api/orders/myorders")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_order_returns_201_and_server_totals() {
    let state = setup_state(Arc::new(StubGateway::default())).await.expect("state");
    let user = create_user(&state, "user", "http@example.com").await.expect("user");
    let token = token_for(&user);
    let app = build_router(state);

    let body = order_body();
    let request = json_request("POST", "/api/orders")
        .header("x-auth-token", &token)
        .body(Body::from(body.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    let order = &body["data"];
    assert_eq!(order["total_price"], "1028.00");
    assert_eq!(order["payment_method"], "Online");
    assert_eq!(order["promo_code"], "SPRINT10");
    assert_eq!(order["is_paid"], false);

    let id = order["id"].as_str().expect("id").to_string();
    let request = Request::builder()
        .uri(format!("/api/orders/{id}?token={token}"))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
}

#[tokio::test]
async fn admin_routes_and_ownership_are_enforced() {
    let state = setup_state(Arc::new(StubGateway::default())).await.expect("state");
    let owner = create_user(&state, "user", "owner@example.com").await.expect("user");
    let stranger = create_user(&state, "user", "stranger@example.com").await.expect("user");
    let admin = create_user(&state, "admin", "admin@example.com").await.expect("admin");
    let app = build_router(state);

    let body = order_body();
    let request = json_request("POST", "/api/orders")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(&owner)))
        .body(Body::from(body.to_string()))
        .expect("request");
    let (_, created) = send(&app, request).await;
    let id = created["data"]["id"].as_str().expect("id").to_string();

    let request = Request::builder()
        .uri(format!("/api/orders/{id}"))
        .header("x-access-token", token_for(&stranger))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri("/api/orders")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(&owner)))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["code"], "forbidden");

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/orders/{id}/deliver"))
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(&admin)))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_delivered"], true);

    let request = Request::builder()
        .uri("/api/orders?delivered=true&per_page=5")
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(&admin)))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["meta"]["per_page"], 5);
}

#[tokio::test]
async fn payment_routes_take_order_id_from_body_or_query() {
    let gateway = Arc::new(StubGateway::default());
    let state = setup_state(gateway.clone()).await.expect("state");
    let user = create_user(&state, "user", "pay@example.com").await.expect("user");
    let auth = format!("Bearer {}", token_for(&user));
    let app = build_router(state);

    let body = order_body();
    let request = json_request("POST", "/api/orders")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from(body.to_string()))
        .expect("request");
    let (_, created) = send(&app, request).await;
    let id = created["data"]["id"].as_str().expect("id").to_string();

    let request = json_request("POST", "/api/payment/cashfree/order")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from(json!({}).to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "order_id is required");

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/payment/cashfree/order?order_id={id}"))
        .header(header::AUTHORIZATION, &auth)
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_session_id"], "session_1");

    let verify = json!({ "order_id": id });
    let request = json_request("POST", "/api/payment/cashfree/verify")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from(verify.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "payment_not_completed");
    assert_eq!(body["data"]["details"]["status"], "ACTIVE");

    gateway.set_status("PAID").await;
    let request = json_request("POST", "/api/payment/cashfree/verify")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from(verify.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_paid"], true);
}

#[tokio::test]
async fn register_login_and_unknown_route() {
    let state = setup_state(Arc::new(StubGateway::default())).await.expect("state");
    let app = build_router(state);

    let register = json!({ "name": "Ravi", "email": "Ravi@Example.com", "password": "s3cret-pass" });
    let request = json_request("POST", "/api/auth/register")
        .body(Body::from(register.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["email"], "ravi@example.com");

    let request = json_request("POST", "/api/auth/register")
        .body(Body::from(register.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    let login = json!({ "email": "ravi@example.com", "password": "wrong" });
    let request = json_request("POST", "/api/auth/login")
        .body(Body::from(login.to_string()))
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let login = json!({ "email": "ravi@example.com", "password": "s3cret-pass" });
    let request = json_request("POST", "/api/auth/login")
        .body(Body::from(login.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));

    let request = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");
}

#[tokio::test]
async fn malformed_input_gets_the_error_envelope() {
    let state = setup_state(Arc::new(StubGateway::default())).await.expect("state");
    let user = create_user(&state, "user", "malformed@example.com").await.expect("user");
    let token = token_for(&user);
    let app = build_router(state);

    let mut body = order_body();
    body["order_items"][0]["qty"] = json!(-1);
    let request = json_request("POST", "/api/orders")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "validation");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let request = Request::builder()
        .uri("/api/orders/not-a-uuid")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "validation");

    let request = Request::builder()
        .uri("/api/orders/myorders?page=first")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "validation");

    let request = json_request("POST", "/api/payment/cashfree/verify")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from("{\"order_id\":"))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["code"], "validation");
}
