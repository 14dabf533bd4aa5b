use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    config::{CashfreeConfig, CashfreeEnv},
    error::AppError,
    payment::{CashfreeGateway, CustomerDetails, GatewayError, PaymentGateway, SessionRequest},
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn config(base_url: String) -> CashfreeConfig {
    CashfreeConfig {
        env: CashfreeEnv::Sandbox,
        app_id: "TEST_APP".into(),
        secret: "TEST_SECRET".into(),
        api_version: "2023-08-01".into(),
        base_url: Some(base_url),
        timeout: Duration::from_millis(500),
    }
}

fn session_request() -> SessionRequest {
    SessionRequest {
        order_id: "6f1c9a52-0c4e-4d8e-9d6f-2a9b0e4c1d11".into(),
        amount: dec!(1028.00),
        currency: "INR".into(),
        customer: CustomerDetails {
            customer_id: "u-1".into(),
            customer_phone: "9876543210".into(),
            customer_email: "asha@example.in".into(),
            customer_name: "Asha".into(),
        },
    }
}

#[tokio::test]
async fn create_session_posts_order_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("x-client-id", "TEST_APP"))
        .and(header("x-client-secret", "TEST_SECRET"))
        .and(header("x-api-version", "2023-08-01"))
        .and(body_partial_json(json!({
            "order_id": "6f1c9a52-0c4e-4d8e-9d6f-2a9b0e4c1d11",
            "order_amount": 1028.0,
            "order_currency": "INR",
            "customer_details": { "customer_phone": "9876543210" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cf_order_id": 2190,
            "order_id": "6f1c9a52-0c4e-4d8e-9d6f-2a9b0e4c1d11",
            "order_status": "ACTIVE",
            "payment_session_id": "session_abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = CashfreeGateway::new(&config(server.uri())).expect("client");
    let session = gateway.create_session(&session_request()).await.expect("session");
    assert_eq!(session.payment_session_id, "session_abc");
}

#[tokio::test]
async fn fetch_order_reads_status_and_numeric_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/ord-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cf_order_id": 5513,
            "order_id": "ord-1",
            "order_status": "PAID",
            "customer_details": { "customer_email": "payer@example.com" }
        })))
        .mount(&server)
        .await;

    let gateway = CashfreeGateway::new(&config(server.uri())).expect("client");
    let remote = gateway.fetch_order("ord-1").await.expect("order");
    assert!(remote.is_paid());
    assert_eq!(remote.transaction_id(), "5513");
    assert_eq!(remote.customer_email.as_deref(), Some("payer@example.com"));
}

#[tokio::test]
async fn non_2xx_becomes_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "order_amount : must be greater than 1",
            "code": "order_amount_invalid",
            "type": "invalid_request_error"
        })))
        .mount(&server)
        .await;

    let gateway = CashfreeGateway::new(&config(server.uri())).expect("client");
    let err = gateway.create_session(&session_request()).await.unwrap_err();
    match &err {
        GatewayError::Rejected { status, message, details } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "order_amount : must be greater than 1");
            assert_eq!(details["code"], "order_amount_invalid");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let app: AppError = err.into();
    assert_eq!(app.code(), "upstream");
    assert_eq!(app.status().as_u16(), 400);
}

#[tokio::test]
async fn slow_gateway_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "order_status": "PAID" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let gateway = CashfreeGateway::new(&config(server.uri())).expect("client");
    let err = gateway.fetch_order("slow").await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout));

    let app: AppError = err.into();
    assert_eq!(app.status().as_u16(), 504);
}
