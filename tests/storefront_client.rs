use std::time::Duration;

use serde_json::json;
use storefront_api::checkout::{ClientError, HttpStorefrontClient, StorefrontApi};
use uuid::Uuid;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

#[tokio::test]
async fn hung_server_surfaces_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payment/cashfree/verify"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = HttpStorefrontClient::with_timeout(server.uri(), Duration::from_millis(200))
        .expect("client");
    let err = client
        .verify_payment("jwt", Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn payment_not_completed_reply_keeps_gateway_status() {
    let server = MockServer::start().await;
    let order_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/payment/cashfree/verify"))
        .and(header("authorization", "Bearer jwt"))
        .and(header("x-auth-token", "jwt"))
        .and(body_partial_json(json!({ "order_id": order_id })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Payment not completed",
            "data": {
                "error": "Payment not completed",
                "code": "payment_not_completed",
                "details": { "status": "ACTIVE" }
            },
            "meta": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpStorefrontClient::new(format!("{}/", server.uri())).expect("client");
    let err = client.verify_payment("jwt", order_id).await.unwrap_err();
    assert!(err.is_payment_not_completed());
    assert_eq!(err.gateway_status().as_deref(), Some("ACTIVE"));
    assert_eq!(err.to_string(), "Payment not completed");
}
