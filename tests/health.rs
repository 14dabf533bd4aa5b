mod common;

use std::sync::Arc;

use axum::extract::State;
use storefront_api::routes::health::health_check;

#[tokio::test]
async fn health_check_returns_ok() -> anyhow::Result<()> {
    let state = common::setup_state(Arc::new(common::StubGateway::default())).await?;

    let response = health_check(State(state)).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
    assert!(data.mock_payments);
    Ok(())
}
