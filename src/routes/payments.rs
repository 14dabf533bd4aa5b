use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::payments::{
        MockPaymentRequest, OrderIdQuery, PaymentSessionRequest, PaymentSessionResponse,
        VerifyPaymentRequest,
    },
    error::AppResult,
    extract::{ApiJson, ApiQuery},
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::payment_service::{self, require_order_id},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mock", post(mock_pay))
        .route("/cashfree/order", post(create_session))
        .route("/cashfree/verify", post(verify))
}

#[utoipa::path(
    post,
    path = "/api/payment/mock",
    request_body = MockPaymentRequest,
    params(("order_id" = Option<uuid::Uuid>, Query, description = "Fallback when the body has none")),
    responses(
        (status = 200, description = "Order marked paid", body = ApiResponse<Order>),
        (status = 403, description = "Not the owner or mock payments disabled"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn mock_pay(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<OrderIdQuery>,
    body: Option<ApiJson<MockPaymentRequest>>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let ApiJson(payload) = body.unwrap_or_default();
    let order_id = require_order_id(payload.order_id, query.order_id)?;
    let resp = payment_service::mock_pay(&state, &user, order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/cashfree/order",
    request_body = PaymentSessionRequest,
    responses(
        (status = 200, description = "Gateway session", body = ApiResponse<PaymentSessionResponse>),
        (status = 400, description = "Order already paid or total not chargeable"),
        (status = 502, description = "Gateway unreachable")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<OrderIdQuery>,
    body: Option<ApiJson<PaymentSessionRequest>>,
) -> AppResult<Json<ApiResponse<PaymentSessionResponse>>> {
    let ApiJson(payload) = body.unwrap_or_default();
    let order_id = require_order_id(payload.order_id, query.order_id)?;
    let resp = payment_service::create_payment_session(&state, &user, order_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payment/cashfree/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Order paid", body = ApiResponse<Order>),
        (status = 400, description = "Payment not completed"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<OrderIdQuery>,
    body: Option<ApiJson<VerifyPaymentRequest>>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let ApiJson(payload) = body.unwrap_or_default();
    let order_id = require_order_id(payload.order_id, query.order_id)?;
    let resp = payment_service::verify_payment(&state, &user, order_id).await?;
    Ok(Json(resp))
}
