use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::payments::{PaymentSessionRequest, PaymentSessionResponse},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, PaymentResult, ShippingAddress},
    payment::{CustomerDetails, SessionRequest},
    pricing::{self, CURRENCY},
    response::{ApiResponse, Meta},
    services::order_service::{find_order, order_from_entity},
    state::AppState,
};

pub const MOCK_TRANSACTION_ID: &str = "MOCK_PAYMENT_ID_123";
const MOCK_STATUS: &str = "success";

const GUEST_NAME: &str = "Guest";
const GUEST_EMAIL: &str = "guest@example.com";
const GUEST_PHONE: &str = "9999999999";

pub fn require_order_id(body: Option<Uuid>, query: Option<Uuid>) -> AppResult<Uuid> {
    body.or(query)
        .ok_or_else(|| AppError::Validation("order_id is required".into()))
}

/// Marks an order paid without talking to a gateway. Only available when mock
/// payments are enabled in config.
pub async fn mock_pay(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    if !state.config.mock_payments_enabled {
        tracing::warn!(order_id = %order_id, user_id = %user.user_id, "mock payment refused");
        return Err(AppError::Forbidden("Mock payments are disabled".into()));
    }

    let order = load_owned_order(state, user, order_id).await?;
    if order.is_paid {
        return Ok(ApiResponse::success(
            "Order already paid",
            order_from_entity(order)?,
            Some(Meta::empty()),
        ));
    }

    tracing::warn!(order_id = %order_id, user_id = %user.user_id, "applying mock payment");
    let result = PaymentResult {
        id: MOCK_TRANSACTION_ID.to_string(),
        status: MOCK_STATUS.to_string(),
        update_time: Utc::now(),
        email_address: user.email.clone(),
    };
    let order = mark_paid(state, user, order_id, result, "payment_mock").await?;

    Ok(ApiResponse::success("Order paid", order, Some(Meta::empty())))
}

pub async fn create_payment_session(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: PaymentSessionRequest,
) -> AppResult<ApiResponse<PaymentSessionResponse>> {
    let order = load_owned_order(state, user, order_id).await?;
    if order.is_paid {
        return Err(AppError::Validation("Order is already paid".into()));
    }

    let amount = pricing::from_minor(order.total_price);
    if amount <= rust_decimal::Decimal::ZERO {
        return Err(AppError::Validation("Invalid order total".into()));
    }

    let customer = customer_details(user, &order, payload);
    let request = SessionRequest {
        order_id: order.id.to_string(),
        amount,
        currency: CURRENCY.to_string(),
        customer,
    };

    let session = state.gateway.create_session(&request).await?;
    tracing::info!(order_id = %order.id, amount = %amount, "payment session created");

    Ok(ApiResponse::success(
        "Payment session created",
        PaymentSessionResponse {
            payment_session_id: session.payment_session_id,
            order_id: order.id,
        },
        Some(Meta::empty()),
    ))
}

/// Confirms payment against the gateway's record of the order. The client's
/// word is never taken for it.
pub async fn verify_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = load_owned_order(state, user, order_id).await?;
    if order.is_paid {
        return Ok(ApiResponse::success(
            "Payment verified",
            order_from_entity(order)?,
            Some(Meta::empty()),
        ));
    }

    let remote = state.gateway.fetch_order(&order.id.to_string()).await?;
    if !remote.is_paid() {
        tracing::info!(order_id = %order.id, status = %remote.status, "payment not completed");
        return Err(AppError::PaymentNotCompleted {
            status: remote.status,
        });
    }

    let result = PaymentResult {
        id: remote.transaction_id(),
        status: remote.status.clone(),
        update_time: Utc::now(),
        email_address: remote.customer_email.clone().unwrap_or_else(|| user.email.clone()),
    };
    let order = mark_paid(state, user, order_id, result, "payment_verified").await?;

    Ok(ApiResponse::success(
        "Payment verified",
        order,
        Some(Meta::empty()),
    ))
}

async fn load_owned_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderModel> {
    let order = find_order(state, id).await?;
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden("Not authorized".into()));
    }
    Ok(order)
}

/// Flips `is_paid` false -> true at most once. A caller that loses the race
/// gets the winner's record back untouched.
async fn mark_paid(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    result: PaymentResult,
    action: &str,
) -> AppResult<Order> {
    let now = Utc::now();
    let payment_result = serde_json::to_value(&result).map_err(anyhow::Error::from)?;

    let updated = Orders::update_many()
        .set(OrderActive {
            is_paid: Set(true),
            paid_at: Set(Some(now.into())),
            payment_result: Set(Some(payment_result)),
            updated_at: Set(now.into()),
            ..Default::default()
        })
        .filter(OrderCol::Id.eq(order_id))
        .filter(OrderCol::IsPaid.eq(false))
        .exec(&state.orm)
        .await?;

    if updated.rows_affected > 0 {
        tracing::info!(order_id = %order_id, transaction_id = %result.id, "order marked paid");
        audit::record(
            &state.orm,
            Some(user.user_id),
            action,
            "orders",
            serde_json::json!({ "order_id": order_id, "transaction_id": result.id }),
        )
        .await;
    } else {
        tracing::debug!(order_id = %order_id, "order already paid, skipping update");
    }

    order_from_entity(find_order(state, order_id).await?)
}

fn customer_details(
    user: &AuthUser,
    order: &OrderModel,
    payload: PaymentSessionRequest,
) -> CustomerDetails {
    let shipping: Option<ShippingAddress> =
        serde_json::from_value(order.shipping_address.clone()).ok();
    let non_blank = |value: Option<String>| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let customer_name = non_blank(payload.customer_name)
        .or_else(|| non_blank(Some(user.name.clone())))
        .unwrap_or_else(|| GUEST_NAME.to_string());
    let customer_email = non_blank(payload.customer_email)
        .or_else(|| non_blank(Some(user.email.clone())))
        .unwrap_or_else(|| GUEST_EMAIL.to_string());
    let customer_phone = non_blank(payload.customer_phone)
        .or_else(|| non_blank(shipping.map(|s| s.phone)))
        .unwrap_or_else(|| GUEST_PHONE.to_string());

    CustomerDetails {
        customer_id: user.user_id.to_string(),
        customer_phone,
        customer_email,
        customer_name,
    }
}
