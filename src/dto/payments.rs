use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MockPaymentRequest {
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PaymentSessionRequest {
    #[serde(default)]
    pub order_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentSessionResponse {
    pub payment_session_id: String,
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

/// Fallback for clients that pass the order id in the query string.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderIdQuery {
    pub order_id: Option<Uuid>,
}
