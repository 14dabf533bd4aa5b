use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;

/// Remote status the gateway reports once an order has been paid.
pub const PAID_STATUS: &str = "PAID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub customer_id: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub customer: CustomerDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySession {
    pub payment_session_id: String,
    pub order_id: String,
}

/// The gateway's view of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteOrder {
    pub order_id: String,
    pub gateway_order_id: Option<String>,
    pub status: String,
    pub customer_email: Option<String>,
}

impl RemoteOrder {
    pub fn is_paid(&self) -> bool {
        self.status == PAID_STATUS
    }

    pub fn transaction_id(&self) -> String {
        self.gateway_order_id
            .clone()
            .unwrap_or_else(|| self.order_id.clone())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        details: Value,
    },

    #[error("payment gateway timed out")]
    Timeout,

    #[error("payment gateway unreachable: {0}")]
    Transport(String),

    #[error("unexpected payment gateway response: {0}")]
    Decode(String),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        tracing::warn!(error = %err, "payment gateway call failed");
        let message = err.to_string();
        match err {
            GatewayError::Rejected {
                status,
                message,
                details,
            } => AppError::Upstream {
                status,
                message,
                details,
            },
            GatewayError::Timeout => AppError::Upstream {
                status: 504,
                message,
                details: Value::Null,
            },
            GatewayError::Transport(_) | GatewayError::Decode(_) => AppError::Upstream {
                status: 502,
                message,
                details: Value::Null,
            },
        }
    }
}

/// A hosted payment gateway: mints checkout sessions and reports the remote
/// status of an order by its id.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> Result<GatewaySession, GatewayError>;

    async fn fetch_order(&self, order_id: &str) -> Result<RemoteOrder, GatewayError>;
}
