use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        orders::CreateOrderRequest,
        payments::{PaymentSessionRequest, PaymentSessionResponse, VerifyPaymentRequest},
    },
    models::Order,
    response::ApiResponse,
};

const PAYMENT_NOT_COMPLETED: &str = "payment_not_completed";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        details: Option<Value>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_payment_not_completed(&self) -> bool {
        matches!(self, ClientError::Api { code: Some(code), .. } if code == PAYMENT_NOT_COMPLETED)
    }

    /// Remote payment status attached to a "payment not completed" reply.
    pub fn gateway_status(&self) -> Option<String> {
        match self {
            ClientError::Api {
                details: Some(details),
                ..
            } => details
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

/// The storefront REST calls the checkout flow depends on.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError>;

    async fn create_order(
        &self,
        token: &str,
        request: &CreateOrderRequest,
    ) -> Result<Order, ClientError>;

    async fn create_payment_session(
        &self,
        token: &str,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSessionResponse, ClientError>;

    async fn verify_payment(&self, token: &str, order_id: Uuid) -> Result<Order, ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct HttpStorefrontClient {
    client: Client,
    base_url: String,
}

impl HttpStorefrontClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// A request that outlives `timeout` fails as [`ClientError::Network`].
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // Both headers are sent; older deployments only read `x-auth-token`.
    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.bearer_auth(token).header("x-auth-token", token)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = self.authorized(request, token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        read_envelope(response).await
    }
}

#[async_trait]
impl StorefrontApi for HttpStorefrontClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/api/auth/login", None, &body).await
    }

    async fn create_order(
        &self,
        token: &str,
        request: &CreateOrderRequest,
    ) -> Result<Order, ClientError> {
        self.post("/api/orders", Some(token), request).await
    }

    async fn create_payment_session(
        &self,
        token: &str,
        request: &PaymentSessionRequest,
    ) -> Result<PaymentSessionResponse, ClientError> {
        self.post("/api/payment/cashfree/order", Some(token), request)
            .await
    }

    async fn verify_payment(&self, token: &str, order_id: Uuid) -> Result<Order, ClientError> {
        let body = VerifyPaymentRequest {
            order_id: Some(order_id),
        };
        self.post("/api/payment/cashfree/verify", Some(token), &body)
            .await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(api_error(status, &text));
    }

    let envelope: ApiResponse<T> =
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))?;
    envelope
        .data
        .ok_or_else(|| ClientError::Decode("response envelope has no data".into()))
}

fn api_error(status: StatusCode, text: &str) -> ClientError {
    let envelope = serde_json::from_str::<ApiResponse<ErrorBody>>(text).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    let (code, details) = envelope
        .and_then(|e| e.data)
        .map(|body| (body.code, body.details))
        .unwrap_or((None, None));

    ClientError::Api {
        status: status.as_u16(),
        message,
        code,
        details,
    }
}
