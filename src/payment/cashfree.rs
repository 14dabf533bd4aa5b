use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::CashfreeConfig;

use super::gateway::{
    CustomerDetails, GatewayError, GatewaySession, PaymentGateway, RemoteOrder, SessionRequest,
};

/// Cashfree PG client.
#[derive(Debug, Clone)]
pub struct CashfreeGateway {
    client: Client,
    base_url: String,
    app_id: String,
    secret: String,
    api_version: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    order_id: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    order_amount: Decimal,
    order_currency: &'a str,
    customer_details: &'a CustomerDetails,
}

#[derive(Deserialize)]
struct CreateOrderReply {
    payment_session_id: String,
    order_id: String,
}

#[derive(Deserialize)]
struct OrderReply {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    cf_order_id: Option<Value>,
    #[serde(default)]
    order_status: Option<String>,
    #[serde(default)]
    customer_details: Option<CustomerReply>,
}

#[derive(Deserialize)]
struct CustomerReply {
    #[serde(default)]
    customer_email: Option<String>,
}

impl CashfreeGateway {
    pub fn new(config: &CashfreeConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            app_id: config.app_id.clone(),
            secret: config.secret.clone(),
            api_version: config.api_version.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-version", &self.api_version)
            .header("x-client-id", &self.app_id)
            .header("x-client-secret", &self.secret)
    }
}

#[async_trait]
impl PaymentGateway for CashfreeGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<GatewaySession, GatewayError> {
        let body = CreateOrderBody {
            order_id: &request.order_id,
            order_amount: request.amount,
            order_currency: &request.currency,
            customer_details: &request.customer,
        };

        let response = self
            .authorize(self.client.post(format!("{}/orders", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let reply: CreateOrderReply =
            read_reply(response, "Cashfree order create failed").await?;

        tracing::debug!(order_id = %reply.order_id, "cashfree session created");
        Ok(GatewaySession {
            payment_session_id: reply.payment_session_id,
            order_id: reply.order_id,
        })
    }

    async fn fetch_order(&self, order_id: &str) -> Result<RemoteOrder, GatewayError> {
        let response = self
            .authorize(self.client.get(format!("{}/orders/{}", self.base_url, order_id)))
            .send()
            .await
            .map_err(transport_error)?;

        let reply: OrderReply = read_reply(response, "Cashfree order fetch failed").await?;

        let gateway_order_id = reply.cf_order_id.and_then(|id| match id {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Ok(RemoteOrder {
            order_id: reply.order_id.unwrap_or_else(|| order_id.to_string()),
            gateway_order_id,
            status: reply.order_status.unwrap_or_default(),
            customer_email: reply.customer_details.and_then(|c| c.customer_email),
        })
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

async fn read_reply<T: DeserializeOwned>(
    response: Response,
    fallback_message: &str,
) -> Result<T, GatewayError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or(fallback_message)
            .to_string();
        return Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
            details: body,
        });
    }

    serde_json::from_value(body).map_err(|e| GatewayError::Decode(e.to_string()))
}
