#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use storefront_api::{
    config::{AppConfig, CashfreeConfig, CashfreeEnv},
    db::{create_orm_conn, run_migrations},
    dto::orders::{CreateOrderRequest, OrderItemInput},
    entity::users::{ActiveModel as UserActive, Model as UserModel},
    middleware::auth::AuthUser,
    models::{PaymentMethod, ShippingAddress},
    payment::{GatewayError, GatewaySession, PaymentGateway, RemoteOrder, SessionRequest},
    pricing::DeliveryOption,
    services::auth_service::{hash_password, issue_token},
    state::AppState,
};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";
pub const PASSWORD: &str = "hunter2hunter2";

/// In-process gateway double. Remote status defaults to `ACTIVE` (unpaid).
pub struct StubGateway {
    status: Mutex<String>,
    failure: Mutex<Option<(u16, String)>>,
    pub sessions: AtomicUsize,
    pub fetches: AtomicUsize,
    pub last_request: Mutex<Option<SessionRequest>>,
}

impl Default for StubGateway {
    fn default() -> Self {
        Self {
            status: Mutex::new("ACTIVE".into()),
            failure: Mutex::new(None),
            sessions: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }
}

impl StubGateway {
    pub async fn set_status(&self, status: &str) {
        *self.status.lock().await = status.to_string();
    }

    pub async fn fail_with(&self, status: u16, message: &str) {
        *self.failure.lock().await = Some((status, message.to_string()));
    }

    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn check_failure(&self) -> Result<(), GatewayError> {
        match self.failure.lock().await.clone() {
            Some((status, message)) => Err(GatewayError::Rejected {
                status,
                message,
                details: json!({ "code": "stub_failure" }),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_session(&self, request: &SessionRequest) -> Result<GatewaySession, GatewayError> {
        self.check_failure().await?;
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().await = Some(request.clone());
        Ok(GatewaySession {
            payment_session_id: format!("session_{n}"),
            order_id: request.order_id.clone(),
        })
    }

    async fn fetch_order(&self, order_id: &str) -> Result<RemoteOrder, GatewayError> {
        self.check_failure().await?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteOrder {
            order_id: order_id.to_string(),
            gateway_order_id: Some("cf_2190".into()),
            status: self.status.lock().await.clone(),
            customer_email: Some("payer@example.com".into()),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        app_env: "test".into(),
        jwt_secret: JWT_SECRET.into(),
        jwt_ttl_hours: 1,
        client_url: "http://localhost:3000".into(),
        mock_payments_enabled: true,
        cashfree: CashfreeConfig {
            env: CashfreeEnv::Sandbox,
            app_id: "app".into(),
            secret: "secret".into(),
            api_version: "2023-08-01".into(),
            base_url: None,
            timeout: Duration::from_secs(2),
        },
    }
}

pub async fn setup_state(gateway: Arc<StubGateway>) -> anyhow::Result<AppState> {
    setup_state_with(test_config(), gateway).await
}

pub async fn setup_state_with(
    config: AppConfig,
    gateway: Arc<StubGateway>,
) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState {
        orm,
        config: Arc::new(config),
        gateway,
    })
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<UserModel> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{role} account")),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(PASSWORD).map_err(|e| anyhow::anyhow!(e.to_string()))?),
        role: Set(role.into()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(user)
}

pub fn auth_user(user: &UserModel) -> AuthUser {
    AuthUser {
        user_id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
    }
}

pub fn token_for(user: &UserModel) -> String {
    issue_token(JWT_SECRET, 1, user).expect("token")
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Asha Rao".into(),
        address: "12 MG Road".into(),
        city: "Pune".into(),
        state: "MH".into(),
        postal_code: "411001".into(),
        country: "India".into(),
        phone: "9876543210".into(),
    }
}

pub fn item(product: &str, price: serde_json::Value, qty: u32) -> OrderItemInput {
    OrderItemInput {
        product: product.into(),
        name: format!("Product {product}"),
        qty: Some(qty),
        price,
        image: format!("/img/{product}.png"),
    }
}

/// Two items at 500 each, standard delivery, no protection, no promo.
pub fn basic_order(payment_method: PaymentMethod) -> CreateOrderRequest {
    CreateOrderRequest {
        order_items: vec![item("p-500", json!(500), 2)],
        shipping_address: address(),
        payment_method,
        promo_code: None,
        delivery_option: DeliveryOption::Standard,
        protection: false,
        delivery_notes: None,
        expected_total: None,
    }
}
