use std::{env, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashfreeEnv {
    Sandbox,
    Production,
}

impl CashfreeEnv {
    pub fn base_url(self) -> &'static str {
        match self {
            CashfreeEnv::Sandbox => "https://sandbox.cashfree.com/pg",
            CashfreeEnv::Production => "https://api.cashfree.com/pg",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CashfreeConfig {
    pub env: CashfreeEnv,
    pub app_id: String,
    pub secret: String,
    pub api_version: String,
    /// Overrides the URL derived from `env`.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl CashfreeConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.env.base_url().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_env: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub client_url: String,
    pub mock_payments_enabled: bool,
    pub cashfree: CashfreeConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .unwrap_or(24 * 30);
        let client_url = env::var("CLIENT_URL").unwrap_or_else(|_| "*".to_string());
        let mock_payments_enabled = env::var("MOCK_PAYMENTS")
            .ok()
            .and_then(|flag| parse_flag(&flag))
            .unwrap_or(app_env != "production");

        let cashfree_env = match env::var("CASHFREE_ENV").as_deref() {
            Ok("production") => CashfreeEnv::Production,
            _ => CashfreeEnv::Sandbox,
        };
        let timeout_secs = env::var("PAYMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(15);
        let cashfree = CashfreeConfig {
            env: cashfree_env,
            app_id: env::var("CASHFREE_APP_ID").unwrap_or_default(),
            secret: env::var("CASHFREE_SECRET").unwrap_or_default(),
            api_version: env::var("CASHFREE_API_VERSION")
                .unwrap_or_else(|_| "2023-08-01".to_string()),
            base_url: env::var("CASHFREE_BASE_URL").ok().filter(|url| !url.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            database_url,
            host,
            port,
            app_env,
            jwt_secret,
            jwt_ttl_hours,
            client_url,
            mock_payments_enabled,
            cashfree,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
