//! Configuration types for the persona chat backend.

use serde::Deserialize;

use crate::models::PlanDuration;

/// Root configuration for the application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Security-related configuration.
    pub security: SecurityConfig,
    /// Payment gateway configuration.
    pub billing: BillingConfig,
    /// Language-model endpoint configuration.
    pub llm: LlmConfig,
    /// Quota limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Secret key for JWT token signing.
    pub jwt_secret: String,
}

/// Payment gateway credentials and plan pricing.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Gateway API key id.
    pub key_id: String,
    /// Gateway API key secret, also used for synchronous signature checks.
    pub key_secret: String,
    /// Shared secret for webhook signature checks.
    pub webhook_secret: String,
    /// Gateway API base URL.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    /// ISO currency code for orders.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Pro price per week, in minor currency units.
    #[serde(default = "default_price_week")]
    pub price_week: i64,
    /// Pro price per month, in minor currency units.
    #[serde(default = "default_price_month")]
    pub price_month: i64,
    /// Pro price per year, in minor currency units.
    #[serde(default = "default_price_year")]
    pub price_year: i64,
}

impl BillingConfig {
    /// Base price for one period of the given duration.
    #[must_use]
    pub fn base_price(&self, duration: PlanDuration) -> i64 {
        match duration {
            PlanDuration::Week => self.price_week,
            PlanDuration::Month => self.price_month,
            PlanDuration::Year => self.price_year,
        }
    }
}

/// Language-model endpoint configuration (OpenAI-compatible chat API).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Completions endpoint URL.
    pub api_url: String,
    /// Bearer token for the endpoint.
    pub api_key: String,
    /// Model identifier to request.
    #[serde(default = "default_model")]
    pub model: String,
}

/// Quota limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Messages a free-tier user may send per calendar day.
    #[serde(default = "default_free_daily_messages")]
    pub free_daily_messages: u32,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_gateway_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_price_week() -> i64 {
    19900
}

fn default_price_month() -> i64 {
    49900
}

fn default_price_year() -> i64 {
    399900
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_free_daily_messages() -> u32 {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free_daily_messages: default_free_daily_messages(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Expected environment variables:
    /// - `JWT_SECRET`
    /// - `PAYMENT_KEY_ID`
    /// - `PAYMENT_KEY_SECRET`
    /// - `PAYMENT_WEBHOOK_SECRET`
    /// - `PAYMENT_GATEWAY_URL` (optional)
    /// - `PAYMENT_CURRENCY` (optional, defaults to "INR")
    /// - `PRICE_WEEK` / `PRICE_MONTH` / `PRICE_YEAR` (optional, minor units)
    /// - `LLM_API_URL`
    /// - `LLM_API_KEY`
    /// - `LLM_MODEL` (optional)
    /// - `FREE_DAILY_MESSAGES` (optional, defaults to 10)
    /// - `HOST` (optional, defaults to "0.0.0.0")
    /// - `PORT` (optional, defaults to 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let security = SecurityConfig {
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| ConfigError::MissingEnv("JWT_SECRET"))?,
        };

        let billing = BillingConfig {
            key_id: std::env::var("PAYMENT_KEY_ID")
                .map_err(|_| ConfigError::MissingEnv("PAYMENT_KEY_ID"))?,
            key_secret: std::env::var("PAYMENT_KEY_SECRET")
                .map_err(|_| ConfigError::MissingEnv("PAYMENT_KEY_SECRET"))?,
            webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET")
                .map_err(|_| ConfigError::MissingEnv("PAYMENT_WEBHOOK_SECRET"))?,
            gateway_url: std::env::var("PAYMENT_GATEWAY_URL")
                .unwrap_or_else(|_| default_gateway_url()),
            currency: std::env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| default_currency()),
            price_week: std::env::var("PRICE_WEEK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_price_week),
            price_month: std::env::var("PRICE_MONTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_price_month),
            price_year: std::env::var("PRICE_YEAR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_price_year),
        };

        let llm = LlmConfig {
            api_url: std::env::var("LLM_API_URL")
                .map_err(|_| ConfigError::MissingEnv("LLM_API_URL"))?,
            api_key: std::env::var("LLM_API_KEY")
                .map_err(|_| ConfigError::MissingEnv("LLM_API_KEY"))?,
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| default_model()),
        };

        let limits = LimitsConfig {
            free_daily_messages: std::env::var("FREE_DAILY_MESSAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_free_daily_messages),
        };

        let server = ServerConfig {
            host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_port),
        };

        Ok(Self {
            security,
            billing,
            llm,
            limits,
            server,
        })
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
}
