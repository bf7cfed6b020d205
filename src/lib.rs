//! Seance
//!
//! A backend for persona chat over imported conversation exports: parse a
//! chat export, derive a persona, and talk to it through a language model,
//! with free/pro entitlements, daily quotas, promo codes and gateway
//! payments.
//!
//! # Features
//!
//! - `sqlx-storage` (default): PostgreSQL storage via SQLx
//! - `memory-storage`: In-memory storage for testing
//!
//! # Example
//!
//! ```rust,ignore
//! use seance::{AppState, Config, SqlxStorage, routes};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     dotenvy::dotenv().ok();
//!     let config = Config::from_env()?;
//!     let pool = sqlx::PgPool::connect(&std::env::var("DATABASE_URL")?).await?;
//!     let storage = SqlxStorage::new(pool);
//!     storage.migrate().await?;
//!
//!     let state = Arc::new(AppState::new(config, storage));
//!
//!     let app = axum::Router::new()
//!         .nest("/chat", routes::chat_router())
//!         .nest("/entitlement", routes::entitlement_router())
//!         .nest("/billing", routes::billing_router())
//!         .nest("/admin", routes::admin_router())
//!         .with_state(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod llm;
pub mod models;
pub mod parser;
pub mod payment;
pub mod routes;
pub mod storage;

// Re-exports for convenience
use std::sync::Arc;

pub use auth::{AdminUser, AuthenticatedUser};
pub use clock::{Clock, SystemClock};
pub use config::{
    BillingConfig, Config, ConfigError, LimitsConfig, LlmConfig, SecurityConfig, ServerConfig,
};
pub use entitlement::{Entitlement, EntitlementEngine};
pub use error::{Error, Result, StorageError};
pub use llm::{LlmClient, PersonaProfile};
pub use models::{Plan, PlanDuration, PromoCode, Subscription, SubscriptionStatus};
pub use parser::{parse_export, ParseResult, ParsedMessage};
pub use payment::GatewayClient;
#[cfg(feature = "memory-storage")]
pub use storage::MemoryStorage;
#[cfg(feature = "sqlx-storage")]
pub use storage::SqlxStorage;
pub use storage::{BillingStorage, PromoStorage, Storage, SubscriptionStorage, UsageStorage};

/// Application state containing configuration, storage and the service
/// clients.
///
/// This is designed to be wrapped in `Arc` and used with Axum's state extractor.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Storage backend, shared with the entitlement engine.
    pub storage: Arc<dyn Storage>,
    /// Quota, promo and payment state machine.
    pub entitlements: EntitlementEngine,
    /// Payment gateway order client.
    pub gateway: GatewayClient,
    /// Language-model completion client.
    pub llm: LlmClient,
}

impl AppState {
    /// Create a new AppState with the given configuration and storage,
    /// using the system clock.
    pub fn new(config: Config, storage: impl Storage + 'static) -> Self {
        Self::with_clock(config, storage, Arc::new(SystemClock))
    }

    /// Create a new AppState with an injected clock. Tests use this with a
    /// fixed clock to drive expiry and quota-reset behavior.
    pub fn with_clock(
        config: Config,
        storage: impl Storage + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let storage: Arc<dyn Storage> = Arc::new(storage);
        let http_client = reqwest::Client::new();

        let entitlements = EntitlementEngine::new(
            storage.clone(),
            clock,
            config.billing.clone(),
            config.limits.clone(),
        );
        let gateway = GatewayClient::new(http_client.clone(), &config.billing);
        let llm = LlmClient::new(http_client, &config.llm);

        Self {
            config,
            storage,
            entitlements,
            gateway,
            llm,
        }
    }
}

/// Type alias for Arc-wrapped AppState, commonly used with Axum.
pub type SharedState = Arc<AppState>;
