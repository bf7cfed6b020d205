//! HTTP route handlers for chat, entitlement, billing and admin operations.

pub mod admin;
pub mod billing;
pub mod chat;
pub mod entitlement;

pub use admin::{
    admin_router, create_promo, delete_promo, delete_subscription, list_promos, set_subscription,
    update_promo,
};
pub use billing::{billing_router, create_order, payment_webhook, verify_payment};
pub use chat::{chat_router, import_export, send_message};
pub use entitlement::{entitlement_router, delete_my_data, get_entitlement, redeem_promo, validate_promo};
