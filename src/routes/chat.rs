//! Chat routes: export import and quota-gated persona chat.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    error::{Error, Result},
    llm::{ChatTurn, PersonaProfile},
    parser::{self, ParseResult},
    AppState,
};

/// Create an Axum router with the chat routes.
///
/// Routes:
/// - `POST /import` - Parse an uploaded chat export
/// - `POST /send` - Send a message to the persona, gated by the daily quota
pub fn chat_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/import", post(import_export))
        .route("/send", post(send_message))
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// False when no message header was recognized; the client surfaces a
    /// "could not parse" state from this.
    pub parsed: bool,
    #[serde(flatten)]
    pub result: ParseResult,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub message: String,
    pub persona: PersonaProfile,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub reply: String,
    pub messages_sent_today: i32,
}

/// Parse an uploaded chat export into messages and participants.
///
/// Parsing never fails; an unrecognizable file comes back with `parsed:
/// false` and the raw preview for display.
pub async fn import_export(
    user: AuthenticatedUser,
    body: String,
) -> Result<Json<ImportResponse>> {
    let result = parser::parse_export(&body);

    tracing::info!(
        user_id = %user.user_id,
        messages = result.messages.len(),
        participants = result.participants.len(),
        "parsed chat export"
    );

    Ok(Json(ImportResponse {
        parsed: result.recognized_any(),
        result,
    }))
}

/// Send one message to the persona.
///
/// The entitlement gate runs first: the quota counter is incremented
/// atomically, and only an accepted send reaches the language model.
pub async fn send_message(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>> {
    if payload.message.trim().is_empty() {
        return Err(Error::InvalidRequest("message must not be empty".to_string()));
    }

    let decision = state.entitlements.record_send(&user.user_id).await?;
    if !decision.accepted {
        return Err(Error::QuotaExceeded);
    }

    let reply = state
        .llm
        .complete(&payload.persona, &payload.history, &payload.message)
        .await?;

    Ok(Json(SendResponse {
        reply,
        messages_sent_today: decision.new_count,
    }))
}
