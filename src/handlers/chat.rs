use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{BookingIntent, FieldMap};
use crate::services::conversation::{self, ChatReply};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatPayload {
    pub message: InboundMessage,
}

/// Either a free-text message or a structured turn driven by a client
/// that is holding the collecting state itself.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    Text(String),
    Structured(StructuredTurn),
}

#[derive(Deserialize)]
pub struct StructuredTurn {
    pub action: TurnAction,
    #[serde(default)]
    pub intent: Option<BookingIntent>,
    #[serde(default)]
    pub current_state: FieldMap,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    UpdateField,
    CompleteBooking,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatReply>, AppError> {
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("default")
        .to_string();

    match payload.message {
        InboundMessage::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(AppError::Validation("message must not be empty".to_string()));
            }
            tracing::info!(session = %session_id, "chat message");
            let reply = conversation::process_message(&state, &session_id, text).await?;
            Ok(Json(reply))
        }
        InboundMessage::Structured(turn) => match turn.action {
            TurnAction::UpdateField => {
                let field = turn.field.ok_or_else(|| {
                    AppError::Validation("field is required for update_field".to_string())
                })?;
                let value = turn.value.unwrap_or_default();
                let reply = conversation::update_field(
                    &state,
                    &session_id,
                    turn.intent,
                    &turn.current_state,
                    &field,
                    &value,
                )?;
                Ok(Json(reply))
            }
            TurnAction::CompleteBooking => {
                let reply = conversation::complete_booking(
                    &state,
                    &session_id,
                    turn.intent,
                    &turn.current_state,
                )?;
                Ok(Json(reply))
            }
        },
    }
}
