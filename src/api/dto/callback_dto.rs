//! Callback request and reply DTOs.

use serde::{Deserialize, Serialize};

use crate::bot::Inbound;
use crate::error::RsvpError;

/// Request body for `POST /v1/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Callbacks in delivery order. May be empty.
    #[serde(default)]
    pub events: Vec<CallbackEvent>,
}

/// One platform callback.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    /// The user followed the bot.
    Follow {
        /// Platform user id.
        user_id: String,
    },
    /// The user sent a text message.
    Message {
        /// Platform user id.
        user_id: String,
        /// Message body.
        text: String,
    },
}

impl CallbackEvent {
    /// Returns the platform user id of the sender.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Follow { user_id } | Self::Message { user_id, .. } => user_id,
        }
    }
}

impl TryFrom<CallbackEvent> for Inbound {
    type Error = RsvpError;

    fn try_from(event: CallbackEvent) -> Result<Self, Self::Error> {
        if event.user_id().trim().is_empty() {
            return Err(RsvpError::InvalidRequest(
                "user_id must not be empty".to_string(),
            ));
        }
        Ok(match event {
            CallbackEvent::Follow { user_id } => Self::Follow { user_id },
            CallbackEvent::Message { user_id, text } => Self::Message { user_id, text },
        })
    }
}

/// Response body for `POST /v1/callback`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// One reply per callback, in request order.
    pub replies: Vec<ReplyDto>,
}

/// Text reply addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyDto {
    /// Recipient.
    pub user_id: String,
    /// Rendered reply text.
    pub text: String,
}
