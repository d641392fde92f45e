//! Chat platform callback endpoint.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CallbackRequest, CallbackResponse, ReplyDto};
use crate::app_state::AppState;
use crate::bot::Inbound;
use crate::error::RsvpError;
use crate::persistence::Store;

/// `POST /v1/callback`: handle a batch of platform callbacks.
///
/// Callbacks are handled one after another in request order; the response
/// carries one reply per callback.
///
/// # Errors
///
/// Returns [`RsvpError::InvalidRequest`] if any callback has an empty
/// `user_id`. Nothing is applied in that case.
pub async fn callback_handler<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, RsvpError> {
    let inbound = req
        .events
        .into_iter()
        .map(Inbound::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(count = inbound.len(), "callback received");

    let mut replies = Vec::with_capacity(inbound.len());
    for event in inbound {
        let user_id = match &event {
            Inbound::Follow { user_id } | Inbound::Message { user_id, .. } => user_id.clone(),
        };
        let reply = state.bot.handle(event).await;
        replies.push(ReplyDto {
            user_id,
            text: reply.to_string(),
        });
    }

    Ok(Json(CallbackResponse { replies }))
}

/// Callback routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/v1/callback", post(callback_handler::<S>))
}
