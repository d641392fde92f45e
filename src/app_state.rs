//! Shared application state injected into all Axum handlers.

use crate::bot::BotHandler;
use crate::persistence::Store;
use crate::service::CoordinationService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState<S> {
    /// Chat command handler; owns the coordination service.
    pub bot: BotHandler<S>,
}

impl<S: Store> AppState<S> {
    /// Wires the service and bot adapter over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            bot: BotHandler::new(CoordinationService::new(store)),
        }
    }
}
