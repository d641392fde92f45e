//! HTTP endpoint handlers.

pub mod callback;
pub mod system;

use axum::Router;

use crate::app_state::AppState;
use crate::persistence::Store;

/// Composes all routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .merge(callback::routes())
        .merge(system::routes())
}
