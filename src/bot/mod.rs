//! Chat-bot adapter: parses message commands, enforces the per-user
//! participation rules, and renders replies.

pub mod command;
pub mod handler;
pub mod reply;

pub use command::Command;
pub use handler::{BotHandler, Inbound};
pub use reply::Reply;
