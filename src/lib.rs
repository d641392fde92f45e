//! # rsvp-gateway
//!
//! Chat-bot backend for hosting lightweight events. A host opens an event,
//! shares its id, participants join and vote, and the host closes it.
//!
//! Every state change goes through [`service::CoordinationService`], which
//! validates it and applies it inside one storage transaction. Storage is
//! PostgreSQL in production and an in-process store for tests and
//! database-less runs.
//!
//! ## Architecture
//!
//! ```text
//! Chat platform (HTTP callbacks)
//!     │
//!     ├── Callback handler (api/)
//!     ├── BotHandler: commands, per-user rules (bot/)
//!     │
//!     ├── CoordinationService (service/)
//!     │
//!     └── Store: PostgreSQL | memory (persistence/)
//! ```
//!
//! ## Event lifecycle
//!
//! ```text
//! STANDBY ──▶ OPEN ──▶ CLOSED
//!    └─────────────────▲
//! ```
//!
//! Transitions only move forward and an owner has at most one event that
//! is not closed.

pub mod api;
pub mod app_state;
pub mod bot;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
