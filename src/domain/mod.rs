//! Domain layer: identifiers and the four persisted entities.
//!
//! This module contains the typed identifiers shared by every layer,
//! the [`Event`] aggregate with its [`EventStatus`] lifecycle, and the
//! owner / participation / vote records.

pub mod event;
pub mod ids;
pub mod participation;

pub use event::{Event, EventStatus};
pub use ids::{EventId, OwnerId, UserId};
pub use participation::{Owner, Participation, User, Vote, VoteRecord};
