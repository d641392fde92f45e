//! Service layer: business logic orchestration.
//!
//! [`CoordinationService`] validates each owner/event/participation
//! change and applies it through the persistence gateway inside a single
//! transaction.

pub mod coordination;

pub use coordination::CoordinationService;
