//! Data Transfer Objects for request/response serialization.

pub mod callback_dto;

pub use callback_dto::*;
