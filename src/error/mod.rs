//! Error handling
//!
//! Defines error types and their conversion into user-facing replies.

pub mod handlers;
pub mod types;

pub use types::*;
