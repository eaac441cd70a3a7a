//! Server core functionality
//!
//! This module contains the HTTP server, the shared request state and the
//! routes and envelopes of the webhook API.

pub mod core;
pub mod envelope;
pub mod routes;

pub use core::{AppState, MessageLimits, MessageOutcome, Server};
