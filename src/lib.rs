//! Drive Assistant
//!
//! Controls a Google Drive account through short chat commands: a command
//! grammar, a virtual path resolver over Drive's parent/child object graph,
//! and a dispatcher that turns each command into a single text reply.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod summary;

pub use server::Server;
