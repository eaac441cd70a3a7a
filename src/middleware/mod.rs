//! Server middleware
//!
//! Provides logging, rate limiting and per-sender serialization.

pub mod logging;
pub mod rate_limit;
pub mod sender_lock;

pub use rate_limit::RateLimiter;
pub use sender_lock::SenderLocks;
