//! Navigate module
//!
//! Resolves virtual paths such as `/Reports/2024/q1.pdf` to store objects by
//! walking one name lookup per segment from the root.

mod operations;
mod results;

// Re-export public types and functions
pub use operations::PathResolver;
pub use results::{AmbiguityPolicy, ResolvedObject};
