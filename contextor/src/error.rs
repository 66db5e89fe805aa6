//! Typed error for the contextor crate.

use thiserror::Error;

/// Startup-time configuration errors. The pipeline itself never fails.
#[derive(Debug, Error)]
pub enum ContextorError {
    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}
