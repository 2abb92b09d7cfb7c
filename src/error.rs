//! Error types surfaced by the note store and rate limiter.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NoteError>;

/// Errors returned by note and rate-limit operations.
///
/// `NotFound` deliberately covers expired, fully consumed, and never-created
/// identifiers alike, so a response never reveals whether a secret existed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NoteError {
    /// Note contents exceed the configured size limit.
    #[error("note size {size} exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// Metadata exceeds the configured size limit.
    #[error("meta size {size} exceeds maximum of {max} bytes")]
    InvalidMeta { size: usize, max: usize },

    /// The consumption policy is missing or out of range.
    #[error("invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    /// No live note exists under the requested identifier.
    #[error("note not found")]
    NotFound,

    /// The caller exhausted the sliding-window budget for this action.
    #[error("rate limit exceeded for {action}")]
    RateLimited { action: String },

    /// The backing store is unreachable or misbehaved.
    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },
}
