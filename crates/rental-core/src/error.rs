//! # Error Types
//!
//! Error hierarchy for the foundational crate. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts are always unsigned integers.
    #[error("float values are not permitted in canonical form, use integers: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation failures for domain primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Address is empty, too long, or contains non-alphanumeric characters.
    #[error("invalid address: \"{0}\" (expected 1-64 ASCII alphanumeric characters)")]
    InvalidAddress(String),

    /// Address bytes are not valid UTF-8.
    #[error("address bytes are not valid UTF-8")]
    NonUtf8Address,
}
