//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure here is terminal for the current operation and maps 1:1 to
/// a caller-visible outcome; the HTTP boundary owns the transport mapping.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The record is absent, or soft-deleted where an active record was required.
    #[error("not found")]
    NotFound,

    /// The access policy denied the action.
    #[error("forbidden")]
    Forbidden,

    /// A conflict occurred (e.g. duplicate email, already-inactive account).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authentication failed: unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Authentication failed: the account has been deactivated.
    #[error("inactive account")]
    InactiveAccount,

    /// The persistence backend failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
