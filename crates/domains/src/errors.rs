//! # DomainError
//!
//! Centralized error handling for the forum service.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Resource not found (e.g., User, Forum, Thread, Post)
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Resource already exists or the request contradicts stored state
    /// (e.g., duplicate email, a parent post from another thread)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller error (e.g., unknown sort mode, voice outside {-1, +1})
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Infrastructure failure (e.g., DB down, pool exhausted)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str, key: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), key.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(..))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A specialized Result type for forum logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;

/// Outcome of a create operation whose duplicate case hands back the stored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome<T> {
    Created(T),
    AlreadyExists(T),
}

impl<T> CreateOutcome<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Created(v) | Self::AlreadyExists(v) => v,
        }
    }
}
