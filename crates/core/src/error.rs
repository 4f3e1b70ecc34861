// Central Error Type for the Engine

use thiserror::Error;

/// Engine-level error type
///
/// An empty dispatch is not an error: `Dispatcher::dispatch_next` returns `Ok(None)`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for an illegal state-machine move
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            AppError::Domain(crate::domain::DomainError::InvalidStateTransition { .. })
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by mapping into StoreUnavailable / Conflict / NotFound
