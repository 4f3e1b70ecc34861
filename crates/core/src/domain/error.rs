// Domain errors: state machine violations and unparseable stored values

use crate::domain::MessageStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid message state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: MessageStatus,
        to: MessageStatus,
    },

    /// A stored status string outside the known set
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
