use crate::domain::payment::PaymentStatus;
use thiserror::Error;

/// Errors surfaced by the payment engine.
///
/// Validation and state checks run before any persisted mutation: a failed
/// operation leaves the record exactly as it was.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("operation '{operation}' is not allowed while the payment is '{status}'")]
    State {
        operation: &'static str,
        status: PaymentStatus,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("external service failure: {0}")]
    ExternalService(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state(operation: &'static str, status: PaymentStatus) -> Self {
        Self::State { operation, status }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
