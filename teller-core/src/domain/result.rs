//! Result and error types for the core library

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Caller-facing message for integrity faults. Details stay in the server log.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to transfer funds.";

/// Which account a lookup failed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Sender,
    Recipient,
    Account,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Party::Sender => "Sender",
            Party::Recipient => "Recipient",
            Party::Account => "Account",
        })
    }
}

/// One write of a transfer commit, in the order the fallback path applies them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStep {
    SenderDebit,
    RecipientCredit,
    LogAppend,
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    InvalidAmount(String),

    #[error("Cannot transfer to the same account.")]
    SelfTransfer,

    #[error("{0} not found.")]
    NotFound(Party),

    #[error("Insufficient funds.")]
    InsufficientFunds,

    #[error("{0}")]
    Duplicate(String),

    #[error("Corrupt balance: {reason}")]
    CorruptBalance {
        account_id: Option<Uuid>,
        reason: String,
    },

    #[error("Transfer commit failed (applied: {applied:?}): {reason}")]
    CommitFailure {
        applied: Vec<CommitStep>,
        reason: String,
    },

    /// Optimistic concurrency check failed; the write was not applied
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a corrupt balance error for a known account
    pub fn corrupt_balance(account_id: Uuid, reason: impl Into<String>) -> Self {
        Self::CorruptBalance {
            account_id: Some(account_id),
            reason: reason.into(),
        }
    }

    /// Data-integrity faults: logged in full, hidden from the caller
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, Self::CorruptBalance { .. } | Self::CommitFailure { .. })
    }

    /// Stable status code for the caller boundary
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidAmount(_)
            | Self::SelfTransfer
            | Self::InsufficientFunds
            | Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Duplicate(_) => 409,
            Self::CorruptBalance { .. }
            | Self::CommitFailure { .. }
            | Self::Conflict(_)
            | Self::Database(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => 500,
        }
    }

    /// Message safe to show the caller verbatim
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            e if e.status_code() < 500 => e.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::Database(format!("{:#}", e))
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error shape handed across the caller boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl From<&Error> for ApiError {
    fn from(e: &Error) -> Self {
        Self {
            status: e.status_code(),
            message: e.public_message(),
        }
    }
}

/// Operation result for JSON boundaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError::from(error)),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_keep_their_message() {
        assert_eq!(Error::InsufficientFunds.public_message(), "Insufficient funds.");
        assert_eq!(Error::SelfTransfer.public_message(), "Cannot transfer to the same account.");
        assert_eq!(Error::NotFound(Party::Recipient).public_message(), "Recipient not found.");
        assert_eq!(
            Error::validation("Phone number must be exactly 8 digits.").public_message(),
            "Phone number must be exactly 8 digits."
        );
    }

    #[test]
    fn test_integrity_faults_are_hidden() {
        let err = Error::corrupt_balance(Uuid::new_v4(), "bad hex");
        assert!(err.is_integrity_fault());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);

        let err = Error::CommitFailure {
            applied: vec![CommitStep::SenderDebit],
            reason: "disk full".to_string(),
        };
        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
        assert!(err.to_string().contains("SenderDebit"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::InvalidAmount("x".into()).status_code(), 400);
        assert_eq!(Error::NotFound(Party::Sender).status_code(), 404);
        assert_eq!(Error::Duplicate("x".into()).status_code(), 409);
        assert_eq!(Error::database("x").status_code(), 500);
    }

    #[test]
    fn test_operation_result_from_error() {
        let err: Result<i32> = Err(Error::InsufficientFunds);
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(
            result.error,
            Some(ApiError {
                status: 400,
                message: "Insufficient funds.".to_string()
            })
        );

        let ok: Result<i32> = Ok(42);
        let result: OperationResult<i32> = ok.into();
        assert!(result.success);
        assert_eq!(result.data, Some(42));
    }
}
