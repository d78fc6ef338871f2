//! Transfer domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::{Cents, MAX_CENTS};
use super::result::{Error, Result};

/// Longest accepted idempotency key
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Terminal state of a logged transfer
///
/// Only completed transfers are ever persisted; rejected or failed attempts
/// leave no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Completed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "completed" => Ok(TransferStatus::Completed),
            other => Err(Error::database(format!("unknown transfer status '{}'", other))),
        }
    }
}

/// An entry in the append-only transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount_cents: Cents,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
    /// Client-supplied key, unique per sender
    pub idempotency_key: Option<String>,
}

impl TransferRecord {
    /// Create the record for a transfer that is about to commit
    pub fn completed(transfer: &ValidatedTransfer) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: transfer.sender_id,
            recipient_id: transfer.recipient_id,
            amount_cents: transfer.amount,
            status: TransferStatus::Completed,
            created_at: Utc::now(),
            idempotency_key: transfer.idempotency_key.clone(),
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount_cents.to_decimal()
    }

    /// Direction relative to `user_id`, or None if the user is not a party
    pub fn direction_for(&self, user_id: Uuid) -> Option<Direction> {
        if self.sender_id == user_id {
            Some(Direction::Sent)
        } else if self.recipient_id == user_id {
            Some(Direction::Received)
        } else {
            None
        }
    }
}

/// Raw transfer request as received from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub sender_id: String,
    pub recipient_id: String,
    /// Dollars, as the caller typed them
    pub amount: Option<f64>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    pub fn new(sender_id: impl Into<String>, recipient_id: impl Into<String>, amount: f64) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            amount: Some(amount),
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Run every caller-side check, in order, before touching storage.
    ///
    /// 1. both ids present and well-formed
    /// 2. sender differs from recipient
    /// 3. amount finite and positive
    /// 4. amount still positive after rounding to cents
    pub fn validate(&self) -> Result<ValidatedTransfer> {
        let sender_raw = self.sender_id.trim();
        let recipient_raw = self.recipient_id.trim();
        let amount = match self.amount {
            Some(amount) if !sender_raw.is_empty() && !recipient_raw.is_empty() => amount,
            _ => {
                return Err(Error::InvalidRequest(
                    "senderId, recipientId, and amount are required.".to_string(),
                ))
            }
        };

        // Compare the raw forms too so "A" -> "A" is a self-transfer even
        // before we know whether "A" is a valid id.
        if sender_raw == recipient_raw {
            return Err(Error::SelfTransfer);
        }

        let (sender_id, recipient_id) = match (Uuid::parse_str(sender_raw), Uuid::parse_str(recipient_raw)) {
            (Ok(s), Ok(r)) => (s, r),
            _ => {
                return Err(Error::InvalidRequest(
                    "Invalid senderId or recipientId.".to_string(),
                ))
            }
        };
        if sender_id == recipient_id {
            return Err(Error::SelfTransfer);
        }

        if !amount.is_finite() || amount <= 0.0 {
            return Err(Error::InvalidAmount(
                "Amount must be a valid number greater than 0.".to_string(),
            ));
        }

        let amount = match Cents::from_dollars(amount) {
            Some(cents) if cents.get() > 0 => cents,
            Some(_) => {
                return Err(Error::InvalidAmount("Amount must be greater than 0.".to_string()))
            }
            None => {
                return Err(Error::InvalidAmount(format!(
                    "Amount must not exceed {}.",
                    Cents::new(MAX_CENTS).unwrap_or_default()
                )))
            }
        };

        let idempotency_key = match self.idempotency_key.as_deref().map(str::trim) {
            None => None,
            Some(key) if !key.is_empty() && key.len() <= MAX_IDEMPOTENCY_KEY_LEN => {
                Some(key.to_string())
            }
            Some(_) => {
                return Err(Error::InvalidRequest(format!(
                    "idempotencyKey must be 1 to {} characters.",
                    MAX_IDEMPOTENCY_KEY_LEN
                )))
            }
        };

        Ok(ValidatedTransfer {
            sender_id,
            recipient_id,
            amount,
            idempotency_key,
        })
    }
}

/// A request that passed validation; safe to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: Cents,
    pub idempotency_key: Option<String>,
}

/// Id and post-transfer balance of one party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBalance {
    pub id: Uuid,
    pub balance: Decimal,
}

/// What a successful transfer returns to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub amount: Decimal,
    pub sender: PartyBalance,
    pub recipient: PartyBalance,
    /// True when an idempotency key matched an earlier transfer
    pub replayed: bool,
}

/// A compare-and-swap balance write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub account_id: Uuid,
    /// Version read before computing the new balance
    pub expected_version: i64,
    pub encrypted_balance: String,
}

/// Everything one transfer writes
#[derive(Debug, Clone)]
pub struct TransferCommit {
    pub debit: BalanceUpdate,
    pub credit: BalanceUpdate,
    pub record: TransferRecord,
}

/// Transfer direction from the querying user's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// A log entry as shown to one of its two parties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub counterpart_name: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: TransferStatus,
}
