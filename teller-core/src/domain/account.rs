//! Account domain model

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local phone numbers are exactly this many digits
pub const PHONE_DIGITS: usize = 8;

/// A ledger account owned by one user
///
/// The balance is only ever held in encrypted form. Decoding goes through
/// the balance codec, which is why there is no plain balance field here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Normalized 8-digit phone number, unique when present
    pub phone_number: Option<String>,
    /// Opaque `nonce:ciphertext` string produced by the balance codec
    pub encrypted_balance: String,
    /// Bumped on every balance write; used for compare-and-swap
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with required fields
    pub fn new(
        id: Uuid,
        name: impl Into<String>,
        email: impl Into<String>,
        encrypted_balance: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone_number: None,
            encrypted_balance: encrypted_balance.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lowercased email used for uniqueness checks
    pub fn email_lower(&self) -> String {
        Self::normalize_email(&self.email)
    }

    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Strip every non-digit and require exactly [`PHONE_DIGITS`] digits.
    ///
    /// `"9123-1234"` and `"+ 9123 1234"` both normalize to `"91231234"`.
    pub fn normalize_phone(raw: &str) -> Option<String> {
        static NON_DIGIT: OnceLock<Regex> = OnceLock::new();
        let re = NON_DIGIT.get_or_init(|| Regex::new(r"\D").expect("valid regex"));
        let digits = re.replace_all(raw.trim(), "").to_string();
        (digits.len() == PHONE_DIGITS).then_some(digits)
    }

    /// Validate account data
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.name.trim().is_empty() {
            return Err("account name cannot be empty");
        }
        if self.email.trim().is_empty() {
            return Err("email cannot be empty");
        }
        if self.encrypted_balance.is_empty() {
            return Err("encrypted balance must be set");
        }
        if let Some(phone) = &self.phone_number {
            if Self::normalize_phone(phone).as_deref() != Some(phone.as_str()) {
                return Err("phone number must be exactly 8 digits");
            }
        }
        Ok(())
    }

    /// Non-sensitive projection for lookups
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            name: self.name.clone(),
            phone_number: self.phone_number.clone(),
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// What a phone lookup is allowed to reveal: never the balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub phone_number: Option<String>,
}

/// The signed-in user's own view, with a freshly decrypted balance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub balance: Decimal,
}
