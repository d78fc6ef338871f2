//! Saved-recipient domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_BANK_NAME: &str = "DBS";

/// A recipient saved in one user's contact book
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub official_name: String,
    /// Names the owner uses for this person ("mum", "landlord")
    pub nicknames: Vec<String>,
    pub phone_number: Option<String>,
    pub bank_name: String,
    pub account_number: String,
    pub relationship: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Case-insensitive exact match against any nickname
    pub fn answers_to(&self, nickname: &str) -> bool {
        let wanted = nickname.trim().to_lowercase();
        self.nicknames.iter().any(|n| n.trim().to_lowercase() == wanted)
    }

    /// Trim, drop empties and case-insensitive duplicates, keep first spelling
    pub fn normalize_nicknames(nicknames: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        nicknames
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
            .collect()
    }

    pub fn to_match(&self) -> ContactMatch {
        ContactMatch {
            name: self.official_name.clone(),
            phone_number: self.phone_number.clone(),
            account: self.account_number.clone(),
            bank: self.bank_name.clone(),
            relationship: self.relationship.clone(),
        }
    }
}

/// Input for adding a contact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub official_name: String,
    pub nicknames: Vec<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    pub account_number: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// Result of resolving a nickname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMatch {
    pub name: String,
    pub phone_number: Option<String>,
    pub account: String,
    pub bank: String,
    pub relationship: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_normalization() {
        let raw = vec![
            " Mum ".to_string(),
            "mum".to_string(),
            "".to_string(),
            "Mother".to_string(),
        ];
        assert_eq!(Contact::normalize_nicknames(&raw), vec!["Mum", "Mother"]);
    }

    #[test]
    fn test_answers_to_is_case_insensitive_exact() {
        let contact = Contact {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            official_name: "Tan Mei Ling".to_string(),
            nicknames: vec!["Mum".to_string()],
            phone_number: None,
            bank_name: DEFAULT_BANK_NAME.to_string(),
            account_number: "123-456".to_string(),
            relationship: Some("mother".to_string()),
            created_at: Utc::now(),
        };
        assert!(contact.answers_to("mum"));
        assert!(contact.answers_to(" MUM "));
        assert!(!contact.answers_to("mu"));
        assert!(!contact.answers_to("mummy"));
    }
}
