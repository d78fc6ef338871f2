//! Contact book service - per-user saved recipients

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::result::{Error, Party, Result};
use crate::domain::{Account, Contact, ContactMatch, NewContact, DEFAULT_BANK_NAME};
use crate::ports::AccountStore;

pub struct ContactService {
    store: Arc<dyn AccountStore>,
}

impl ContactService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Save a contact in `owner_id`'s book
    pub async fn add_contact(&self, owner_id: Uuid, contact: NewContact) -> Result<Contact> {
        if self.store.get_account(owner_id).await?.is_none() {
            return Err(Error::NotFound(Party::Account));
        }

        let official_name = contact.official_name.trim().to_string();
        if official_name.is_empty() {
            return Err(Error::validation("officialName is required."));
        }
        let nicknames = Contact::normalize_nicknames(&contact.nicknames);
        if nicknames.is_empty() {
            return Err(Error::validation("At least one nickname is required."));
        }
        let account_number = contact.account_number.trim().to_string();
        if account_number.is_empty() {
            return Err(Error::validation("accountNumber is required."));
        }
        let phone_number = match non_empty(contact.phone_number) {
            Some(raw) => Some(
                Account::normalize_phone(&raw)
                    .ok_or_else(|| Error::validation("Phone number must be exactly 8 digits."))?,
            ),
            None => None,
        };

        let contact = Contact {
            id: Uuid::new_v4(),
            owner_id,
            official_name,
            nicknames,
            phone_number,
            bank_name: non_empty(contact.bank_name).unwrap_or_else(|| DEFAULT_BANK_NAME.to_string()),
            account_number,
            relationship: non_empty(contact.relationship),
            created_at: Utc::now(),
        };
        self.store.insert_contact(&contact).await?;
        Ok(contact)
    }

    pub async fn list_contacts(&self, owner_id: Uuid) -> Result<Vec<Contact>> {
        self.store.list_contacts(owner_id).await
    }

    /// Find the contact the owner calls `nickname` (case-insensitive, exact)
    pub async fn resolve(&self, owner_id: Uuid, nickname: &str) -> Result<Option<ContactMatch>> {
        if nickname.trim().is_empty() {
            return Err(Error::validation("nickname is required."));
        }
        Ok(self
            .store
            .list_contacts(owner_id)
            .await?
            .iter()
            .find(|c| c.answers_to(nickname))
            .map(Contact::to_match))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
