//! Lookup service - find a payee by phone number or saved nickname

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, AccountSummary, ContactMatch};
use crate::ports::AccountStore;
use crate::services::ContactService;

pub struct LookupService {
    store: Arc<dyn AccountStore>,
    contacts: ContactService,
}

impl LookupService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        let contacts = ContactService::new(Arc::clone(&store));
        Self { store, contacts }
    }

    /// Find the account registered to `raw`.
    ///
    /// Non-digits are stripped first, so `"9123-1234"` matches `"91231234"`.
    /// Anything that is not exactly 8 digits is rejected before the store is
    /// queried.
    pub async fn find_by_phone_number(&self, raw: &str) -> Result<Option<AccountSummary>> {
        let phone = Account::normalize_phone(raw)
            .ok_or_else(|| Error::validation("Phone number must be exactly 8 digits."))?;
        Ok(self
            .store
            .find_account_by_phone(&phone)
            .await?
            .map(|account| account.summary()))
    }

    pub async fn resolve_contact(&self, owner_id: Uuid, nickname: &str) -> Result<Option<ContactMatch>> {
        self.contacts.resolve(owner_id, nickname).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRepository;

    #[tokio::test]
    async fn test_find_by_formatted_phone_number() {
        let store = Arc::new(InMemoryRepository::new());
        let mut bob = Account::new(Uuid::new_v4(), "Bob", "bob@x.com", "x");
        bob.phone_number = Some("91231234".to_string());
        store.insert_account(&bob).await.unwrap();

        let service = LookupService::new(store);
        let found = service.find_by_phone_number("9123-1234").await.unwrap().unwrap();
        assert_eq!(found.id, bob.id);
        assert_eq!(found.name, "Bob");

        assert!(service.find_by_phone_number("81231234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_wrong_length() {
        let service = LookupService::new(Arc::new(InMemoryRepository::new()));
        for raw in ["9123-123", "912312345", "", "abcdefgh"] {
            let err = service.find_by_phone_number(raw).await.unwrap_err();
            assert_eq!(err.public_message(), "Phone number must be exactly 8 digits.");
            assert_eq!(err.status_code(), 400);
        }
    }
}
