//! Account service - registration and profile reads

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::result::{Error, Party, Result};
use crate::domain::{Account, AccountProfile, Cents, NewAccount};
use crate::ports::AccountStore;
use crate::services::BalanceCodec;

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    codec: Arc<BalanceCodec>,
    starting_balance: Cents,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, codec: Arc<BalanceCodec>, starting_balance: Cents) -> Self {
        Self {
            store,
            codec,
            starting_balance,
        }
    }

    /// Open a new account funded with the configured starting balance
    pub async fn register_account(&self, new_account: NewAccount) -> Result<Uuid> {
        let name = new_account.name.trim().to_string();
        let email = new_account.email.trim().to_string();
        if name.is_empty() || email.is_empty() {
            return Err(Error::validation("Name and email are required."));
        }

        let email_lower = Account::normalize_email(&email);
        if self.store.find_account_by_email(&email_lower).await?.is_some() {
            return Err(Error::Duplicate("Email is already registered.".to_string()));
        }

        let phone_number = match new_account
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            Some(raw) => {
                let phone = Account::normalize_phone(raw)
                    .ok_or_else(|| Error::validation("Phone number must be exactly 8 digits."))?;
                if self.store.find_account_by_phone(&phone).await?.is_some() {
                    return Err(Error::Duplicate("Phone number is already registered.".to_string()));
                }
                Some(phone)
            }
            None => None,
        };

        let mut account = Account::new(
            Uuid::new_v4(),
            name,
            email,
            self.codec.encrypt(self.starting_balance)?,
        );
        account.phone_number = phone_number;
        account.validate().map_err(Error::validation)?;

        self.store.insert_account(&account).await?;
        info!(account_id = %account.id, "account registered");
        Ok(account.id)
    }

    /// The account holder's own view, with the balance decrypted now
    pub async fn get_profile(&self, user_id: Uuid) -> Result<AccountProfile> {
        let account = self
            .store
            .get_account(user_id)
            .await?
            .ok_or(Error::NotFound(Party::Account))?;
        let balance = self.codec.decrypt_for(&account)?;

        Ok(AccountProfile {
            id: account.id,
            name: account.name,
            email: account.email,
            phone_number: account.phone_number,
            balance: balance.to_decimal(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRepository;
    use rust_decimal::Decimal;

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(BalanceCodec::new("k")),
            Cents::new(100_000).unwrap(),
        )
    }

    fn alice() -> NewAccount {
        NewAccount {
            name: " Alice ".to_string(),
            email: "Alice@Example.com".to_string(),
            phone_number: Some("9123-1234".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_and_profile() {
        let service = service();
        let id = service.register_account(alice()).await.unwrap();

        let profile = service.get_profile(id).await.unwrap();
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.phone_number.as_deref(), Some("91231234"));
        assert_eq!(profile.balance, Decimal::new(100000, 2));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let service = service();
        service.register_account(alice()).await.unwrap();

        let again = NewAccount {
            email: "alice@EXAMPLE.com".to_string(),
            phone_number: None,
            ..alice()
        };
        let err = service.register_account(again).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.public_message(), "Email is already registered.");
    }

    #[tokio::test]
    async fn test_duplicate_phone_and_missing_fields() {
        let service = service();
        service.register_account(alice()).await.unwrap();

        let same_phone = NewAccount {
            email: "other@example.com".to_string(),
            ..alice()
        };
        assert!(matches!(
            service.register_account(same_phone).await,
            Err(Error::Duplicate(_))
        ));

        let nameless = NewAccount {
            name: "  ".to_string(),
            ..alice()
        };
        assert!(matches!(
            service.register_account(nameless).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_of_unknown_account() {
        assert!(matches!(
            service().get_profile(Uuid::new_v4()).await,
            Err(Error::NotFound(Party::Account))
        ));
    }
}
