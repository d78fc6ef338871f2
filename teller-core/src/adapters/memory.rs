//! In-memory account store
//!
//! Used by unit tests and demos. Can be built with or without atomic
//! multi-write support so both commit paths of the transfer engine can be
//! exercised without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, BalanceUpdate, Contact, TransferCommit, TransferRecord};
use crate::ports::AccountStore;

#[derive(Default)]
struct State {
    accounts: HashMap<Uuid, Account>,
    /// Insertion order is the tie-breaker for equal timestamps
    transfers: Vec<TransferRecord>,
    contacts: Vec<Contact>,
}

impl State {
    fn check_balance_update(&self, update: &BalanceUpdate) -> Result<()> {
        let account = self
            .accounts
            .get(&update.account_id)
            .ok_or_else(|| Error::Conflict(format!("account {} disappeared", update.account_id)))?;
        if account.version != update.expected_version {
            return Err(Error::Conflict(format!(
                "account {} changed since version {}",
                update.account_id, update.expected_version
            )));
        }
        Ok(())
    }

    fn apply_balance_update(&mut self, update: &BalanceUpdate) -> Result<()> {
        self.check_balance_update(update)?;
        if let Some(account) = self.accounts.get_mut(&update.account_id) {
            account.encrypted_balance = update.encrypted_balance.clone();
            account.version += 1;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    fn check_transfer(&self, record: &TransferRecord) -> Result<()> {
        let duplicate = self.transfers.iter().any(|t| {
            t.id == record.id
                || (record.idempotency_key.is_some()
                    && t.sender_id == record.sender_id
                    && t.idempotency_key == record.idempotency_key)
        });
        if duplicate {
            return Err(Error::Conflict(format!("transfer {} already logged", record.id)));
        }
        Ok(())
    }
}

/// Account store held entirely in process memory
pub struct InMemoryRepository {
    state: Mutex<State>,
    atomic: bool,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Store with all-or-nothing transfer commits
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            atomic: true,
        }
    }

    /// Store without multi-write transactions, like a standalone document
    /// database. Transfers fall back to sequential writes.
    pub fn best_effort() -> Self {
        Self {
            state: Mutex::new(State::default()),
            atomic: false,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait]
impl AccountStore for InMemoryRepository {
    fn supports_atomic_multi_write(&self) -> bool {
        self.atomic
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let mut state = self.lock()?;
        let email_lower = account.email_lower();
        let clash = state.accounts.values().any(|a| {
            a.id == account.id
                || a.email_lower() == email_lower
                || (account.phone_number.is_some() && a.phone_number == account.phone_number)
        });
        if clash {
            return Err(Error::Duplicate(
                "An account with this email or phone number already exists.".to_string(),
            ));
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.lock()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_phone(&self, phone_number: &str) -> Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn find_account_by_email(&self, email_lower: &str) -> Result<Option<Account>> {
        Ok(self
            .lock()?
            .accounts
            .values()
            .find(|a| a.email_lower() == email_lower)
            .cloned())
    }

    async fn update_balance(&self, update: &BalanceUpdate) -> Result<()> {
        self.lock()?.apply_balance_update(update)
    }

    async fn append_transfer(&self, record: &TransferRecord) -> Result<()> {
        let mut state = self.lock()?;
        state.check_transfer(record)?;
        state.transfers.push(record.clone());
        Ok(())
    }

    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<()> {
        if !self.atomic {
            return Err(Error::database("this store does not support atomic multi-write"));
        }
        let mut state = self.lock()?;
        // Check everything before touching anything
        state.check_balance_update(&commit.debit)?;
        state.check_balance_update(&commit.credit)?;
        state.check_transfer(&commit.record)?;

        state.apply_balance_update(&commit.debit)?;
        state.apply_balance_update(&commit.credit)?;
        state.transfers.push(commit.record.clone());
        Ok(())
    }

    async fn list_transfers_for(&self, account_id: Uuid, limit: usize) -> Result<Vec<TransferRecord>> {
        let state = self.lock()?;
        let mut matching: Vec<(usize, &TransferRecord)> = state
            .transfers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.sender_id == account_id || t.recipient_id == account_id)
            .collect();
        matching.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn find_transfer_by_idempotency_key(
        &self,
        sender_id: Uuid,
        key: &str,
    ) -> Result<Option<TransferRecord>> {
        Ok(self
            .lock()?
            .transfers
            .iter()
            .find(|t| t.sender_id == sender_id && t.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        self.lock()?.contacts.push(contact.clone());
        Ok(())
    }

    async fn list_contacts(&self, owner_id: Uuid) -> Result<Vec<Contact>> {
        Ok(self
            .lock()?
            .contacts
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cents, TransferStatus};

    fn account(email: &str, phone: Option<&str>) -> Account {
        let mut a = Account::new(Uuid::new_v4(), "Test", email, "00:00");
        a.phone_number = phone.map(str::to_string);
        a
    }

    fn record(sender: Uuid, recipient: Uuid) -> TransferRecord {
        TransferRecord {
            id: Uuid::new_v4(),
            sender_id: sender,
            recipient_id: recipient,
            amount_cents: Cents::new(100).unwrap(),
            status: TransferStatus::Completed,
            created_at: Utc::now(),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_unique_email_and_phone() {
        let repo = InMemoryRepository::new();
        repo.insert_account(&account("a@x.com", Some("91231234"))).await.unwrap();

        let dup_email = repo.insert_account(&account("A@X.com", None)).await;
        assert!(matches!(dup_email, Err(Error::Duplicate(_))));

        let dup_phone = repo.insert_account(&account("b@x.com", Some("91231234"))).await;
        assert!(matches!(dup_phone, Err(Error::Duplicate(_))));

        // Two accounts without phone numbers are fine
        repo.insert_account(&account("c@x.com", None)).await.unwrap();
        repo.insert_account(&account("d@x.com", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let repo = InMemoryRepository::new();
        let a = account("a@x.com", None);
        repo.insert_account(&a).await.unwrap();

        let update = BalanceUpdate {
            account_id: a.id,
            expected_version: 0,
            encrypted_balance: "new".to_string(),
        };
        repo.update_balance(&update).await.unwrap();
        assert!(matches!(repo.update_balance(&update).await, Err(Error::Conflict(_))));

        let stored = repo.get_account(a.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.encrypted_balance, "new");
    }

    #[tokio::test]
    async fn test_atomic_commit_applies_nothing_on_conflict() {
        let repo = InMemoryRepository::new();
        let a = account("a@x.com", None);
        let b = account("b@x.com", None);
        repo.insert_account(&a).await.unwrap();
        repo.insert_account(&b).await.unwrap();

        let commit = TransferCommit {
            debit: BalanceUpdate {
                account_id: a.id,
                expected_version: 0,
                encrypted_balance: "a1".to_string(),
            },
            credit: BalanceUpdate {
                account_id: b.id,
                expected_version: 7, // stale
                encrypted_balance: "b1".to_string(),
            },
            record: record(a.id, b.id),
        };
        assert!(matches!(repo.commit_transfer(&commit).await, Err(Error::Conflict(_))));

        let stored = repo.get_account(a.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 0);
        assert!(repo.list_transfers_for(a.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_store_refuses_atomic_commit() {
        let repo = InMemoryRepository::best_effort();
        assert!(!repo.supports_atomic_multi_write());
        let a = Uuid::new_v4();
        let commit = TransferCommit {
            debit: BalanceUpdate {
                account_id: a,
                expected_version: 0,
                encrypted_balance: String::new(),
            },
            credit: BalanceUpdate {
                account_id: Uuid::new_v4(),
                expected_version: 0,
                encrypted_balance: String::new(),
            },
            record: record(a, Uuid::new_v4()),
        };
        assert!(repo.commit_transfer(&commit).await.is_err());
    }

    #[tokio::test]
    async fn test_list_transfers_newest_first_with_insertion_tiebreak() {
        let repo = InMemoryRepository::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let ts = Utc::now();
        let mut first = record(a, b);
        let mut second = record(b, a);
        first.created_at = ts;
        second.created_at = ts;
        repo.append_transfer(&first).await.unwrap();
        repo.append_transfer(&second).await.unwrap();
        repo.append_transfer(&record(Uuid::new_v4(), Uuid::new_v4())).await.unwrap();

        let listed = repo.list_transfers_for(a, 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        assert_eq!(repo.list_transfers_for(a, 1).await.unwrap().len(), 1);
    }
}
