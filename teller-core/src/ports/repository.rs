//! Account store port - persistence abstraction for the ledger

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, BalanceUpdate, Contact, TransferCommit, TransferRecord};

/// Persistence for accounts, the transfer log and contact books
///
/// Balance writes are compare-and-swap: an update whose `expected_version`
/// no longer matches the stored account fails with `Error::Conflict` and
/// changes nothing.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Whether [`AccountStore::commit_transfer`] is all-or-nothing.
    ///
    /// When false the transfer engine falls back to issuing the three writes
    /// one at a time, and a failure part-way leaves a half-applied transfer.
    fn supports_atomic_multi_write(&self) -> bool;

    // === Accounts ===

    /// Insert a new account. Email and phone number must be unique.
    async fn insert_account(&self, account: &Account) -> Result<()>;

    /// Get account by ID
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>>;

    /// Get account by normalized phone number
    async fn find_account_by_phone(&self, phone_number: &str) -> Result<Option<Account>>;

    /// Get account by lowercased email
    async fn find_account_by_email(&self, email_lower: &str) -> Result<Option<Account>>;

    /// Apply one compare-and-swap balance write
    async fn update_balance(&self, update: &BalanceUpdate) -> Result<()>;

    // === Transfer log ===

    /// Append one record. Fails with `Conflict` on a duplicate
    /// `(sender_id, idempotency_key)`.
    async fn append_transfer(&self, record: &TransferRecord) -> Result<()>;

    /// Debit, credit and log append as one unit.
    ///
    /// Only called when `supports_atomic_multi_write()` is true.
    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<()>;

    /// Records where the account is sender or recipient, newest first
    async fn list_transfers_for(&self, account_id: Uuid, limit: usize) -> Result<Vec<TransferRecord>>;

    /// Earlier transfer by the same sender with this idempotency key
    async fn find_transfer_by_idempotency_key(
        &self,
        sender_id: Uuid,
        key: &str,
    ) -> Result<Option<TransferRecord>>;

    // === Contacts ===

    /// Add a contact to its owner's book
    async fn insert_contact(&self, contact: &Contact) -> Result<()>;

    /// All contacts owned by `owner_id`, oldest first
    async fn list_contacts(&self, owner_id: Uuid) -> Result<Vec<Contact>>;
}
