//! Transfer service - moves money between two accounts
//!
//! Every transfer reads both accounts, checks funds in integer cents, and
//! writes both balances plus one log record as a single unit. Balance writes
//! are compare-and-swap on the account version; a lost race is retried from
//! the top with exponential backoff so the funds check always sees the
//! committed balance.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::result::{CommitStep, Error, Party, Result};
use crate::domain::{
    Account, BalanceUpdate, Cents, PartyBalance, TransferCommit, TransferReceipt, TransferRecord,
    TransferRequest, ValidatedTransfer,
};
use crate::ports::AccountStore;
use crate::services::BalanceCodec;

/// Initial delay before retrying a conflicted transfer
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);

/// Engine tuning
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Retries after a version conflict before giving up
    pub max_conflict_retries: u32,
    pub initial_backoff: Duration,
    /// Accept stores without atomic multi-write
    pub allow_best_effort_commit: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_conflict_retries: 5,
            initial_backoff: INITIAL_BACKOFF,
            allow_best_effort_commit: false,
        }
    }
}

impl TransferOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_conflict_retries: config.max_conflict_retries,
            allow_best_effort_commit: config.allow_best_effort_commit,
            ..Self::default()
        }
    }
}

/// Transfer engine
pub struct TransferService {
    store: Arc<dyn AccountStore>,
    codec: Arc<BalanceCodec>,
    options: TransferOptions,
}

impl TransferService {
    /// Build the engine over `store`.
    ///
    /// A store without atomic multi-write is refused unless
    /// `allow_best_effort_commit` is set.
    pub fn new(
        store: Arc<dyn AccountStore>,
        codec: Arc<BalanceCodec>,
        options: TransferOptions,
    ) -> Result<Self> {
        if !store.supports_atomic_multi_write() {
            if !options.allow_best_effort_commit {
                return Err(Error::Config(
                    "account store does not support atomic multi-write; \
                     set allowBestEffortCommit to accept best-effort transfers"
                        .to_string(),
                ));
            }
            warn!("account store has no atomic multi-write; double-spend protection is best-effort");
        }
        Ok(Self {
            store,
            codec,
            options,
        })
    }

    /// Move `request.amount` dollars from sender to recipient.
    ///
    /// Validation runs before any store access. Integrity faults are logged
    /// here in full; callers only see [`Error::public_message`].
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferReceipt> {
        let transfer = request.validate()?;
        let result = self.execute(&transfer).await;

        if let Err(e) = &result {
            match e {
                Error::CommitFailure { applied, reason } if !applied.is_empty() => error!(
                    alert = "ledger_inconsistency",
                    sender = %transfer.sender_id,
                    recipient = %transfer.recipient_id,
                    amount_cents = transfer.amount.get(),
                    applied = ?applied,
                    reason = %reason,
                    "transfer partially applied"
                ),
                e if e.is_integrity_fault() => error!(
                    sender = %transfer.sender_id,
                    recipient = %transfer.recipient_id,
                    error = %e,
                    "transfer aborted"
                ),
                _ => {}
            }
        }
        result
    }

    async fn execute(&self, transfer: &ValidatedTransfer) -> Result<TransferReceipt> {
        let mut delay = self.options.initial_backoff;
        let mut conflicts = 0u32;

        loop {
            if let Some(key) = &transfer.idempotency_key {
                if let Some(existing) = self
                    .store
                    .find_transfer_by_idempotency_key(transfer.sender_id, key)
                    .await?
                {
                    return self.replay(transfer, &existing).await;
                }
            }

            match self.attempt(transfer).await {
                Err(Error::Conflict(reason)) => {
                    conflicts += 1;
                    if conflicts > self.options.max_conflict_retries {
                        return Err(Error::CommitFailure {
                            applied: Vec::new(),
                            reason: format!(
                                "gave up after {} conflicting attempts: {}",
                                conflicts, reason
                            ),
                        });
                    }
                    warn!(
                        sender = %transfer.sender_id,
                        attempt = conflicts,
                        delay_ms = delay.as_millis() as u64,
                        "transfer conflicted, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                other => return other,
            }
        }
    }

    /// One read-check-commit cycle
    async fn attempt(&self, transfer: &ValidatedTransfer) -> Result<TransferReceipt> {
        let sender = self.load(transfer.sender_id, Party::Sender).await?;
        let recipient = self.load(transfer.recipient_id, Party::Recipient).await?;

        let sender_balance = self.codec.decrypt_for(&sender)?;
        let recipient_balance = self.codec.decrypt_for(&recipient)?;

        let new_sender_balance = sender_balance
            .checked_sub(transfer.amount)
            .ok_or(Error::InsufficientFunds)?;
        let new_recipient_balance = recipient_balance
            .checked_add(transfer.amount)
            .ok_or_else(|| {
                Error::InvalidAmount("Amount would exceed the recipient's maximum balance.".to_string())
            })?;

        let commit = TransferCommit {
            debit: BalanceUpdate {
                account_id: sender.id,
                expected_version: sender.version,
                encrypted_balance: self.codec.encrypt(new_sender_balance)?,
            },
            credit: BalanceUpdate {
                account_id: recipient.id,
                expected_version: recipient.version,
                encrypted_balance: self.codec.encrypt(new_recipient_balance)?,
            },
            record: TransferRecord::completed(transfer),
        };

        if self.store.supports_atomic_multi_write() {
            self.store
                .commit_transfer(&commit)
                .await
                .map_err(nothing_applied)?;
        } else {
            self.commit_sequentially(&commit).await?;
        }

        info!(
            transfer_id = %commit.record.id,
            sender = %sender.id,
            recipient = %recipient.id,
            amount_cents = transfer.amount.get(),
            "transfer completed"
        );

        Ok(TransferReceipt {
            transfer_id: commit.record.id,
            amount: transfer.amount.to_decimal(),
            sender: balance_of(&sender, new_sender_balance),
            recipient: balance_of(&recipient, new_recipient_balance),
            replayed: false,
        })
    }

    /// Fallback for stores without multi-write transactions.
    ///
    /// Order is fixed: sender debit, recipient credit, log append. A conflict
    /// on the first write is retryable since nothing landed; any other failure
    /// is a `CommitFailure` naming the steps that did land.
    async fn commit_sequentially(&self, commit: &TransferCommit) -> Result<()> {
        self.store
            .update_balance(&commit.debit)
            .await
            .map_err(nothing_applied)?;

        let mut applied = vec![CommitStep::SenderDebit];
        if let Err(e) = self.store.update_balance(&commit.credit).await {
            return Err(Error::CommitFailure {
                applied,
                reason: e.to_string(),
            });
        }

        applied.push(CommitStep::RecipientCredit);
        if let Err(e) = self.store.append_transfer(&commit.record).await {
            return Err(Error::CommitFailure {
                applied,
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    /// Receipt for a transfer that already completed under the same key.
    /// Performs no writes.
    async fn replay(
        &self,
        transfer: &ValidatedTransfer,
        existing: &TransferRecord,
    ) -> Result<TransferReceipt> {
        if existing.recipient_id != transfer.recipient_id || existing.amount_cents != transfer.amount {
            return Err(Error::InvalidRequest(
                "idempotencyKey was already used for a different transfer.".to_string(),
            ));
        }

        let sender = self.load(existing.sender_id, Party::Sender).await?;
        let recipient = self.load(existing.recipient_id, Party::Recipient).await?;
        let sender_balance = self.codec.decrypt_for(&sender)?;
        let recipient_balance = self.codec.decrypt_for(&recipient)?;

        info!(transfer_id = %existing.id, sender = %sender.id, "transfer replayed");

        Ok(TransferReceipt {
            transfer_id: existing.id,
            amount: existing.amount(),
            sender: balance_of(&sender, sender_balance),
            recipient: balance_of(&recipient, recipient_balance),
            replayed: true,
        })
    }

    async fn load(&self, id: uuid::Uuid, party: Party) -> Result<Account> {
        self.store.get_account(id).await?.ok_or(Error::NotFound(party))
    }
}

/// A commit that failed before any write landed. Conflicts stay retryable.
fn nothing_applied(e: Error) -> Error {
    match e {
        Error::Conflict(_) => e,
        other => Error::CommitFailure {
            applied: Vec::new(),
            reason: other.to_string(),
        },
    }
}

fn balance_of(account: &Account, balance: Cents) -> PartyBalance {
    PartyBalance {
        id: account.id,
        balance: balance.to_decimal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRepository;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    async fn seed(store: &InMemoryRepository, codec: &BalanceCodec, email: &str, cents: i64) -> Uuid {
        let id = Uuid::new_v4();
        let encrypted = codec.encrypt(Cents::new(cents).unwrap()).unwrap();
        store
            .insert_account(&Account::new(id, email, email, encrypted))
            .await
            .unwrap();
        id
    }

    #[test]
    fn test_store_errors_before_any_write_become_commit_failures() {
        let err = nothing_applied(Error::database("disk I/O error"));
        match err {
            Error::CommitFailure { applied, reason } => {
                assert!(applied.is_empty());
                assert!(reason.contains("disk I/O error"));
            }
            other => panic!("expected commit failure, got {:?}", other),
        }

        let conflict = nothing_applied(Error::Conflict("version moved".to_string()));
        assert!(matches!(conflict, Error::Conflict(_)));
    }

    #[test]
    fn test_best_effort_store_requires_opt_in() {
        let codec = Arc::new(BalanceCodec::new("k"));
        let refused = TransferService::new(
            Arc::new(InMemoryRepository::best_effort()),
            Arc::clone(&codec),
            TransferOptions::default(),
        );
        assert!(matches!(refused, Err(Error::Config(_))));

        let options = TransferOptions {
            allow_best_effort_commit: true,
            ..TransferOptions::default()
        };
        assert!(TransferService::new(Arc::new(InMemoryRepository::best_effort()), codec, options).is_ok());
    }

    #[tokio::test]
    async fn test_transfer_moves_exact_cents() {
        let store = Arc::new(InMemoryRepository::new());
        let codec = Arc::new(BalanceCodec::new("k"));
        let a = seed(&store, &codec, "a@x.com", 100_000).await;
        let b = seed(&store, &codec, "b@x.com", 100_000).await;

        let service = TransferService::new(store.clone(), codec, TransferOptions::default()).unwrap();
        let receipt = service
            .transfer(TransferRequest::new(a.to_string(), b.to_string(), 250.50))
            .await
            .unwrap();

        assert_eq!(receipt.sender.balance, Decimal::new(74950, 2));
        assert_eq!(receipt.recipient.balance, Decimal::new(125050, 2));
        assert!(!receipt.replayed);
        assert_eq!(store.list_transfers_for(a, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_recipient_overflow_is_rejected_without_writes() {
        let store = Arc::new(InMemoryRepository::new());
        let codec = Arc::new(BalanceCodec::new("k"));
        let a = seed(&store, &codec, "a@x.com", 100).await;
        let b = seed(&store, &codec, "b@x.com", crate::domain::MAX_CENTS).await;

        let service = TransferService::new(store.clone(), codec, TransferOptions::default()).unwrap();
        let result = service
            .transfer(TransferRequest::new(a.to_string(), b.to_string(), 1.0))
            .await;

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        assert!(store.list_transfers_for(a, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reused_key_with_different_amount_is_rejected() {
        let store = Arc::new(InMemoryRepository::new());
        let codec = Arc::new(BalanceCodec::new("k"));
        let a = seed(&store, &codec, "a@x.com", 100_000).await;
        let b = seed(&store, &codec, "b@x.com", 0).await;

        let service = TransferService::new(store.clone(), codec, TransferOptions::default()).unwrap();
        service
            .transfer(TransferRequest::new(a.to_string(), b.to_string(), 10.0).with_idempotency_key("k1"))
            .await
            .unwrap();
        let second = service
            .transfer(TransferRequest::new(a.to_string(), b.to_string(), 20.0).with_idempotency_key("k1"))
            .await;

        assert!(matches!(second, Err(Error::InvalidRequest(_))));
        assert_eq!(store.list_transfers_for(a, 10).await.unwrap().len(), 1);
    }
}
