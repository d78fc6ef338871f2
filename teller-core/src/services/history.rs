//! Transaction log queries

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Direction, TransactionView};
use crate::ports::AccountStore;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 50;

/// Name shown when the other party's account no longer resolves
const UNKNOWN_NAME: &str = "Unknown";

/// Reads the append-only transfer log on behalf of one user
pub struct TransactionLogService {
    store: Arc<dyn AccountStore>,
}

impl TransactionLogService {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Transfers the user sent or received, newest first.
    ///
    /// `limit` defaults to 10 and is clamped to `1..=50`.
    pub async fn list_for(&self, user_id: Uuid, limit: Option<usize>) -> Result<Vec<TransactionView>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let records = self.store.list_transfers_for(user_id, limit).await?;

        let mut names: HashMap<Uuid, String> = HashMap::new();
        for id in records.iter().flat_map(|r| [r.sender_id, r.recipient_id]) {
            if names.contains_key(&id) {
                continue;
            }
            let name = self
                .store
                .get_account(id)
                .await?
                .map(|a| a.name)
                .unwrap_or_else(|| UNKNOWN_NAME.to_string());
            names.insert(id, name);
        }
        let name_of = |id: &Uuid| {
            names
                .get(id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_NAME.to_string())
        };

        Ok(records
            .into_iter()
            .filter_map(|record| {
                let direction = record.direction_for(user_id)?;
                let sender_name = name_of(&record.sender_id);
                let recipient_name = name_of(&record.recipient_id);
                let counterpart_name = match direction {
                    Direction::Sent => recipient_name.clone(),
                    Direction::Received => sender_name.clone(),
                };
                Some(TransactionView {
                    id: record.id,
                    amount: record.amount(),
                    direction,
                    counterpart_name,
                    sender_name,
                    recipient_name,
                    sender_id: record.sender_id,
                    recipient_id: record.recipient_id,
                    created_at: record.created_at,
                    status: record.status,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRepository;
    use crate::domain::{Account, Cents, TransferRecord, TransferStatus};
    use chrono::{Duration, Utc};

    fn record(sender: Uuid, recipient: Uuid, cents: i64, age_secs: i64) -> TransferRecord {
        TransferRecord {
            id: Uuid::new_v4(),
            sender_id: sender,
            recipient_id: recipient,
            amount_cents: Cents::new(cents).unwrap(),
            status: TransferStatus::Completed,
            created_at: Utc::now() - Duration::seconds(age_secs),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn test_views_carry_direction_and_names() {
        let store = Arc::new(InMemoryRepository::new());
        let alice = Account::new(Uuid::new_v4(), "Alice", "a@x.com", "x");
        let bob = Account::new(Uuid::new_v4(), "Bob", "b@x.com", "x");
        store.insert_account(&alice).await.unwrap();
        store.insert_account(&bob).await.unwrap();
        let ghost = Uuid::new_v4();

        store.append_transfer(&record(alice.id, bob.id, 25050, 30)).await.unwrap();
        store.append_transfer(&record(bob.id, alice.id, 100, 20)).await.unwrap();
        store.append_transfer(&record(ghost, alice.id, 5, 10)).await.unwrap();

        let service = TransactionLogService::new(store);
        let views = service.list_for(alice.id, None).await.unwrap();
        assert_eq!(views.len(), 3);

        assert_eq!(views[0].direction, Direction::Received);
        assert_eq!(views[0].counterpart_name, "Unknown");

        assert_eq!(views[1].direction, Direction::Received);
        assert_eq!(views[1].counterpart_name, "Bob");

        assert_eq!(views[2].direction, Direction::Sent);
        assert_eq!(views[2].counterpart_name, "Bob");
        assert_eq!(views[2].sender_name, "Alice");
        assert_eq!(views[2].amount.to_string(), "250.50");
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let store = Arc::new(InMemoryRepository::new());
        let user = Uuid::new_v4();
        for i in 0..60 {
            store.append_transfer(&record(user, Uuid::new_v4(), 1, i)).await.unwrap();
        }
        let service = TransactionLogService::new(store);

        assert_eq!(service.list_for(user, None).await.unwrap().len(), 10);
        assert_eq!(service.list_for(user, Some(0)).await.unwrap().len(), 1);
        assert_eq!(service.list_for(user, Some(500)).await.unwrap().len(), 50);
    }
}
