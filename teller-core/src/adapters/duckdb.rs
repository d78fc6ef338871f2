//! DuckDB account store
//!
//! Transfers commit inside a single DuckDB transaction, so this store
//! reports `supports_atomic_multi_write() == true`.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, BalanceUpdate, Cents, Contact, TransferCommit, TransferRecord};
use crate::ports::AccountStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const ACCOUNT_COLUMNS: &str =
    "account_id, name, email, phone_number, encrypted_balance, version, created_at, updated_at";

const TRANSFER_COLUMNS: &str =
    "transfer_id, sender_id, recipient_id, amount_cents, status, created_at, idempotency_key";

const CONTACT_COLUMNS: &str = "contact_id, owner_id, official_name, nicknames, phone_number, \
     bank_name, account_number, relationship, created_at";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Unique/primary-key violations surface as constraint errors
fn is_constraint_violation(err: &duckdb::Error) -> bool {
    let msg = err.to_string();
    msg.contains("Constraint Error") || msg.contains("Duplicate key")
}

/// DuckDB-backed [`AccountStore`]
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file.
    ///
    /// Retries with exponential backoff while another process holds the
    /// file lock.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Private in-memory database, mostly for tests and demos
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory_with_flags(config)?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Autoloaded extensions are never needed and trip code signing on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Path of the backing file, None for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        Ok(MigrationService::new(&conn).run_pending()?)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "applied schema migrations");
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    // === Row helpers ===

    fn query_accounts(conn: &Connection, filter: &str, value: &str) -> Result<Vec<Account>> {
        let sql = format!("SELECT {} FROM accounts WHERE {}", ACCOUNT_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([value], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            let (id, name, email, phone_number, encrypted_balance, version, created, updated) = row?;
            accounts.push(Account {
                id: parse_uuid(&id)?,
                name,
                email,
                phone_number,
                encrypted_balance,
                version,
                created_at: parse_timestamp(&created)?,
                updated_at: parse_timestamp(&updated)?,
            });
        }
        Ok(accounts)
    }

    fn query_transfers(
        conn: &Connection,
        filter: &str,
        params: &[&dyn duckdb::ToSql],
        limit: usize,
    ) -> Result<Vec<TransferRecord>> {
        // seq breaks created_at ties in insertion order
        let sql = format!(
            "SELECT {} FROM transfers WHERE {} ORDER BY created_at DESC, seq DESC LIMIT {}",
            TRANSFER_COLUMNS, filter, limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, sender, recipient, cents, status, created, idempotency_key) = row?;
            records.push(TransferRecord {
                id: parse_uuid(&id)?,
                sender_id: parse_uuid(&sender)?,
                recipient_id: parse_uuid(&recipient)?,
                amount_cents: Cents::new(cents).ok_or_else(|| {
                    Error::database(format!("transfer {} has out-of-range amount {}", id, cents))
                })?,
                status: status.parse()?,
                created_at: parse_timestamp(&created)?,
                idempotency_key,
            });
        }
        Ok(records)
    }

    /// Compare-and-swap one balance; zero rows touched means someone else won
    fn apply_balance_update(conn: &Connection, update: &BalanceUpdate) -> Result<()> {
        let changed = conn.execute(
            "UPDATE accounts
             SET encrypted_balance = ?, version = version + 1, updated_at = ?
             WHERE account_id = ? AND version = ?",
            params![
                update.encrypted_balance,
                format_timestamp(&Utc::now()),
                update.account_id.to_string(),
                update.expected_version,
            ],
        )?;
        if changed != 1 {
            return Err(Error::Conflict(format!(
                "account {} changed since version {}",
                update.account_id, update.expected_version
            )));
        }
        Ok(())
    }

    fn insert_transfer(conn: &Connection, record: &TransferRecord) -> Result<()> {
        conn.execute(
            "INSERT INTO transfers (transfer_id, sender_id, recipient_id, amount_cents, amount,
                                    status, created_at, idempotency_key)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                record.sender_id.to_string(),
                record.recipient_id.to_string(),
                record.amount_cents.get(),
                record.amount().to_string(),
                record.status.as_str(),
                format_timestamp(&record.created_at),
                record.idempotency_key,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                Error::Conflict(format!("transfer {} already logged: {}", record.id, e))
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for DuckDbRepository {
    fn supports_atomic_multi_write(&self) -> bool {
        true
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO accounts (account_id, name, email, email_lower, phone_number,
                                   encrypted_balance, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.name,
                account.email,
                account.email_lower(),
                account.phone_number,
                account.encrypted_balance,
                account.version,
                format_timestamp(&account.created_at),
                format_timestamp(&account.updated_at),
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                Error::Duplicate("An account with this email or phone number already exists.".to_string())
            } else {
                Error::from(e)
            }
        })?;
        Ok(())
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Ok(Self::query_accounts(&conn, "account_id = ?", &id.to_string())?
            .into_iter()
            .next())
    }

    async fn find_account_by_phone(&self, phone_number: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Ok(Self::query_accounts(&conn, "phone_number = ?", phone_number)?
            .into_iter()
            .next())
    }

    async fn find_account_by_email(&self, email_lower: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Ok(Self::query_accounts(&conn, "email_lower = ?", email_lower)?
            .into_iter()
            .next())
    }

    async fn update_balance(&self, update: &BalanceUpdate) -> Result<()> {
        let conn = self.lock()?;
        Self::apply_balance_update(&conn, update)
    }

    async fn append_transfer(&self, record: &TransferRecord) -> Result<()> {
        let conn = self.lock()?;
        Self::insert_transfer(&conn, record)
    }

    async fn commit_transfer(&self, commit: &TransferCommit) -> Result<()> {
        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls everything back
        let tx = conn.transaction()?;
        Self::apply_balance_update(&tx, &commit.debit)?;
        Self::apply_balance_update(&tx, &commit.credit)?;
        Self::insert_transfer(&tx, &commit.record)?;
        tx.commit()?;
        Ok(())
    }

    async fn list_transfers_for(&self, account_id: Uuid, limit: usize) -> Result<Vec<TransferRecord>> {
        let conn = self.lock()?;
        let id = account_id.to_string();
        Self::query_transfers(
            &conn,
            "sender_id = ? OR recipient_id = ?",
            params![id, id],
            limit,
        )
    }

    async fn find_transfer_by_idempotency_key(
        &self,
        sender_id: Uuid,
        key: &str,
    ) -> Result<Option<TransferRecord>> {
        let conn = self.lock()?;
        Ok(Self::query_transfers(
            &conn,
            "sender_id = ? AND idempotency_key = ?",
            params![sender_id.to_string(), key.to_string()],
            1,
        )?
        .into_iter()
        .next())
    }

    async fn insert_contact(&self, contact: &Contact) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO contacts (contact_id, owner_id, official_name, nicknames, phone_number,
                                   bank_name, account_number, relationship, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                contact.id.to_string(),
                contact.owner_id.to_string(),
                contact.official_name,
                serde_json::to_string(&contact.nicknames)?,
                contact.phone_number,
                contact.bank_name,
                contact.account_number,
                contact.relationship,
                format_timestamp(&contact.created_at),
            ],
        )?;
        Ok(())
    }

    async fn list_contacts(&self, owner_id: Uuid) -> Result<Vec<Contact>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM contacts WHERE owner_id = ? ORDER BY created_at, contact_id",
            CONTACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([owner_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut contacts = Vec::new();
        for row in rows {
            let (id, owner, official_name, nicknames, phone_number, bank_name, account_number, relationship, created) =
                row?;
            contacts.push(Contact {
                id: parse_uuid(&id)?,
                owner_id: parse_uuid(&owner)?,
                official_name,
                nicknames: serde_json::from_str(&nicknames)?,
                phone_number,
                bank_name,
                account_number,
                relationship,
                created_at: parse_timestamp(&created)?,
            });
        }
        Ok(contacts)
    }
}

/// Fixed-width RFC 3339 so string order matches time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::database(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::database(format!("bad id '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip_and_order() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(5);
        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert!(a < b);
        assert_eq!(
            parse_timestamp(&a).unwrap().timestamp_micros(),
            earlier.timestamp_micros()
        );
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: Resource temporarily unavailable"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table with name accounts does not exist"));
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(matches!(parse_uuid("nope"), Err(Error::Database(_))));
    }
}
