//! Teller Core - encrypted-balance ledger with atomic transfers
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, TransferRecord, Contact, ...)
//! - **ports**: Trait definitions for external dependencies (AccountStore)
//! - **services**: Business logic orchestration (transfers, lookups, history)
//! - **adapters**: Concrete implementations (DuckDB, in-memory)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, AccountProfile, AccountSummary, Cents, Contact, ContactMatch, NewAccount, NewContact,
    TransactionView, TransferReceipt, TransferRequest,
};
pub use domain::result::{ApiError, Error, OperationResult, Result};
pub use ports::AccountStore;

/// File name of the ledger database inside the data directory
pub const DB_FILENAME: &str = "teller.duckdb";

/// Main context for Teller operations
///
/// This is the primary entry point for all business logic. It holds
/// the account store, configuration, and all services.
pub struct TellerContext {
    pub config: Config,
    pub store: Arc<dyn AccountStore>,
    pub account_service: AccountService,
    pub transfer_service: TransferService,
    pub transaction_log: TransactionLogService,
    pub lookup_service: LookupService,
    pub contact_service: ContactService,
}

impl TellerContext {
    /// Open the DuckDB ledger in `data_dir`, creating it if needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let repository = DuckDbRepository::new(&data_dir.join(DB_FILENAME))?;
        repository.ensure_schema()?;

        Self::with_store(Arc::new(repository), config)
    }

    /// Wire all services over an existing store
    pub fn with_store(store: Arc<dyn AccountStore>, config: Config) -> Result<Self> {
        let codec = Arc::new(BalanceCodec::new(&config.encryption_secret));
        let starting_balance = config.starting_balance_cents()?;

        let account_service =
            AccountService::new(Arc::clone(&store), Arc::clone(&codec), starting_balance);
        let transfer_service = TransferService::new(
            Arc::clone(&store),
            Arc::clone(&codec),
            TransferOptions::from_config(&config),
        )?;
        let transaction_log = TransactionLogService::new(Arc::clone(&store));
        let lookup_service = LookupService::new(Arc::clone(&store));
        let contact_service = ContactService::new(Arc::clone(&store));

        Ok(Self {
            config,
            store,
            account_service,
            transfer_service,
            transaction_log,
            lookup_service,
            contact_service,
        })
    }
}
