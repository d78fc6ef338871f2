//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod account;
mod codec;
mod contacts;
mod history;
mod lookup;
pub mod migration;
mod transfer;

pub use account::AccountService;
pub use codec::BalanceCodec;
pub use contacts::ContactService;
pub use history::{TransactionLogService, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
pub use lookup::LookupService;
pub use migration::{MigrationResult, MigrationService};
pub use transfer::{TransferOptions, TransferService};
