//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
mod contact;
pub mod money;
pub mod result;
mod transfer;

pub use account::{Account, AccountProfile, AccountSummary, NewAccount, PHONE_DIGITS};
pub use contact::{Contact, ContactMatch, NewContact, DEFAULT_BANK_NAME};
pub use money::{Cents, MAX_CENTS};
pub use transfer::{
    BalanceUpdate, Direction, PartyBalance, TransactionView, TransferCommit, TransferReceipt,
    TransferRecord, TransferRequest, TransferStatus, ValidatedTransfer, MAX_IDEMPOTENCY_KEY_LEN,
};
