//! CLI command implementations

pub mod contacts;
pub mod history;
pub mod lookup;
pub mod profile;
pub mod register;
pub mod transfer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use teller_core::TellerContext;
use tracing::debug;
use uuid::Uuid;

/// Get the teller directory from environment or default
pub fn get_teller_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TELLER_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(dirs::home_dir()
        .context("Could not find home directory")?
        .join(".teller"))
}

/// Open the ledger in the teller directory
pub fn get_context() -> Result<TellerContext> {
    let teller_dir = get_teller_dir()?;
    debug!(dir = ?teller_dir, "opening ledger");
    TellerContext::new(&teller_dir)
        .with_context(|| format!("Failed to open ledger in {:?}", teller_dir))
}

/// Parse an account id argument
pub fn parse_account_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid account id: {}", raw))
}
