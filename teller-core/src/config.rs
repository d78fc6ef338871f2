//! Configuration management
//!
//! Read from `<data_dir>/settings.json`:
//! ```json
//! {
//!   "ledger": {
//!     "encryptionSecret": "...",
//!     "startingBalance": "1000.00",
//!     "maxConflictRetries": 5,
//!     "allowBestEffortCommit": false
//!   }
//! }
//! ```
//! Environment variables override the file. Sections other than `ledger`
//! are ignored.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::domain::result::{Error, Result};
use crate::domain::Cents;

pub const SETTINGS_FILE: &str = "settings.json";

pub const ENV_ENCRYPTION_SECRET: &str = "TELLER_ENCRYPTION_SECRET";
pub const ENV_STARTING_BALANCE: &str = "TELLER_STARTING_BALANCE";
pub const ENV_ALLOW_BEST_EFFORT_COMMIT: &str = "TELLER_ALLOW_BEST_EFFORT_COMMIT";

/// Used only when `allowInsecureDefaultSecret` is set, for demos
const INSECURE_DEFAULT_SECRET: &str = "teller-insecure-default-secret";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    ledger: LedgerSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default)]
    encryption_secret: Option<String>,
    #[serde(default)]
    starting_balance: Option<Decimal>,
    #[serde(default)]
    max_conflict_retries: Option<u32>,
    #[serde(default)]
    allow_best_effort_commit: bool,
    #[serde(default)]
    allow_insecure_default_secret: bool,
}

/// Teller configuration
#[derive(Clone)]
pub struct Config {
    /// Secret the balance key is derived from
    pub encryption_secret: String,
    /// Balance credited to newly registered accounts, in dollars
    pub starting_balance: Decimal,
    pub max_conflict_retries: u32,
    pub allow_best_effort_commit: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("encryption_secret", &"<redacted>")
            .field("starting_balance", &self.starting_balance)
            .field("max_conflict_retries", &self.max_conflict_retries)
            .field("allow_best_effort_commit", &self.allow_best_effort_commit)
            .finish()
    }
}

impl Config {
    /// Defaults with an explicit secret
    pub fn new(encryption_secret: impl Into<String>) -> Self {
        Self {
            encryption_secret: encryption_secret.into(),
            starting_balance: Decimal::new(100000, 2),
            max_conflict_retries: 5,
            allow_best_effort_commit: false,
        }
    }

    /// Load config from the data directory, applying environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("invalid {}: {}", SETTINGS_FILE, e)))?
        } else {
            SettingsFile::default()
        };

        Self::resolve(raw.ledger, |name| std::env::var(name).ok())
    }

    fn resolve(ledger: LedgerSettings, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = env(ENV_ENCRYPTION_SECRET)
            .or(ledger.encryption_secret)
            .filter(|s| !s.is_empty());
        let encryption_secret = match secret {
            Some(secret) => secret,
            None if ledger.allow_insecure_default_secret => {
                warn!("no encryption secret configured; using the insecure default");
                INSECURE_DEFAULT_SECRET.to_string()
            }
            None => {
                return Err(Error::Config(format!(
                    "{} is not set and settings.json has no ledger.encryptionSecret",
                    ENV_ENCRYPTION_SECRET
                )))
            }
        };

        let defaults = Self::new(String::new());

        let starting_balance = match env(ENV_STARTING_BALANCE) {
            Some(value) => Decimal::from_str(value.trim()).map_err(|e| {
                Error::Config(format!("{} is not a decimal: {}", ENV_STARTING_BALANCE, e))
            })?,
            None => ledger.starting_balance.unwrap_or(defaults.starting_balance),
        };

        // Env var overrides the file
        let allow_best_effort_commit = match env(ENV_ALLOW_BEST_EFFORT_COMMIT).as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => ledger.allow_best_effort_commit,
        };

        let config = Self {
            encryption_secret,
            starting_balance,
            max_conflict_retries: ledger
                .max_conflict_retries
                .unwrap_or(defaults.max_conflict_retries),
            allow_best_effort_commit,
        };
        config.starting_balance_cents()?;
        Ok(config)
    }

    /// Starting balance as exact cents
    pub fn starting_balance_cents(&self) -> Result<Cents> {
        Cents::from_str(&self.starting_balance.to_string()).map_err(|e| {
            Error::Config(format!(
                "starting balance {} is not a valid amount: {}",
                self.starting_balance, e
            ))
        })
    }
}
