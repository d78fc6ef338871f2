//! Output formatting utilities

use std::fmt;

use anyhow::{anyhow, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;
use serde::Serialize;
use teller_core::OperationResult;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format a dollar amount with two decimals
pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Failure already written to stdout; `main` exits non-zero without
/// printing it again.
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failure already reported")
    }
}

impl std::error::Error for AlreadyReported {}

/// Print a core result and turn failures into errors.
///
/// With `--json` the `OperationResult` envelope is printed as-is and a
/// failed envelope returns [`AlreadyReported`]. Otherwise `render` draws the
/// success case and failures carry only the caller-safe message.
pub fn emit<T: Serialize>(
    json: bool,
    result: teller_core::Result<T>,
    render: impl FnOnce(&T),
) -> Result<()> {
    if json {
        let envelope = OperationResult::from(result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if !envelope.success {
            return Err(AlreadyReported.into());
        }
        return Ok(());
    }

    match result {
        Ok(data) => {
            render(&data);
            Ok(())
        }
        Err(e) => Err(anyhow!(e.public_message())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_failure_is_marked_reported() {
        let result: teller_core::Result<u32> = Err(teller_core::Error::InsufficientFunds);
        let err = emit(true, result, |_| {}).unwrap_err();
        assert!(err.downcast_ref::<AlreadyReported>().is_some());
    }

    #[test]
    fn test_json_success_is_ok() {
        assert!(emit(true, Ok(7u32), |_| {}).is_ok());
    }

    #[test]
    fn test_text_failure_carries_public_message() {
        let result: teller_core::Result<u32> = Err(teller_core::Error::InsufficientFunds);
        let err = emit(false, result, |_| {}).unwrap_err();
        assert!(err.downcast_ref::<AlreadyReported>().is_none());
        assert_eq!(err.to_string(), teller_core::Error::InsufficientFunds.public_message());
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(74950, 2)), "$749.50");
        assert_eq!(format_money(Decimal::new(5, 0)), "$5.00");
    }
}
