//! Transfer command - move money between two accounts

use anyhow::{bail, Result};
use colored::Colorize;
use teller_core::domain::result::Party;
use teller_core::{Error, TellerContext, TransferReceipt, TransferRequest};

use super::get_context;
use crate::output;

pub async fn run(
    from: String,
    to: Option<String>,
    to_phone: Option<String>,
    amount: f64,
    idempotency_key: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;

    let recipient = match (to, to_phone) {
        (Some(id), _) => Ok(id),
        (None, Some(phone)) => resolve_phone(&ctx, &phone).await,
        (None, None) => bail!("Either --to or --to-phone is required"),
    };

    let result = match recipient {
        Ok(recipient) => {
            let mut request = TransferRequest::new(from, recipient, amount);
            if let Some(key) = idempotency_key {
                request = request.with_idempotency_key(key);
            }
            ctx.transfer_service.transfer(request).await
        }
        Err(e) => Err(e),
    };

    output::emit(json, result, print_receipt)
}

/// Recipient id for a phone number; no match means the recipient is unknown
async fn resolve_phone(ctx: &TellerContext, phone: &str) -> teller_core::Result<String> {
    ctx.lookup_service
        .find_by_phone_number(phone)
        .await?
        .map(|summary| summary.id.to_string())
        .ok_or(Error::NotFound(Party::Recipient))
}

fn print_receipt(receipt: &TransferReceipt) {
    if receipt.replayed {
        output::info("Transfer already completed earlier; nothing was moved again.");
    } else {
        output::success(&format!("Sent {}", output::format_money(receipt.amount)));
    }
    let mut table = output::create_table();
    table.set_header(vec!["", "Account", "Balance"]);
    table.add_row(vec![
        "Sender".to_string(),
        receipt.sender.id.to_string(),
        output::format_money(receipt.sender.balance),
    ]);
    table.add_row(vec![
        "Recipient".to_string(),
        receipt.recipient.id.to_string(),
        output::format_money(receipt.recipient.balance),
    ]);
    println!("{}", table);
    println!("Transfer ID: {}", receipt.transfer_id.to_string().dimmed());
}
