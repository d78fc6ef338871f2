//! History command - recent transfers for one account

use anyhow::Result;
use colored::Colorize;
use teller_core::domain::Direction;

use super::{get_context, parse_account_id};
use crate::output;

pub async fn run(account_id: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let id = parse_account_id(account_id)?;
    let ctx = get_context()?;
    let result = ctx.transaction_log.list_for(id, limit).await;

    output::emit(json, result, |views| {
        if views.is_empty() {
            output::info("No transfers yet.");
            return;
        }

        let mut table = output::create_table();
        table.set_header(vec!["Date", "Type", "Counterpart", "Amount", "Status"]);
        for view in views {
            let amount = match view.direction {
                Direction::Sent => format!("-{}", output::format_money(view.amount)).red(),
                Direction::Received => format!("+{}", output::format_money(view.amount)).green(),
            };
            let direction = match view.direction {
                Direction::Sent => "sent",
                Direction::Received => "received",
            };
            table.add_row(vec![
                view.created_at.format("%Y-%m-%d %H:%M").to_string(),
                direction.to_string(),
                view.counterpart_name.clone(),
                amount.to_string(),
                view.status.to_string(),
            ]);
        }
        println!("{}", table);
    })
}
