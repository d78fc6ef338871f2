//! Profile command - show an account and its current balance

use anyhow::Result;
use colored::Colorize;

use super::{get_context, parse_account_id};
use crate::output;

pub async fn run(account_id: &str, json: bool) -> Result<()> {
    let id = parse_account_id(account_id)?;
    let ctx = get_context()?;
    let result = ctx.account_service.get_profile(id).await;

    output::emit(json, result, |profile| {
        let mut table = output::create_table();
        table.add_row(vec!["ID", &profile.id.to_string()]);
        table.add_row(vec!["Name", &profile.name]);
        table.add_row(vec!["Email", &profile.email]);
        table.add_row(vec!["Phone", profile.phone_number.as_deref().unwrap_or("-")]);
        println!("{}", table);
        println!("Balance: {}", output::format_money(profile.balance).bold());
    })
}
