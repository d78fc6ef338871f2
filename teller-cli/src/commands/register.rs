//! Register command - open a new account

use anyhow::Result;
use colored::Colorize;
use teller_core::NewAccount;

use super::get_context;
use crate::output;

pub async fn run(name: String, email: String, phone: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx
        .account_service
        .register_account(NewAccount {
            name,
            email,
            phone_number: phone,
        })
        .await;

    output::emit(json, result, |id| {
        output::success("Account registered");
        println!("  ID:      {}", id.to_string().bold());
        println!(
            "  Balance: {}",
            output::format_money(ctx.config.starting_balance)
        );
    })
}
