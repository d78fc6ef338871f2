//! Lookup command - find an account by phone number

use anyhow::Result;

use super::get_context;
use crate::output;

pub async fn run(phone: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.lookup_service.find_by_phone_number(phone).await;

    output::emit(json, result, |found| match found {
        Some(summary) => {
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Name", "Phone"]);
            table.add_row(vec![
                summary.id.to_string(),
                summary.name.clone(),
                summary.phone_number.clone().unwrap_or_default(),
            ]);
            println!("{}", table);
        }
        None => output::info("No account found for that phone number."),
    })
}
