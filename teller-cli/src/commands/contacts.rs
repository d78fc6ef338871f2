//! Contacts command - manage saved recipients

use anyhow::Result;
use clap::Subcommand;
use teller_core::NewContact;

use super::{get_context, parse_account_id};
use crate::output;

#[derive(Subcommand)]
pub enum ContactCommands {
    /// Save a contact
    Add {
        /// Owner account ID
        owner: String,
        /// Contact's official name
        #[arg(long)]
        name: String,
        /// Nickname to resolve this contact by (repeatable)
        #[arg(long = "nickname", required = true)]
        nicknames: Vec<String>,
        /// Bank account number
        #[arg(long)]
        account: String,
        /// Bank name (default DBS)
        #[arg(long)]
        bank: Option<String>,
        /// Phone number
        #[arg(long)]
        phone: Option<String>,
        /// Relationship, e.g. "mother"
        #[arg(long)]
        relationship: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved contacts
    List {
        /// Owner account ID
        owner: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a nickname to a saved contact
    Resolve {
        /// Owner account ID
        owner: String,
        /// Nickname to look up
        nickname: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: ContactCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ContactCommands::Add {
            owner,
            name,
            nicknames,
            account,
            bank,
            phone,
            relationship,
            json,
        } => {
            let owner = parse_account_id(&owner)?;
            let result = ctx
                .contact_service
                .add_contact(
                    owner,
                    NewContact {
                        official_name: name,
                        nicknames,
                        phone_number: phone,
                        bank_name: bank,
                        account_number: account,
                        relationship,
                    },
                )
                .await;
            output::emit(json, result, |contact| {
                output::success(&format!(
                    "Saved {} as {}",
                    contact.official_name,
                    contact.nicknames.join(", ")
                ));
            })
        }
        ContactCommands::List { owner, json } => {
            let owner = parse_account_id(&owner)?;
            let result = ctx.contact_service.list_contacts(owner).await;
            output::emit(json, result, |contacts| {
                if contacts.is_empty() {
                    output::info("No saved contacts.");
                    return;
                }
                let mut table = output::create_table();
                table.set_header(vec!["Name", "Nicknames", "Bank", "Account", "Phone"]);
                for c in contacts {
                    table.add_row(vec![
                        c.official_name.clone(),
                        c.nicknames.join(", "),
                        c.bank_name.clone(),
                        c.account_number.clone(),
                        c.phone_number.clone().unwrap_or_default(),
                    ]);
                }
                println!("{}", table);
            })
        }
        ContactCommands::Resolve { owner, nickname, json } => {
            let owner = parse_account_id(&owner)?;
            let result = ctx.lookup_service.resolve_contact(owner, &nickname).await;
            output::emit(json, result, |found| match found {
                Some(m) => {
                    let mut table = output::create_table();
                    table.add_row(vec!["Name", &m.name]);
                    table.add_row(vec!["Bank", &m.bank]);
                    table.add_row(vec!["Account", &m.account]);
                    table.add_row(vec!["Phone", m.phone_number.as_deref().unwrap_or("-")]);
                    table.add_row(vec!["Relationship", m.relationship.as_deref().unwrap_or("-")]);
                    println!("{}", table);
                }
                None => output::info(&format!("No contact called \"{}\".", nickname)),
            })
        }
    }
}
