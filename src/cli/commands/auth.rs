//! Auth command implementations.

use super::{open_database, print_json, require_session};
use crate::auth::{AuthState, Identity, Session};
use crate::cli::AuthCommands;
use crate::error::{Error, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct SessionOutput<'a> {
    state: AuthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<&'a Identity>,
}

#[derive(Serialize)]
struct DeleteAccountOutput {
    removed: Vec<TableCount>,
    total: usize,
}

#[derive(Serialize)]
struct TableCount {
    table: String,
    count: usize,
}

/// Execute auth commands.
pub fn execute(command: &AuthCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        AuthCommands::SignUp { email, password } => {
            let mut db = open_database(db_path)?;
            let session = db.sign_up(email, password)?;
            print_session(&session, "Signed up", json)
        }
        AuthCommands::SignIn { email, password } => {
            let mut db = open_database(db_path)?;
            let session = db.sign_in(email, password)?;
            print_session(&session, "Signed in", json)
        }
        AuthCommands::SignOut => {
            let mut db = open_database(db_path)?;
            db.sign_out()?;
            print_session(&Session::anonymous(), "Signed out", json)
        }
        AuthCommands::Status => {
            let db = open_database(db_path)?;
            let session = db.session()?;
            print_session(&session, "Session", json)
        }
        AuthCommands::ResetPassword { email } => {
            let db = open_database(db_path)?;
            db.reset_password_for_email(email)?;
            if json {
                print_json(&serde_json::json!({ "email": email, "requested": true }))
            } else {
                println!("Password reset requested for {email}");
                Ok(())
            }
        }
        AuthCommands::DeleteAccount { yes } => delete_account(*yes, db_path, json),
    }
}

fn print_session(session: &Session, label: &str, json: bool) -> Result<()> {
    if json {
        return print_json(&SessionOutput {
            state: session.state(),
            identity: session.identity(),
        });
    }

    match session.identity() {
        Some(identity) => println!(
            "{}: {} ({})",
            label,
            identity.email.cyan(),
            identity.id.dimmed()
        ),
        None if label == "Session" => println!("{}: {}", label, "signed out".yellow()),
        None => println!("{label}"),
    }
    Ok(())
}

fn delete_account(yes: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    if !yes {
        return Err(Error::InvalidArgument(
            "account deletion removes every record you own; pass --yes to confirm".into(),
        ));
    }

    let mut db = open_database(db_path)?;
    let session = require_session(&db)?;
    let deletion = db.delete_account(&session)?;

    if json {
        let total = deletion.total();
        return print_json(&DeleteAccountOutput {
            removed: deletion
                .removed
                .into_iter()
                .map(|(table, count)| TableCount { table, count })
                .collect(),
            total,
        });
    }

    for (table, count) in &deletion.removed {
        println!("  {table:<14} {count}");
    }
    println!("{} {} records removed", "Account deleted.".red().bold(), deletion.total());
    Ok(())
}
