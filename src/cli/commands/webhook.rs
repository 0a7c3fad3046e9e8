//! Messaging webhook commands.

use super::{open_database, print_json, runtime};
use crate::ai::HttpAnalyzer;
use crate::cli::WebhookCommands;
use crate::config::MessagingConfig;
use crate::error::Result;
use crate::webhook::{handle_inbound, verify_subscription, HttpMessenger, WebhookOutcome};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Execute webhook commands.
pub fn execute(command: &WebhookCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        WebhookCommands::Verify {
            mode,
            token,
            challenge,
        } => {
            let config = MessagingConfig::resolve()?;
            let answer = verify_subscription(
                mode.as_deref(),
                token.as_deref(),
                challenge.as_deref(),
                config.require_verify_token()?,
            )?;
            if json {
                return print_json(&serde_json::json!({ "challenge": answer }));
            }
            // The challenge is echoed verbatim to the platform.
            if let Some(challenge) = answer {
                println!("{challenge}");
            }
            Ok(())
        }
        WebhookCommands::Ingest { payload } => ingest(payload, db_path, json),
    }
}

fn ingest(payload: &Path, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let raw = if payload == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(payload)?
    };
    let payload: serde_json::Value = serde_json::from_str(&raw)?;

    let mut db = open_database(db_path)?;
    let analyzer = HttpAnalyzer::from_env()?;
    let messenger = HttpMessenger::new(MessagingConfig::resolve()?);

    let rt = runtime()?;
    let outcome = rt.block_on(handle_inbound(&mut db, &analyzer, &messenger, &payload));

    if json {
        return print_json(&outcome);
    }

    match &outcome {
        WebhookOutcome::Ignored => println!("No message in payload."),
        WebhookOutcome::UnknownSender { from } => {
            println!("{} {}", "Unknown sender:".yellow(), from);
        }
        WebhookOutcome::Instructed { from } => println!("Sent instructions to {from}"),
        WebhookOutcome::Recorded {
            from,
            transaction_id,
            amount,
            category,
            ..
        } => println!(
            "Recorded {} from {} (R$ {:.2}, {})",
            transaction_id.cyan(),
            from,
            amount,
            category
        ),
        WebhookOutcome::Failed { from, reason } => {
            println!("{} {} ({})", "Failed for".red(), from, reason);
        }
    }
    Ok(())
}
