//! AI collaborator commands.

use super::{brl, invested_base, open_database, print_json, require_session, runtime, transactions};
use crate::ai::{recommend, tip_or_fallback, Analyzer, HttpAnalyzer};
use crate::cli::AiCommands;
use crate::error::{Error, Result};
use crate::finance::{dashboard, strategy_scenario};
use crate::model::{Card, Record, Transaction, CARDS};
use crate::query::Query;
use colored::Colorize;
use std::path::PathBuf;

/// Execute AI commands.
pub fn execute(command: &AiCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let db = open_database(db_path)?;
    let session = require_session(&db)?;
    let analyzer = HttpAnalyzer::from_env()?;
    let rt = runtime()?;

    match command {
        AiCommands::Tip => {
            let metrics = dashboard(&transactions(&db, &session)?, 0.0);
            let tip = rt.block_on(tip_or_fallback(&analyzer, metrics.balance, metrics.expenses));
            if json {
                return print_json(&serde_json::json!({ "tip": tip }));
            }
            println!("{tip}");
            Ok(())
        }
        AiCommands::Mentor => {
            let cards: Vec<Record<Card>> = db.fetch(&session, &Query::select(CARDS).build())?;
            let scenario = strategy_scenario(
                &transactions(&db, &session)?,
                &cards,
                invested_base(&db, &session)?,
            );
            let mentorship = rt.block_on(analyzer.mentorship(&scenario))?;
            if json {
                return print_json(&mentorship);
            }
            print_list("Priorities", &mentorship.priority_list);
            println!("{}\n  {}", "Loans".bold(), mentorship.loan_advice);
            print_list("Habits", &mentorship.behavioral_tips);
            print_list("Action plan", &mentorship.action_plan);
            println!("\n{}", mentorship.mentorship_note.italic());
            Ok(())
        }
        AiCommands::Invest { amount } => {
            if !amount.is_finite() || *amount <= 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "amount must be positive, got {amount}"
                )));
            }
            let recs = rt.block_on(recommend(&analyzer, *amount))?;
            if json {
                return print_json(&recs);
            }
            println!("{} {}", "Options for".bold(), brl(*amount).cyan());
            for r in &recs {
                println!("  {} [{}] {}", r.name.bold(), r.risk, r.expected_return.green());
                println!("    {}", r.description);
                if let Some(link) = &r.link {
                    println!("    {}", link.dimmed());
                }
            }
            Ok(())
        }
        AiCommands::Insights => {
            let data: Vec<Transaction> = transactions(&db, &session)?
                .into_iter()
                .map(|r| r.data)
                .collect();
            let insights = rt.block_on(analyzer.analyze_finance(&data))?;
            if json {
                return print_json(&insights);
            }
            println!("{}", insights.insights);
            Ok(())
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    println!("{}", title.bold());
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {item}", i + 1);
    }
}
