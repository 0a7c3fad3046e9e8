//! Finance views: dashboard, transactions, expenses, tax and cards.

use super::{
    brl, invested_base, month_arg, open_database, print_json, require_session, runtime,
    transactions,
};
use crate::ai::{tip_or_fallback, HttpAnalyzer, FALLBACK_TIP};
use crate::cli::{CardCommands, TransactionArgs};
use crate::error::{Error, Result};
use crate::finance::{
    card_invoice, dashboard, installment_plan, monthly_expenses, parse_date, tax_summary,
    CardPurchase, CategoryTotal, DashboardMetrics, ExpenseTab, TransactionFilter,
};
use crate::model::{Card, Record, Transaction, TransactionStatus, TransactionType, CARDS};
use crate::query::Query;
use crate::scope::ID_FIELD;
use crate::validate::{normalize_expense_type, normalize_status, normalize_type, rejected};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Serialize)]
struct DashboardOutput {
    #[serde(flatten)]
    metrics: DashboardMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    tip: Option<String>,
}

#[derive(Serialize)]
struct TransactionListOutput {
    transactions: Vec<Record<Transaction>>,
    count: usize,
}

#[derive(Serialize)]
struct PurchaseOutput {
    card_id: String,
    installments: Vec<Record<Transaction>>,
}

/// Execute `af dashboard`.
pub fn execute_dashboard(with_tip: bool, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let db = open_database(db_path)?;
    let session = require_session(&db)?;
    let txs = transactions(&db, &session)?;
    let metrics = dashboard(&txs, invested_base(&db, &session)?);

    let tip = if with_tip {
        Some(match HttpAnalyzer::from_env() {
            Ok(analyzer) => {
                let rt = runtime()?;
                rt.block_on(tip_or_fallback(&analyzer, metrics.balance, metrics.expenses))
            }
            Err(e) => {
                warn!(error = %e, "AI collaborator unavailable, using fallback tip");
                FALLBACK_TIP.to_string()
            }
        })
    } else {
        None
    };

    if json {
        return print_json(&DashboardOutput { metrics, tip });
    }

    println!("{}", "Dashboard".bold());
    println!("  Balance:     {}", brl(metrics.balance).cyan().bold());
    println!("  Income:      {}", brl(metrics.income).green());
    println!("  Expenses:    {}", brl(metrics.expenses).red());
    println!("  Investments: {}", brl(metrics.investments));
    println!();
    println!("{}", "Budget".bold());
    for bucket in &metrics.budget {
        println!("  {:<14} {:>3}%  {}", bucket.bucket, bucket.percent, brl(bucket.amount));
    }
    if !metrics.recent.is_empty() {
        println!();
        println!("{}", "Recent".bold());
        for r in &metrics.recent {
            print_transaction(r);
        }
    }
    if let Some(tip) = tip {
        println!();
        println!("{} {}", "Tip:".yellow().bold(), tip);
    }
    Ok(())
}

/// Execute `af transactions`.
pub fn execute_transactions(
    args: &TransactionArgs,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let kind = args
        .kind
        .as_deref()
        .map(|k| normalize_type(k).map_err(|r| rejected("type", r)))
        .transpose()?;
    let status = args
        .status
        .as_deref()
        .map(|s| normalize_status(s).map_err(|r| rejected("status", r)))
        .transpose()?;
    let sub_type = args
        .sub_type
        .as_deref()
        .map(|s| normalize_expense_type(s).map_err(|r| rejected("expense type", r)))
        .transpose()?;
    let filter = TransactionFilter {
        search: args.search.clone(),
        kind,
        status,
        sub_type,
        category: args.category.clone(),
        payment_method: args.payment_method.clone(),
        date: args.date.clone(),
    };

    let db = open_database(db_path)?;
    let session = require_session(&db)?;
    let list = filter.apply(transactions(&db, &session)?);

    if json {
        let count = list.len();
        return print_json(&TransactionListOutput { transactions: list, count });
    }

    if list.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }
    for r in &list {
        print_transaction(r);
    }
    Ok(())
}

/// Execute `af expenses`.
pub fn execute_expenses(
    month: Option<&str>,
    tab: &str,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let month = month_arg(month)?;
    let tab: ExpenseTab = tab.parse()?;

    let db = open_database(db_path)?;
    let session = require_session(&db)?;
    let summary = monthly_expenses(&transactions(&db, &session)?, month, tab);

    if json {
        return print_json(&summary);
    }

    println!("{} {}", "Expenses".bold(), summary.month.to_string().cyan());
    println!("  Total:    {}", brl(summary.total));
    println!("  Fixed:    {}", brl(summary.fixed_total));
    println!("  Variable: {}", brl(summary.variable_total));
    println!();
    let label = match summary.tab {
        ExpenseTab::Fixed => "Fixed",
        ExpenseTab::Variable => "Variable",
    };
    println!(
        "{} (paid {}, pending {})",
        label.bold(),
        brl(summary.tab_paid).green(),
        brl(summary.tab_pending).yellow()
    );
    if summary.items.is_empty() {
        println!("  No expenses.");
    }
    for r in &summary.items {
        print_transaction(r);
    }
    Ok(())
}

/// Execute `af tax`.
pub fn execute_tax(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let db = open_database(db_path)?;
    let session = require_session(&db)?;
    let summary = tax_summary(&transactions(&db, &session)?);

    if json {
        return print_json(&summary);
    }

    let print_groups = |title: &str, groups: &[CategoryTotal], total: f64| {
        println!("{} {}", title.bold(), brl(total));
        for g in groups {
            println!("  {:<20} {}", g.category, brl(g.total));
        }
    };
    print_groups("Income", &summary.incomes, summary.total_income);
    println!();
    print_groups("Expenses", &summary.expenses, summary.total_expenses);
    Ok(())
}

/// Execute card commands.
pub fn execute_card(command: &CardCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        CardCommands::Invoice { card_id, month } => {
            invoice(card_id, month.as_deref(), db_path, json)
        }
        CardCommands::Purchase {
            card_id,
            description,
            amount,
            installments,
            date,
            category,
        } => {
            let date = match date {
                Some(d) => parse_date(d).filter(|_| d.len() == 10).ok_or_else(|| {
                    Error::InvalidArgument(format!("invalid date '{d}', expected YYYY-MM-DD"))
                })?,
                None => chrono::Local::now().date_naive(),
            };
            let purchase = CardPurchase {
                card_id: card_id.clone(),
                description: description.clone(),
                amount: *amount,
                date,
                installments: *installments,
                category: category.clone(),
            };
            purchase_on_card(&purchase, db_path, json)
        }
    }
}

fn invoice(
    card_id: &str,
    month: Option<&str>,
    db_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let month = month_arg(month)?;
    let db = open_database(db_path)?;
    let session = require_session(&db)?;

    let query = Query::select(CARDS).eq(ID_FIELD, card_id).build();
    let card: Record<Card> = db.fetch_one(&session, &query)?;
    let invoice = card_invoice(&card, &transactions(&db, &session)?, month);

    if json {
        return print_json(&invoice);
    }

    println!(
        "{} {} {}",
        card.data.name.bold(),
        "invoice".bold(),
        invoice.month.to_string().cyan()
    );
    println!("  Total:     {}", brl(invoice.total).red());
    println!("  Limit:     {}", brl(card.data.total_limit));
    println!("  Available: {}", brl(invoice.available).green());
    println!("  Due day:   {}", card.data.due_day);
    for r in &invoice.items {
        print_transaction(r);
    }
    Ok(())
}

fn purchase_on_card(purchase: &CardPurchase, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let plan = installment_plan(purchase)?;

    let mut db = open_database(db_path)?;
    let session = require_session(&db)?;
    // The card must be visible to the caller.
    let query = Query::select(CARDS)
        .eq(ID_FIELD, purchase.card_id.as_str())
        .build();
    let card: Record<Card> = db.fetch_one(&session, &query)?;

    let mut created = Vec::with_capacity(plan.len());
    for tx in &plan {
        created.push(db.create(&session, tx)?);
    }

    if json {
        return print_json(&PurchaseOutput {
            card_id: card.id().to_string(),
            installments: created,
        });
    }

    println!(
        "Recorded {} installment(s) on {}",
        created.len(),
        card.data.name.cyan()
    );
    for r in &created {
        print_transaction(r);
    }
    Ok(())
}

fn print_transaction(r: &Record<Transaction>) {
    let t = &r.data;
    let amount = match t.kind {
        TransactionType::Income => format!("+{}", brl(t.amount)).green(),
        TransactionType::Expense => format!("-{}", brl(t.amount)).red(),
    };
    let status = match t.status {
        TransactionStatus::Paid => "",
        TransactionStatus::Pending => " (pending)",
    };
    println!(
        "  {}  {}  {:<28} {:>14}{}",
        r.id().dimmed(),
        t.date,
        t.description,
        amount,
        status.yellow()
    );
}
