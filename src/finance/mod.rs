//! Financial aggregation over stored records.
//!
//! Everything here is pure: callers fetch records through
//! [`Database`](crate::db::Database) and hand them in. Nothing reads or
//! writes the store.
//!
//! - [`dashboard`] - balance, totals and the suggested budget split
//! - [`monthly_expenses`] - fixed/variable summary for one month
//! - [`tax_summary`] - income and expense totals per category
//! - [`cards`] - card invoices and installment purchases
//! - [`receipts`] - the year/month receipt folder tree

pub mod cards;
mod month;
pub mod receipts;

pub use cards::{card_invoice, installment_plan, CardInvoice, CardPurchase};
pub use month::{parse_date, YearMonth};
pub use receipts::{receipt_tree, MonthFolder, ReceiptTree, YearFolder};

use crate::error::{Error, Result};
use crate::model::{
    Card, ExpenseType, IncomeCategory, Record, Transaction, TransactionStatus, TransactionType,
    INVESTMENT_CATEGORY,
};
use serde::Serialize;
use std::str::FromStr;

/// Number of transactions shown as "recent" on the dashboard.
pub const RECENT_LIMIT: usize = 4;

/// Suggested split of monthly income, in percent.
pub const BUDGET_SPLIT: [(&str, u8); 5] = [
    ("essential", 60),
    ("pay_yourself", 5),
    ("savings", 10),
    ("invest", 15),
    ("abundance", 10),
];

fn total<'a>(items: impl IntoIterator<Item = &'a Transaction>) -> f64 {
    items.into_iter().map(|t| t.amount).sum()
}

// ==================
// Dashboard
// ==================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetBucket {
    pub bucket: &'static str,
    pub percent: u8,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub balance: f64,
    pub income: f64,
    pub expenses: f64,
    pub investments: f64,
    pub budget: Vec<BudgetBucket>,
    pub recent: Vec<Record<Transaction>>,
}

/// Headline metrics for the dashboard.
///
/// Investments are entries tagged as investment income or filed under the
/// investment category, plus the amount the user declared as already
/// invested.
#[must_use]
pub fn dashboard(transactions: &[Record<Transaction>], invested_base: f64) -> DashboardMetrics {
    let data = || transactions.iter().map(|r| &r.data);

    let income = total(data().filter(|t| t.kind == TransactionType::Income));
    let expenses = total(data().filter(|t| t.kind == TransactionType::Expense));
    let balance = data().map(Transaction::signed_amount).sum();
    let investments = total(data().filter(|t| {
        t.income_category == Some(IncomeCategory::Investment) || t.category == INVESTMENT_CATEGORY
    })) + invested_base;

    let budget = BUDGET_SPLIT
        .iter()
        .map(|&(bucket, percent)| BudgetBucket {
            bucket,
            percent,
            amount: income * f64::from(percent) / 100.0,
        })
        .collect();

    DashboardMetrics {
        balance,
        income,
        expenses,
        investments,
        budget,
        recent: transactions.iter().take(RECENT_LIMIT).cloned().collect(),
    }
}

// ==================
// Monthly expenses
// ==================

/// Which half of the expense view is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseTab {
    #[default]
    Fixed,
    Variable,
}

impl ExpenseTab {
    /// Card purchases always count as variable.
    #[must_use]
    pub fn includes(&self, t: &Transaction) -> bool {
        match self {
            Self::Fixed => t.sub_type == Some(ExpenseType::Fixed),
            Self::Variable => t.sub_type == Some(ExpenseType::Variable) || t.is_card_payment(),
        }
    }
}

impl FromStr for ExpenseTab {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fixed" | "fixa" | "fixo" => Ok(Self::Fixed),
            "variable" | "variavel" | "variável" => Ok(Self::Variable),
            other => Err(Error::InvalidArgument(format!(
                "invalid expense tab '{other}', expected fixed or variable"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub month: YearMonth,
    pub tab: ExpenseTab,
    /// Every expense in the month.
    pub total: f64,
    pub fixed_total: f64,
    pub variable_total: f64,
    /// Paid and pending totals within the selected tab.
    pub tab_paid: f64,
    pub tab_pending: f64,
    pub items: Vec<Record<Transaction>>,
}

/// Expense summary for `month`, with `tab` selecting the listed items.
#[must_use]
pub fn monthly_expenses(
    transactions: &[Record<Transaction>],
    month: YearMonth,
    tab: ExpenseTab,
) -> ExpenseSummary {
    let in_month: Vec<&Record<Transaction>> = transactions
        .iter()
        .filter(|r| r.data.kind == TransactionType::Expense && month.contains(&r.data.date))
        .collect();

    let items: Vec<Record<Transaction>> = in_month
        .iter()
        .filter(|r| tab.includes(&r.data))
        .map(|r| (*r).clone())
        .collect();

    let data = || in_month.iter().map(|r| &r.data);
    let by_status = |status| total(items.iter().map(|r| &r.data).filter(|t| t.status == status));

    ExpenseSummary {
        month,
        tab,
        total: total(data()),
        fixed_total: total(data().filter(|t| ExpenseTab::Fixed.includes(t))),
        variable_total: total(data().filter(|t| ExpenseTab::Variable.includes(t))),
        tab_paid: by_status(TransactionStatus::Paid),
        tab_pending: by_status(TransactionStatus::Pending),
        items,
    }
}

// ==================
// Tax summary
// ==================

/// Group label for income without any category.
pub const UNCATEGORIZED_INCOME: &str = "Outros";

/// Group label for expenses without a category.
pub const UNCATEGORIZED_EXPENSE: &str = "Geral";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxSummary {
    pub incomes: Vec<CategoryTotal>,
    pub expenses: Vec<CategoryTotal>,
    pub total_income: f64,
    pub total_expenses: f64,
}

fn group(groups: &mut Vec<CategoryTotal>, category: &str, amount: f64) {
    match groups.iter_mut().find(|g| g.category == category) {
        Some(g) => g.total += amount,
        None => groups.push(CategoryTotal {
            category: category.to_string(),
            total: amount,
        }),
    }
}

/// Income and expense totals per category, groups in first-seen order.
#[must_use]
pub fn tax_summary(transactions: &[Record<Transaction>]) -> TaxSummary {
    let mut incomes = Vec::new();
    let mut expenses = Vec::new();

    for t in transactions.iter().map(|r| &r.data) {
        match t.kind {
            TransactionType::Income => {
                let key = match (&t.income_category, t.category.as_str()) {
                    (Some(c), _) => c.as_str(),
                    (None, "") => UNCATEGORIZED_INCOME,
                    (None, c) => c,
                };
                group(&mut incomes, key, t.amount);
            }
            TransactionType::Expense => {
                let key = if t.category.is_empty() {
                    UNCATEGORIZED_EXPENSE
                } else {
                    t.category.as_str()
                };
                group(&mut expenses, key, t.amount);
            }
        }
    }

    TaxSummary {
        total_income: incomes.iter().map(|g| g.total).sum(),
        total_expenses: expenses.iter().map(|g| g.total).sum(),
        incomes,
        expenses,
    }
}

// ==================
// Transaction filter
// ==================

/// Filters for the transaction list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    /// Fixed or variable; transactions without a sub-type never match.
    pub sub_type: Option<ExpenseType>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    /// Exact `YYYY-MM-DD` date.
    pub date: Option<String>,
}

impl TransactionFilter {
    #[must_use]
    pub fn matches(&self, t: &Transaction) -> bool {
        let search = self.search.as_deref().is_none_or(|s| {
            t.description.to_lowercase().contains(&s.to_lowercase())
        });
        search
            && self.kind.is_none_or(|k| t.kind == k)
            && self.status.is_none_or(|s| t.status == s)
            && self.sub_type.is_none_or(|s| t.sub_type == Some(s))
            && self.category.as_deref().is_none_or(|c| t.category == c)
            && self.payment_method.as_deref().is_none_or(|p| t.payment_method == p)
            && self.date.as_deref().is_none_or(|d| t.date == d)
    }

    #[must_use]
    pub fn apply(&self, records: Vec<Record<Transaction>>) -> Vec<Record<Transaction>> {
        records.into_iter().filter(|r| self.matches(&r.data)).collect()
    }
}

// ==================
// Strategy scenario
// ==================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSummary {
    pub name: String,
    pub limit: f64,
    pub due_day: u8,
}

/// Financial snapshot handed to the mentorship collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyScenario {
    pub balance: f64,
    /// Pending expenses.
    pub debts: Vec<Transaction>,
    pub cards: Vec<CardSummary>,
    pub total_invested: f64,
}

#[must_use]
pub fn strategy_scenario(
    transactions: &[Record<Transaction>],
    cards: &[Record<Card>],
    invested_base: f64,
) -> StrategyScenario {
    StrategyScenario {
        balance: transactions.iter().map(|r| r.data.signed_amount()).sum(),
        debts: transactions
            .iter()
            .map(|r| &r.data)
            .filter(|t| {
                t.kind == TransactionType::Expense && t.status == TransactionStatus::Pending
            })
            .cloned()
            .collect(),
        cards: cards
            .iter()
            .map(|c| CardSummary {
                name: c.data.name.clone(),
                limit: c.data.total_limit,
                due_day: c.data.due_day,
            })
            .collect(),
        total_invested: invested_base,
    }
}
