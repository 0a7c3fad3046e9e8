//! Per-table payload types.
//!
//! Field names match the stored rows. Optional fields default when absent
//! so rows written by older clients still decode.

use super::record::TableRecord;
use serde::{Deserialize, Serialize};

pub const TRANSACTIONS: &str = "transactions";
pub const CARDS: &str = "cards";
pub const RECEIPTS: &str = "receipts";
pub const NOTIFICATIONS: &str = "notifications";
pub const PROFILES: &str = "profiles";

/// Tables whose records carry an owner field.
pub const OWNED_TABLES: [&str; 4] = [TRANSACTIONS, CARDS, RECEIPTS, NOTIFICATIONS];

/// Payment method recorded for card purchases.
pub const CARD_PAYMENT: &str = "Cartão";

/// Category counted as an investment on the dashboard.
pub const INVESTMENT_CATEGORY: &str = "Investimento";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Fixed,
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeCategory {
    Salary,
    Freelance,
    Extra,
    Investment,
    Other,
}

impl IncomeCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Freelance => "freelance",
            Self::Extra => "extra",
            Self::Investment => "investment",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Paid,
    Pending,
}

/// An income or expense entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type", default)]
    pub kind: TransactionType,

    /// Only for expenses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<ExpenseType>,

    /// Only for income.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_category: Option<IncomeCategory>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub amount: f64,

    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default)]
    pub payment_method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,

    /// Channel the entry came from (e.g. `whatsapp`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Transaction {
    /// Signed contribution to the balance.
    #[must_use]
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    #[must_use]
    pub fn is_card_payment(&self) -> bool {
        self.payment_method == CARD_PAYMENT
    }
}

impl TableRecord for Transaction {
    const TABLE: &'static str = TRANSACTIONS;
}

fn default_due_day() -> u8 {
    10
}

fn default_closing_day() -> u8 {
    3
}

fn default_color() -> String {
    "#063A3A".to_string()
}

/// A credit card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,

    #[serde(default)]
    pub institution: String,

    #[serde(default)]
    pub last_digits: String,

    #[serde(default)]
    pub total_limit: f64,

    #[serde(default = "default_due_day")]
    pub due_day: u8,

    #[serde(default = "default_closing_day")]
    pub closing_day: u8,

    #[serde(default = "default_color")]
    pub color: String,
}

impl TableRecord for Card {
    const TABLE: &'static str = CARDS;
}

/// A scanned receipt filed under `folder` (`YYYY/MM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub name: String,

    #[serde(default)]
    pub amount: f64,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub file_url: String,

    #[serde(default)]
    pub folder: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl TableRecord for Receipt {
    const TABLE: &'static str = RECEIPTS;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Alert,
    Success,
    #[default]
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,

    #[serde(default)]
    pub message: String,

    #[serde(rename = "type", default)]
    pub kind: NotificationKind,

    #[serde(default)]
    pub read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TableRecord for Notification {
    const TABLE: &'static str = NOTIFICATIONS;
}

/// Per-identity profile. Keyed by the identity itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub email: String,

    #[serde(default)]
    pub nickname: String,

    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub cpf: String,

    /// Messaging number used to match inbound webhook senders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default)]
    pub country: String,

    #[serde(default)]
    pub language: String,

    #[serde(default)]
    pub recovery_phrase: String,

    #[serde(default)]
    pub is_premium: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(default)]
    pub total_invested_base: f64,
}

impl Profile {
    /// Profile created on first sign-up.
    #[must_use]
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            nickname: "Novo Investidor".to_string(),
            full_name: String::new(),
            cpf: String::new(),
            phone: None,
            country: "Brasil".to_string(),
            language: "pt".to_string(),
            recovery_phrase: String::new(),
            is_premium: false,
            avatar_url: None,
            total_invested_base: 0.0,
        }
    }
}

impl TableRecord for Profile {
    const TABLE: &'static str = PROFILES;
}
