//! Data models for AuraFin.
//!
//! This module contains all domain models:
//! - Record envelope and typed record wrapper
//! - Transaction
//! - Card
//! - Receipt
//! - Notification
//! - Profile

pub mod record;
pub mod tables;

pub use tables::{
    Card, ExpenseType, IncomeCategory, Notification, NotificationKind, Profile, Receipt,
    Transaction, TransactionStatus, TransactionType, CARDS, CARD_PAYMENT, INVESTMENT_CATEGORY,
    NOTIFICATIONS, OWNED_TABLES, PROFILES, RECEIPTS, TRANSACTIONS,
};
pub use record::{to_row, Envelope, Record, TableRecord};
