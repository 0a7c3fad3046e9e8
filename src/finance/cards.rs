//! Credit card invoices and installment purchases.

use super::month::YearMonth;
use crate::error::{Error, Result};
use crate::model::{
    Card, ExpenseType, Record, Transaction, TransactionStatus, TransactionType, CARD_PAYMENT,
};
use chrono::{Months, NaiveDate};
use serde::Serialize;

/// A card's invoice for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardInvoice {
    pub card_id: String,
    pub month: YearMonth,
    pub items: Vec<Record<Transaction>>,
    pub total: f64,
    /// Sum of every purchase on the card, any month.
    pub blocked: f64,
    pub available: f64,
}

/// Build the invoice of `card` for `month`.
///
/// Only card payments referencing the card are considered; `blocked` spans
/// all months, so `available` is the limit minus everything still charged.
#[must_use]
pub fn card_invoice(
    card: &Record<Card>,
    transactions: &[Record<Transaction>],
    month: YearMonth,
) -> CardInvoice {
    let on_card: Vec<&Record<Transaction>> = transactions
        .iter()
        .filter(|r| r.data.is_card_payment() && r.data.card_id.as_deref() == Some(card.id()))
        .collect();

    let items: Vec<Record<Transaction>> = on_card
        .iter()
        .filter(|r| month.contains(&r.data.date))
        .map(|r| (*r).clone())
        .collect();

    let total = items.iter().map(|r| r.data.amount).sum();
    let blocked: f64 = on_card.iter().map(|r| r.data.amount).sum();

    CardInvoice {
        card_id: card.id().to_string(),
        month,
        items,
        total,
        blocked,
        available: card.data.total_limit - blocked,
    }
}

/// A purchase to split into monthly installments.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPurchase {
    pub card_id: String,
    pub description: String,
    /// Total amount, divided evenly across installments.
    pub amount: f64,
    pub date: NaiveDate,
    pub installments: u32,
    pub category: String,
}

/// One pending card expense per installment, a month apart.
///
/// Descriptions carry `(i/N)` when there is more than one installment.
/// Installments landing past the end of a short month fall on its last day.
///
/// # Errors
///
/// Returns `InvalidArgument` for zero installments or an amount that is
/// negative or not finite.
pub fn installment_plan(purchase: &CardPurchase) -> Result<Vec<Transaction>> {
    let n = purchase.installments;
    if n == 0 {
        return Err(Error::InvalidArgument(
            "installments must be at least 1".to_string(),
        ));
    }
    if !purchase.amount.is_finite() || purchase.amount < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "invalid purchase amount: {}",
            purchase.amount
        )));
    }

    let each = purchase.amount / f64::from(n);

    (0..n)
        .map(|i| {
            let date = purchase
                .date
                .checked_add_months(Months::new(i))
                .ok_or_else(|| {
                    Error::InvalidArgument("installment date out of range".to_string())
                })?;

            let description = if n > 1 {
                format!("{} ({}/{})", purchase.description, i + 1, n)
            } else {
                purchase.description.clone()
            };

            Ok(Transaction {
                kind: TransactionType::Expense,
                sub_type: Some(ExpenseType::Variable),
                income_category: None,
                description,
                amount: each,
                date: date.format("%Y-%m-%d").to_string(),
                category: purchase.category.clone(),
                status: TransactionStatus::Pending,
                payment_method: CARD_PAYMENT.to_string(),
                card_id: Some(purchase.card_id.clone()),
                receipt_url: None,
                source: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::testing::record;
    use serde_json::json;

    fn purchase(amount: f64, installments: u32, date: &str) -> CardPurchase {
        CardPurchase {
            card_id: "c1".into(),
            description: "Notebook".into(),
            amount,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            installments,
            category: "Tecnologia".into(),
        }
    }

    #[test]
    fn test_installments_split_across_months() {
        let plan = installment_plan(&purchase(3000.0, 3, "2024-05-15")).unwrap();
        assert_eq!(plan.len(), 3);

        let labels: Vec<_> = plan.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(labels, vec!["Notebook (1/3)", "Notebook (2/3)", "Notebook (3/3)"]);

        let dates: Vec<_> = plan.iter().map(|t| t.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-15", "2024-06-15", "2024-07-15"]);

        for t in &plan {
            assert!((t.amount - 1000.0).abs() < 1e-9);
            assert_eq!(t.status, TransactionStatus::Pending);
            assert!(t.is_card_payment());
            assert_eq!(t.card_id.as_deref(), Some("c1"));
        }
    }

    #[test]
    fn test_single_installment_keeps_description() {
        let plan = installment_plan(&purchase(99.9, 1, "2024-05-15")).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].description, "Notebook");
    }

    #[test]
    fn test_month_end_clamps() {
        let plan = installment_plan(&purchase(20.0, 2, "2024-01-31")).unwrap();
        assert_eq!(plan[1].date, "2024-02-29");
    }

    #[test]
    fn test_invalid_purchases_rejected() {
        assert!(installment_plan(&purchase(10.0, 0, "2024-05-15")).is_err());
        assert!(installment_plan(&purchase(f64::NAN, 2, "2024-05-15")).is_err());
        assert!(installment_plan(&purchase(-1.0, 2, "2024-05-15")).is_err());
    }

    fn card_tx(id: &str, amount: u32, method: &str, card: &str, date: &str) -> Record<Transaction> {
        record(
            id,
            json!({"amount": amount, "payment_method": method, "card_id": card, "date": date}),
        )
    }

    #[test]
    fn test_invoice_totals_and_limits() {
        let card = record::<Card>("c1", json!({"name": "Visa", "total_limit": 5000}));
        let txs = vec![
            card_tx("a", 100, "Cartão", "c1", "2024-05-02"),
            card_tx("b", 250, "Cartão", "c1", "2024-06-02"),
            card_tx("c", 999, "Cartão", "c2", "2024-05-03"),
            card_tx("d", 40, "Pix", "c1", "2024-05-04"),
        ];

        let invoice = card_invoice(&card, &txs, "2024-05".parse().unwrap());
        assert_eq!(invoice.items.len(), 1);
        assert!((invoice.total - 100.0).abs() < 1e-9);
        assert!((invoice.blocked - 350.0).abs() < 1e-9);
        assert!((invoice.available - 4650.0).abs() < 1e-9);
    }
}
