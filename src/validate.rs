//! Input normalization for CLI arguments.
//!
//! Table names, transaction types, statuses and expense types accept a few
//! synonyms (including the Portuguese terms the app uses) so scripted
//! callers don't have to be exact. Three-tier resolution: exact match →
//! synonym lookup → error with suggestion.

use crate::error::Error;
use crate::model::{
    ExpenseType, TransactionStatus, TransactionType, CARDS, NOTIFICATIONS, PROFILES, RECEIPTS,
    TRANSACTIONS,
};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Failed normalization: the original input and an optional suggestion.
pub type Rejected = (String, Option<String>);

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_TABLES: LazyLock<HashSet<&str>> = LazyLock::new(|| {
    [TRANSACTIONS, CARDS, RECEIPTS, NOTIFICATIONS, PROFILES]
        .into_iter()
        .collect()
});

pub static VALID_TYPES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["income", "expense"].into_iter().collect());

pub static VALID_STATUSES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["paid", "pending"].into_iter().collect());

pub static VALID_EXPENSE_TYPES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["fixed", "variable"].into_iter().collect());

// ── Synonym maps ─────────────────────────────────────────────

pub static TABLE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("transaction", TRANSACTIONS),
        ("tx", TRANSACTIONS),
        ("txs", TRANSACTIONS),
        ("card", CARDS),
        ("receipt", RECEIPTS),
        ("notification", NOTIFICATIONS),
        ("profile", PROFILES),
        ("users", PROFILES),
    ]
    .into_iter()
    .collect()
});

pub static TYPE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("in", "income"),
        ("receita", "income"),
        ("entrada", "income"),
        ("credit", "income"),
        ("out", "expense"),
        ("despesa", "expense"),
        ("gasto", "expense"),
        ("saida", "expense"),
        ("saída", "expense"),
        ("debit", "expense"),
    ]
    .into_iter()
    .collect()
});

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("done", "paid"),
        ("settled", "paid"),
        ("pago", "paid"),
        ("liquidado", "paid"),
        ("open", "pending"),
        ("due", "pending"),
        ("unpaid", "pending"),
        ("pendente", "pending"),
    ]
    .into_iter()
    .collect()
});

pub static EXPENSE_TYPE_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("fixa", "fixed"),
        ("fixo", "fixed"),
        ("recurring", "fixed"),
        ("variavel", "variable"),
        ("variável", "variable"),
        ("oneoff", "variable"),
    ]
    .into_iter()
    .collect()
});

fn normalize<'a>(
    input: &str,
    valid: &HashSet<&'a str>,
    synonyms: &HashMap<&'a str, &'a str>,
) -> Result<&'a str, Rejected> {
    let lower = input.trim().to_lowercase();

    // Tier 1: exact match
    if let Some(&v) = valid.get(lower.as_str()) {
        return Ok(v);
    }

    // Tier 2: synonym lookup
    if let Some(&canonical) = synonyms.get(lower.as_str()) {
        return Ok(canonical);
    }

    // Tier 3: find closest suggestion
    let suggestion = find_closest_match(&lower, valid, synonyms);
    Err((input.to_string(), suggestion))
}

/// Normalize a table name.
pub fn normalize_table(input: &str) -> Result<&'static str, Rejected> {
    normalize(input, &VALID_TABLES, &TABLE_SYNONYMS)
}

pub fn normalize_type(input: &str) -> Result<TransactionType, Rejected> {
    normalize(input, &VALID_TYPES, &TYPE_SYNONYMS).map(|v| match v {
        "income" => TransactionType::Income,
        _ => TransactionType::Expense,
    })
}

pub fn normalize_status(input: &str) -> Result<TransactionStatus, Rejected> {
    normalize(input, &VALID_STATUSES, &STATUS_SYNONYMS).map(|v| match v {
        "pending" => TransactionStatus::Pending,
        _ => TransactionStatus::Paid,
    })
}

pub fn normalize_expense_type(input: &str) -> Result<ExpenseType, Rejected> {
    normalize(input, &VALID_EXPENSE_TYPES, &EXPENSE_TYPE_SYNONYMS).map(|v| match v {
        "fixed" => ExpenseType::Fixed,
        _ => ExpenseType::Variable,
    })
}

/// Turn a rejected input into an `InvalidArgument` naming what was expected.
#[must_use]
pub fn rejected(what: &str, (input, suggestion): Rejected) -> Error {
    match suggestion {
        Some(s) => {
            Error::InvalidArgument(format!("invalid {what} '{input}' (did you mean '{s}'?)"))
        }
        None => Error::InvalidArgument(format!("invalid {what} '{input}'")),
    }
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
            // For synonyms, show what it maps to
            let shown = synonyms.get(v).copied().unwrap_or(v);
            best = Some((shown, dist));
        }
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Find existing ids similar to the searched id.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_ids(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|id| (levenshtein_distance(searched, id), id.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, id)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_table() {
        assert_eq!(normalize_table("cards"), Ok("cards"));
        assert_eq!(normalize_table("Card"), Ok("cards"));
        assert_eq!(normalize_table("tx"), Ok("transactions"));

        let (input, suggestion) = normalize_table("reciepts").unwrap_err();
        assert_eq!(input, "reciepts");
        assert_eq!(suggestion.as_deref(), Some("receipts"));
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type("income"), Ok(TransactionType::Income));
        assert_eq!(normalize_type("Despesa"), Ok(TransactionType::Expense));
        assert!(normalize_type("nonsense-value").is_err());
    }

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("done"), Ok(TransactionStatus::Paid));
        assert_eq!(normalize_status("PENDENTE"), Ok(TransactionStatus::Pending));
        assert!(normalize_status("zzzzzzzz").is_err());
    }

    #[test]
    fn test_normalize_expense_type() {
        assert_eq!(normalize_expense_type("fixa"), Ok(ExpenseType::Fixed));
        assert_eq!(normalize_expense_type("variable"), Ok(ExpenseType::Variable));
    }

    #[test]
    fn test_rejected_message_carries_suggestion() {
        let err = rejected("status", ("piad".to_string(), Some("paid".to_string())));
        assert!(err.to_string().contains("did you mean 'paid'"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_ids() {
        let ids = vec![
            "a1b2c3d4e5f6".to_string(),
            "a1b2c3d4e5f7".to_string(),
            "zzzzzzzzzzzz".to_string(),
        ];
        let result = find_similar_ids("a1b2c3d4e5f0", &ids, 3);
        assert_eq!(result, vec!["a1b2c3d4e5f6", "a1b2c3d4e5f7"]);
    }
}
