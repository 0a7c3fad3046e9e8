//! Receipt folder tree.
//!
//! Receipts are filed under a `YYYY/MM` folder. The tree groups them by
//! year, then month, both in first-seen order so a date-sorted input yields
//! a date-sorted tree.

use crate::model::{Receipt, Record};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthFolder {
    pub month: String,
    pub receipts: Vec<Record<Receipt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearFolder {
    pub year: String,
    pub months: Vec<MonthFolder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptTree {
    pub years: Vec<YearFolder>,
}

impl ReceiptTree {
    /// Receipts filed exactly under `folder` (`YYYY/MM`).
    #[must_use]
    pub fn items(&self, folder: &str) -> &[Record<Receipt>] {
        let Some((year, month)) = folder.split_once('/') else {
            return &[];
        };
        self.years
            .iter()
            .find(|y| y.year == year)
            .and_then(|y| y.months.iter().find(|m| m.month == month))
            .map(|m| m.receipts.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.years
            .iter()
            .flat_map(|y| &y.months)
            .map(|m| m.receipts.len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

/// Group receipts by folder. Receipts without a `YYYY/MM` folder are left out.
#[must_use]
pub fn receipt_tree(receipts: &[Record<Receipt>]) -> ReceiptTree {
    let mut tree = ReceiptTree::default();

    for receipt in receipts {
        let Some((year, month)) = receipt.data.folder.split_once('/') else {
            continue;
        };
        if year.is_empty() || month.is_empty() {
            continue;
        }

        let y = match tree.years.iter().position(|y| y.year == year) {
            Some(i) => &mut tree.years[i],
            None => {
                tree.years.push(YearFolder {
                    year: year.to_string(),
                    months: Vec::new(),
                });
                let last = tree.years.len() - 1;
                &mut tree.years[last]
            }
        };

        match y.months.iter_mut().find(|m| m.month == month) {
            Some(m) => m.receipts.push(receipt.clone()),
            None => y.months.push(MonthFolder {
                month: month.to_string(),
                receipts: vec![receipt.clone()],
            }),
        }
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finance::testing::record;
    use serde_json::json;

    #[test]
    fn test_tree_groups_by_year_and_month() {
        let receipts: Vec<Record<Receipt>> = vec![
            record("r1", json!({"name": "Padaria", "folder": "2024/06"})),
            record("r2", json!({"name": "Mercado", "folder": "2024/05"})),
            record("r3", json!({"name": "Farmácia", "folder": "2024/06"})),
            record("r4", json!({"name": "Posto", "folder": "2023/12"})),
            record("r5", json!({"name": "Sem pasta"})),
        ];

        let tree = receipt_tree(&receipts);
        let years: Vec<_> = tree.years.iter().map(|y| y.year.as_str()).collect();
        assert_eq!(years, vec!["2024", "2023"]);

        let months: Vec<_> = tree.years[0].months.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["06", "05"]);

        let june: Vec<_> = tree.items("2024/06").iter().map(Record::id).collect();
        assert_eq!(june, vec!["r1", "r3"]);
        assert!(tree.items("2022/01").is_empty());
        assert!(tree.items("2024").is_empty());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_empty_tree() {
        let tree = receipt_tree(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }
}
