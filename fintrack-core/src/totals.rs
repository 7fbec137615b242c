//! Income / expense totals over a set of transactions.

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Totals {
    pub income: f64,
    /// Kept negative
    pub expenses: f64,
    pub net: f64,
}

/// Sum amounts >= 0 as income and amounts < 0 as expenses.
/// Rows with a non-numeric amount are skipped.
pub fn calculate_totals(transactions: &[Transaction]) -> Totals {
    let mut income = 0.0;
    let mut expenses = 0.0;
    for amount in transactions.iter().filter_map(Transaction::amount_value) {
        if amount >= 0.0 {
            income += amount;
        } else {
            expenses += amount;
        }
    }
    Totals {
        income,
        expenses,
        net: income + expenses,
    }
}

impl Totals {
    pub fn summary(&self) -> String {
        format!(
            "Total Income: ${:.2}\nTotal Expenses: ${:.2}\nNet Balance: ${:.2}",
            self.income,
            self.expenses.abs(),
            self.net
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(amount: &str, id: u64) -> Transaction {
        Transaction {
            amount: amount.to_string(),
            description: "x".to_string(),
            date: "2024-01-01".to_string(),
            category: "Miscellaneous".to_string(),
            id,
        }
    }

    #[test]
    fn test_totals() {
        let totals = calculate_totals(&[txn("100.00", 0), txn("-40.00", 1), txn("-10.00", 2)]);
        assert!((totals.income - 100.0).abs() < 1e-9);
        assert!((totals.expenses + 50.0).abs() < 1e-9);
        assert!((totals.net - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_numeric_rows_skipped() {
        let totals = calculate_totals(&[txn("abc", 0), txn("5.00", 1)]);
        assert_eq!(totals.income, 5.0);
        assert_eq!(totals.expenses, 0.0);
    }

    #[test]
    fn test_summary_shows_expenses_positive() {
        let totals = calculate_totals(&[txn("100.00", 0), txn("-40.00", 1)]);
        assert_eq!(
            totals.summary(),
            "Total Income: $100.00\nTotal Expenses: $40.00\nNet Balance: $60.00"
        );
    }
}
