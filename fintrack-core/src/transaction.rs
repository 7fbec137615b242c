//! Transaction record as persisted in the ledger.

use serde::{Deserialize, Serialize};

use crate::time::storage_to_display;

/// Column order of the ledger file.
pub const LEDGER_HEADERS: [&str; 5] = ["Amount", "Description", "Date", "Category", "ID"];

/// One ledger row.
///
/// `amount` and `date` keep the persisted text so that a rewrite never
/// alters rows it did not touch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    /// Signed, two fractional digits. Positive = income, negative = expense
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// YYYY-MM-DD
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "ID")]
    pub id: u64,
}

impl Transaction {
    pub fn new(
        amount: f64,
        description: impl Into<String>,
        date: impl Into<String>,
        category: impl Into<String>,
        id: u64,
    ) -> Self {
        Self {
            amount: format_amount(amount),
            description: description.into(),
            date: date.into(),
            category: category.into(),
            id,
        }
    }

    /// Numeric amount, `None` when the stored text is not a number.
    pub fn amount_value(&self) -> Option<f64> {
        parse_amount(&self.amount)
    }

    /// Returns true if this is income (zero counts as income)
    pub fn is_income(&self) -> bool {
        self.amount_value().is_some_and(|a| a >= 0.0)
    }

    /// Returns true if this is an expense (negative amount)
    pub fn is_expense(&self) -> bool {
        self.amount_value().is_some_and(|a| a < 0.0)
    }

    pub fn display_date(&self) -> String {
        storage_to_display(&self.date)
    }

    /// Single-line rendering used for the model's context snapshot.
    pub fn snapshot_line(&self) -> String {
        format!(
            "ID {}: amount={} description=\"{}\" date={} category=\"{}\"",
            self.id,
            self.amount,
            self.description,
            self.display_date(),
            self.category
        )
    }
}

/// Serialize an amount with exactly two fractional digits.
pub fn format_amount(amount: f64) -> String {
    let s = format!("{amount:.2}");
    // -0.001 rounds to "-0.00"
    if s == "-0.00" { "0.00".to_string() } else { s }
}

/// Parse a user- or file-supplied amount. Rejects NaN and infinities.
pub fn parse_amount(s: &str) -> Option<f64> {
    let v: f64 = s.trim().parse().ok()?;
    v.is_finite().then_some(v)
}
