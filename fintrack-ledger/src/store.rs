//! Flat-file transaction ledger.
//!
//! One CSV header row (`Amount,Description,Date,Category,ID`) followed by one
//! row per transaction. Adds append a row; every other mutation rewrites the
//! file through a sibling temp file that is renamed into place.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fintrack_core::time::{STORAGE_FORMAT, display_to_storage};
use fintrack_core::{EditField, LEDGER_HEADERS, Transaction, format_amount, parse_amount};

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if it is missing or empty.
    /// An existing file with a different header is refused, never rewritten.
    pub fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(LedgerError::io(parent))?;
        }

        let first_line = if self.path.exists() {
            let f = fs::File::open(&self.path).map_err(LedgerError::io(&self.path))?;
            let mut line = String::new();
            BufReader::new(f)
                .read_line(&mut line)
                .map_err(LedgerError::io(&self.path))?;
            line
        } else {
            String::new()
        };

        if first_line.trim().is_empty() {
            tracing::info!(path = %self.path.display(), "creating transactions ledger");
            return self.write_all(&[]);
        }

        let found: Vec<&str> = first_line.trim().split(',').map(str::trim).collect();
        if found != LEDGER_HEADERS {
            return Err(LedgerError::CorruptLedger {
                path: self.path.clone(),
                found: first_line.trim().to_string(),
            });
        }
        Ok(())
    }

    /// All transactions in storage order.
    pub fn read_transactions(&self) -> Result<Vec<Transaction>> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(LedgerError::csv(&self.path))?;
        rdr.deserialize()
            .collect::<std::result::Result<Vec<Transaction>, _>>()
            .map_err(LedgerError::csv(&self.path))
    }

    /// Append a transaction and return its ID: 0 for an empty ledger,
    /// otherwise one past the highest existing ID.
    pub fn add_transaction(
        &self,
        amount: f64,
        description: &str,
        date: NaiveDate,
        category: &str,
    ) -> Result<u64> {
        let existing = self.read_transactions()?;
        let id = next_id(&existing);
        let txn = Transaction::new(
            amount,
            description,
            date.format(STORAGE_FORMAT).to_string(),
            category,
            id,
        );

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(LedgerError::io(&self.path))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.serialize(&txn).map_err(LedgerError::csv(&self.path))?;
        wtr.flush().map_err(LedgerError::io(&self.path))?;

        tracing::info!(id, amount = %txn.amount, category, "transaction added");
        Ok(id)
    }

    /// Change one field of the transaction with `id`.
    ///
    /// `date` takes DD/MM/YYYY and is stored as YYYY-MM-DD; `amount` is
    /// re-serialized with two decimals. Returns `false` without touching the
    /// file when the ID is unknown or the value is malformed.
    pub fn edit_transaction(&self, id: u64, field: EditField, new_value: &str) -> Result<bool> {
        let mut transactions = self.read_transactions()?;
        let Some(txn) = transactions.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };

        match field {
            EditField::Amount => match parse_amount(new_value) {
                Some(a) => txn.amount = format_amount(a),
                None => return Ok(false),
            },
            EditField::Date => match display_to_storage(new_value) {
                Ok(d) => txn.date = d,
                Err(_) => return Ok(false),
            },
            EditField::Description => txn.description = new_value.to_string(),
            EditField::Category => txn.category = new_value.to_string(),
        }

        self.write_all(&transactions)?;
        tracing::info!(id, %field, "transaction edited");
        Ok(true)
    }

    /// Remove the transaction with `id`; `false` if there is none.
    pub fn remove_transaction(&self, id: u64) -> Result<bool> {
        let transactions = self.read_transactions()?;
        let before = transactions.len();
        let kept: Vec<Transaction> = transactions.into_iter().filter(|t| t.id != id).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.write_all(&kept)?;
        tracing::info!(id, "transaction removed");
        Ok(true)
    }

    /// Reassign IDs 0..N-1 in storage order.
    pub fn renumber_ids(&self) -> Result<()> {
        let mut transactions = self.read_transactions()?;
        for (i, t) in transactions.iter_mut().enumerate() {
            t.id = i as u64;
        }
        self.write_all(&transactions)?;
        tracing::debug!(count = transactions.len(), "ids renumbered");
        Ok(())
    }

    fn write_all(&self, transactions: &[Transaction]) -> Result<()> {
        let tmp = tmp_path(&self.path);
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)
                .map_err(LedgerError::csv(&tmp))?;
            wtr.write_record(LEDGER_HEADERS)
                .map_err(LedgerError::csv(&tmp))?;
            for t in transactions {
                wtr.serialize(t).map_err(LedgerError::csv(&tmp))?;
            }
            wtr.flush().map_err(LedgerError::io(&tmp))?;
        }
        fs::rename(&tmp, &self.path).map_err(LedgerError::io(&self.path))
    }
}

fn next_id(transactions: &[Transaction]) -> u64 {
    transactions.iter().map(|t| t.id).max().map_or(0, |m| m + 1)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LedgerStore) {
        let td = TempDir::new().unwrap();
        let store = LedgerStore::new(td.path().join("transactions.csv"));
        store.initialize().unwrap();
        (td, store)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_initialize_writes_header_once() {
        let (_td, store) = store();
        store.initialize().unwrap();
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "Amount,Description,Date,Category,ID\n"
        );
        assert!(store.read_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_refuses_foreign_file() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("transactions.csv");
        fs::write(&path, "Date,Payee,Amount\n2024-01-01,Shop,3\n").unwrap();
        let err = LedgerStore::new(&path).initialize().unwrap_err();
        assert!(matches!(err, LedgerError::CorruptLedger { .. }));
        // untouched
        assert!(fs::read_to_string(&path).unwrap().contains("Payee"));
    }

    #[test]
    fn test_add_assigns_ids_and_two_decimals() {
        let (_td, store) = store();
        assert_eq!(store.add_transaction(10.0, "Gift", day(1), "Savings").unwrap(), 0);
        assert_eq!(store.add_transaction(-3.456, "Bus", day(2), "Transportation").unwrap(), 1);
        assert_eq!(store.add_transaction(7.1, "Refund", day(3), "Miscellaneous").unwrap(), 2);

        let txns = store.read_transactions().unwrap();
        let amounts: Vec<&str> = txns.iter().map(|t| t.amount.as_str()).collect();
        assert_eq!(amounts, ["10.00", "-3.46", "7.10"]);
        assert_eq!(txns[1].date, "2024-03-02");
        assert_eq!(txns.iter().map(|t| t.id).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn test_add_uses_max_plus_one() {
        let (_td, store) = store();
        for i in 0..3 {
            store.add_transaction(i as f64, "x", day(1), "Savings").unwrap();
        }
        store.remove_transaction(1).unwrap();
        // no renumber: ids are 0, 2
        assert_eq!(store.add_transaction(1.0, "y", day(1), "Savings").unwrap(), 3);
    }

    #[test]
    fn test_edit_fields() {
        let (_td, store) = store();
        store.add_transaction(-20.0, "Lunch", day(1), "Dining").unwrap();

        assert!(store.edit_transaction(0, EditField::Amount, "-25").unwrap());
        assert!(store.edit_transaction(0, EditField::Date, "15/04/2024").unwrap());
        assert!(store.edit_transaction(0, EditField::Description, "Team lunch").unwrap());
        assert!(store.edit_transaction(0, EditField::Category, "Entertainment").unwrap());

        let t = &store.read_transactions().unwrap()[0];
        assert_eq!(t.amount, "-25.00");
        assert_eq!(t.date, "2024-04-15");
        assert_eq!(t.description, "Team lunch");
        assert_eq!(t.category, "Entertainment");
    }

    #[test]
    fn test_failed_edit_leaves_file_byte_identical() {
        let (_td, store) = store();
        store.add_transaction(-20.0, "Lunch", day(1), "Dining").unwrap();
        let before = fs::read(store.path()).unwrap();

        assert!(!store.edit_transaction(9, EditField::Description, "x").unwrap());
        assert!(!store.edit_transaction(0, EditField::Date, "2024-04-15").unwrap());
        assert!(!store.edit_transaction(0, EditField::Amount, "lots").unwrap());

        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_remove_then_renumber_is_dense() {
        let (_td, store) = store();
        for name in ["a", "b", "c", "d"] {
            store.add_transaction(1.0, name, day(1), "Savings").unwrap();
        }
        assert!(store.remove_transaction(1).unwrap());
        assert!(!store.remove_transaction(1).unwrap());
        store.renumber_ids().unwrap();

        let txns = store.read_transactions().unwrap();
        let pairs: Vec<(u64, &str)> = txns.iter().map(|t| (t.id, t.description.as_str())).collect();
        assert_eq!(pairs, [(0, "a"), (1, "c"), (2, "d")]);
    }

    #[test]
    fn test_renumber_is_idempotent() {
        let (_td, store) = store();
        for name in ["a", "b", "c"] {
            store.add_transaction(1.0, name, day(1), "Savings").unwrap();
        }
        store.remove_transaction(0).unwrap();
        store.renumber_ids().unwrap();
        let once = fs::read(store.path()).unwrap();
        store.renumber_ids().unwrap();
        assert_eq!(fs::read(store.path()).unwrap(), once);
    }

    #[test]
    fn test_quoted_fields_survive_rewrite() {
        let (_td, store) = store();
        store
            .add_transaction(-5.0, "Coffee, \"large\"", day(1), "Dining")
            .unwrap();
        store.renumber_ids().unwrap();
        assert_eq!(
            store.read_transactions().unwrap()[0].description,
            "Coffee, \"large\""
        );
    }
}
