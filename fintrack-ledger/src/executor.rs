//! Single funnel that applies a [`Command`] to the ledger and category files.

use std::collections::HashSet;
use std::fmt;

use fintrack_core::time::parse_display_date;
use fintrack_core::{CategoryAction, Command, CommandError, EditField, WireCommand, parse_amount};

use crate::categories::CategoryRegistry;
use crate::error::{LedgerError, Result};
use crate::store::LedgerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingArgument,
    InvalidArgument,
    InvalidDate,
    InvalidAmount,
    InvalidCategory,
    NotFound,
    UnknownCommand,
}

impl ErrorKind {
    /// Title shown above the message.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::MissingArgument => "Missing Argument",
            ErrorKind::InvalidArgument => "Invalid Argument",
            ErrorKind::InvalidDate => "Invalid Date",
            ErrorKind::InvalidAmount => "Invalid Amount",
            ErrorKind::InvalidCategory => "Invalid Category",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::UnknownCommand => "Unknown Command",
        }
    }
}

/// Result classification of one executed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(String),
    PartialSuccess { message: String, failed_ids: Vec<i64> },
    /// Nothing to do, but nothing wrong either (e.g. removing a category
    /// that does not exist).
    Unsuccessful(String),
    Error { kind: ErrorKind, message: String },
}

impl Outcome {
    fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Outcome::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(m) | Outcome::Unsuccessful(m) => f.write_str(m),
            Outcome::PartialSuccess { message, .. } => f.write_str(message),
            Outcome::Error { kind, message } => write!(f, "{}: {}", kind.title(), message),
        }
    }
}

impl From<CommandError> for Outcome {
    fn from(e: CommandError) -> Self {
        let kind = match e {
            CommandError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            CommandError::MissingArgument(_) => ErrorKind::MissingArgument,
            CommandError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        };
        Outcome::error(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorPolicy {
    /// Reject `add` with a category that is not in the registry.
    pub strict_categories: bool,
}

impl Default for ExecutorPolicy {
    fn default() -> Self {
        Self {
            strict_categories: true,
        }
    }
}

pub struct Executor<'a> {
    store: &'a LedgerStore,
    categories: &'a CategoryRegistry,
    policy: ExecutorPolicy,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a LedgerStore, categories: &'a CategoryRegistry, policy: ExecutorPolicy) -> Self {
        Self {
            store,
            categories,
            policy,
        }
    }

    /// Convert a model-produced command and run it. Conversion failures are
    /// reported as outcomes, not errors.
    pub fn execute_wire(&self, wire: WireCommand) -> Result<Outcome> {
        match Command::try_from(wire) {
            Ok(cmd) => self.execute(&cmd),
            Err(e) => Ok(e.into()),
        }
    }

    /// Apply one command. Only storage failures are `Err`.
    pub fn execute(&self, command: &Command) -> Result<Outcome> {
        tracing::debug!(command = command.keyword(), "executing");
        match command {
            Command::Add {
                amount,
                description,
                date,
                category,
            } => self.add(*amount, description, date, category),
            Command::Category(action) => self.category(action),
            Command::Remove { ids } => self.remove(ids),
            Command::Edit { id, field, value } => self.edit(*id, *field, value),
        }
    }

    fn add(&self, amount: f64, description: &str, date: &str, category: &str) -> Result<Outcome> {
        if !amount.is_finite() {
            return Ok(Outcome::error(ErrorKind::InvalidAmount, format!("amount {amount} is not a number")));
        }
        let date = match parse_display_date(date) {
            Ok(d) => d,
            Err(e) => return Ok(Outcome::error(ErrorKind::InvalidDate, e.to_string())),
        };
        if self.policy.strict_categories && !self.categories.contains(category)? {
            return Ok(Outcome::error(
                ErrorKind::InvalidCategory,
                format!("'{category}' is not a known category"),
            ));
        }

        let id = self.store.add_transaction(amount, description, date, category)?;
        Ok(Outcome::Success(format!("Transaction {id} added successfully!")))
    }

    fn category(&self, action: &CategoryAction) -> Result<Outcome> {
        match action {
            CategoryAction::Reset => {
                self.categories.reset_to_default()?;
                Ok(Outcome::Success("Categories reset to default.".to_string()))
            }
            CategoryAction::Add(name) => match self.categories.add_category(name) {
                Ok(()) => Ok(Outcome::Success(format!("Category '{}' added.", name.trim()))),
                Err(LedgerError::InvalidCategoryName(n)) => Ok(Outcome::error(
                    ErrorKind::InvalidArgument,
                    format!("'{n}' is not a valid category name"),
                )),
                Err(e) => Err(e),
            },
            CategoryAction::Remove(name) => {
                if self.categories.remove_category(name)? {
                    Ok(Outcome::Success(format!("Category '{name}' removed.")))
                } else {
                    Ok(Outcome::Unsuccessful(format!("Category '{name}' not found.")))
                }
            }
        }
    }

    /// Every distinct ID is tried independently, in the order given; IDs are
    /// renumbered afterwards even if none were removed.
    fn remove(&self, ids: &[i64]) -> Result<Outcome> {
        if ids.is_empty() {
            return Ok(Outcome::error(ErrorKind::MissingArgument, "no transaction IDs given"));
        }
        let mut seen = HashSet::new();
        let ids: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut failed = Vec::new();
        for &id in &ids {
            let removed = match u64::try_from(id) {
                Ok(id) => self.store.remove_transaction(id)?,
                Err(_) => false,
            };
            if !removed {
                failed.push(id);
            }
        }
        self.store.renumber_ids()?;

        if failed.is_empty() {
            Ok(Outcome::Success(format!("Removed {} transaction(s).", ids.len())))
        } else {
            let list = failed.iter().map(i64::to_string).collect::<Vec<_>>().join(", ");
            Ok(Outcome::PartialSuccess {
                message: format!(
                    "Removed {} of {} transaction(s); failed IDs: {list}",
                    ids.len() - failed.len(),
                    ids.len()
                ),
                failed_ids: failed,
            })
        }
    }

    fn edit(&self, id: i64, field: EditField, value: &str) -> Result<Outcome> {
        match field {
            EditField::Amount if parse_amount(value).is_none() => {
                return Ok(Outcome::error(
                    ErrorKind::InvalidAmount,
                    format!("amount must be a number, got '{value}'"),
                ));
            }
            EditField::Date => {
                if let Err(e) = parse_display_date(value) {
                    return Ok(Outcome::error(ErrorKind::InvalidDate, e.to_string()));
                }
            }
            _ => {}
        }

        let edited = match u64::try_from(id) {
            Ok(id) => self.store.edit_transaction(id, field, value)?,
            Err(_) => false,
        };
        if !edited {
            return Ok(Outcome::error(
                ErrorKind::NotFound,
                format!("no transaction with ID {id}"),
            ));
        }

        self.store.renumber_ids()?;
        Ok(Outcome::Success(format!("Transaction {id} updated ({field}).")))
    }
}
