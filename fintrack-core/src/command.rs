//! Command intermediate representation shared by the strict parser and the
//! natural-language translator.
//!
//! [`Command`] is what the executor runs. [`WireCommand`] is the flat JSON
//! shape exchanged with the language model; converting it reads only the
//! fields the command kind uses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transaction::format_amount;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        amount: f64,
        description: String,
        /// DD/MM/YYYY
        date: String,
        category: String,
    },
    Category(CategoryAction),
    Remove {
        ids: Vec<i64>,
    },
    Edit {
        id: i64,
        field: EditField,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryAction {
    Add(String),
    Remove(String),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditField {
    Amount,
    Description,
    Date,
    Category,
}

impl EditField {
    pub const ALL: [EditField; 4] = [
        EditField::Amount,
        EditField::Description,
        EditField::Date,
        EditField::Category,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EditField::Amount => "amount",
            EditField::Description => "description",
            EditField::Date => "date",
            EditField::Category => "category",
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditField {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EditField::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CommandError::InvalidArgument(format!("unknown field '{s}'")))
    }
}

impl Command {
    /// Keyword of the command kind, as used in both grammars.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Add { .. } => "add",
            Command::Category(_) => "category",
            Command::Remove { .. } => "remove",
            Command::Edit { .. } => "edit",
        }
    }
}

/// Flat command object as produced by the language model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// DD/MM/YYYY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_ids: Option<Vec<i64>>,
}

/// The reasons a wire command cannot become a [`Command`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

fn required(v: Option<String>, name: &'static str) -> Result<String, CommandError> {
    v.filter(|s| !s.trim().is_empty())
        .ok_or(CommandError::MissingArgument(name))
}

impl TryFrom<WireCommand> for Command {
    type Error = CommandError;

    fn try_from(w: WireCommand) -> Result<Self, Self::Error> {
        match w.command.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Command::Add {
                amount: w.amount.ok_or(CommandError::MissingArgument("amount"))?,
                description: required(w.description, "description")?,
                date: required(w.date, "date")?,
                category: required(w.category, "category")?,
            }),
            "category" => {
                let action = required(w.action, "action")?;
                match action.trim().to_ascii_lowercase().as_str() {
                    "add" => Ok(Command::Category(CategoryAction::Add(required(w.name, "name")?))),
                    "remove" => Ok(Command::Category(CategoryAction::Remove(required(
                        w.name, "name",
                    )?))),
                    "reset" => Ok(Command::Category(CategoryAction::Reset)),
                    other => Err(CommandError::InvalidArgument(format!(
                        "unknown category action '{other}'"
                    ))),
                }
            }
            "remove" => {
                let ids = w
                    .unique_ids
                    .filter(|ids| !ids.is_empty())
                    .ok_or(CommandError::MissingArgument("unique_ids"))?;
                Ok(Command::Remove { ids })
            }
            "edit" => {
                let ids = w
                    .unique_ids
                    .filter(|ids| !ids.is_empty())
                    .ok_or(CommandError::MissingArgument("unique_ids"))?;
                if ids.len() != 1 {
                    return Err(CommandError::InvalidArgument(format!(
                        "edit takes exactly one ID, got {}",
                        ids.len()
                    )));
                }
                let field: EditField = required(w.field, "field")?.parse()?;
                // Models sometimes put a new amount in `amount` instead of `value`.
                let value = match (w.value, field, w.amount) {
                    (Some(v), _, _) if !v.trim().is_empty() => v,
                    (_, EditField::Amount, Some(a)) => format_amount(a),
                    _ => return Err(CommandError::MissingArgument("value")),
                };
                Ok(Command::Edit {
                    id: ids[0],
                    field,
                    value,
                })
            }
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

impl From<&Command> for WireCommand {
    fn from(c: &Command) -> Self {
        let mut w = WireCommand {
            command: c.keyword().to_string(),
            ..Default::default()
        };
        match c {
            Command::Add {
                amount,
                description,
                date,
                category,
            } => {
                w.amount = Some(*amount);
                w.description = Some(description.clone());
                w.date = Some(date.clone());
                w.category = Some(category.clone());
            }
            Command::Category(action) => match action {
                CategoryAction::Add(name) => {
                    w.action = Some("add".to_string());
                    w.name = Some(name.clone());
                }
                CategoryAction::Remove(name) => {
                    w.action = Some("remove".to_string());
                    w.name = Some(name.clone());
                }
                CategoryAction::Reset => w.action = Some("reset".to_string()),
            },
            Command::Remove { ids } => w.unique_ids = Some(ids.clone()),
            Command::Edit { id, field, value } => {
                w.unique_ids = Some(vec![*id]);
                w.field = Some(field.as_str().to_string());
                w.value = Some(value.clone());
            }
        }
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(command: &str) -> WireCommand {
        WireCommand {
            command: command.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_add_ignores_extraneous_fields() {
        let w = WireCommand {
            amount: Some(-12.5),
            description: Some("Lunch".to_string()),
            date: Some("02/03/2024".to_string()),
            category: Some("Dining".to_string()),
            // not used by add
            field: Some("amount".to_string()),
            unique_ids: Some(vec![7]),
            name: Some("junk".to_string()),
            ..wire("add")
        };
        assert_eq!(
            Command::try_from(w).unwrap(),
            Command::Add {
                amount: -12.5,
                description: "Lunch".to_string(),
                date: "02/03/2024".to_string(),
                category: "Dining".to_string(),
            }
        );
    }

    #[test]
    fn test_add_missing_amount() {
        let w = WireCommand {
            description: Some("Lunch".to_string()),
            ..wire("add")
        };
        assert_eq!(
            Command::try_from(w),
            Err(CommandError::MissingArgument("amount"))
        );
    }

    #[test]
    fn test_category_actions() {
        let reset = WireCommand {
            action: Some("Reset".to_string()),
            name: Some("ignored".to_string()),
            ..wire("category")
        };
        assert_eq!(
            Command::try_from(reset).unwrap(),
            Command::Category(CategoryAction::Reset)
        );

        let add_no_name = WireCommand {
            action: Some("add".to_string()),
            ..wire("category")
        };
        assert_eq!(
            Command::try_from(add_no_name),
            Err(CommandError::MissingArgument("name"))
        );

        let bogus = WireCommand {
            action: Some("rename".to_string()),
            ..wire("category")
        };
        assert!(matches!(
            Command::try_from(bogus),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_remove_requires_ids() {
        assert_eq!(
            Command::try_from(wire("remove")),
            Err(CommandError::MissingArgument("unique_ids"))
        );
        let empty = WireCommand {
            unique_ids: Some(vec![]),
            ..wire("remove")
        };
        assert_eq!(
            Command::try_from(empty),
            Err(CommandError::MissingArgument("unique_ids"))
        );
    }

    #[test]
    fn test_edit_exactly_one_id() {
        let w = WireCommand {
            unique_ids: Some(vec![1, 2]),
            field: Some("description".to_string()),
            value: Some("x".to_string()),
            ..wire("edit")
        };
        assert!(matches!(
            Command::try_from(w),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_edit_amount_from_amount_field() {
        let w = WireCommand {
            unique_ids: Some(vec![3]),
            field: Some("amount".to_string()),
            amount: Some(-20.0),
            ..wire("edit")
        };
        assert_eq!(
            Command::try_from(w).unwrap(),
            Command::Edit {
                id: 3,
                field: EditField::Amount,
                value: "-20.00".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::try_from(wire("transfer")),
            Err(CommandError::UnknownCommand("transfer".to_string()))
        );
    }

    #[test]
    fn test_wire_from_command_only_relevant_fields() {
        let json = serde_json::to_value(WireCommand::from(&Command::Remove { ids: vec![1, 4] }))
            .unwrap();
        assert_eq!(json, serde_json::json!({"command": "remove", "unique_ids": [1, 4]}));
    }
}
