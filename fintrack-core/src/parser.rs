//! Strict command-line grammar.
//!
//! ```text
//! add <amount> "<description>" <DD/MM/YYYY> "<category>"
//! category <add|remove> "<name>"
//! category reset
//! remove <id> [<id> ...]
//! edit <id> <amount|description|date|category> <new value...>
//! ```
//!
//! Tokens follow shell quoting rules. Anything that does not match exactly is
//! a [`ParseError`].

use thiserror::Error;

use crate::command::{CategoryAction, Command, EditField};
use crate::time::{DateError, parse_display_date};
use crate::transaction::{format_amount, parse_amount};

pub const ADD_USAGE: &str = r#"add <amount> "<description>" <DD/MM/YYYY> "<category>""#;
pub const CATEGORY_USAGE: &str = r#"category <add|remove> "<name>"  |  category reset"#;
pub const REMOVE_USAGE: &str = "remove <id> [<id> ...]";
pub const EDIT_USAGE: &str = "edit <id> <amount|description|date|category> <new value>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("invalid command syntax: unbalanced quotes")]
    Tokenize,
    #[error("unknown command: {0}")]
    UnknownKeyword(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("amount must be a number, got '{0}'")]
    InvalidAmount(String),
    #[error("transaction ID must be an integer, got '{0}'")]
    InvalidId(String),
    #[error("{0}")]
    InvalidDate(#[from] DateError),
    #[error("category action must be add, remove or reset, got '{0}'")]
    InvalidAction(String),
    #[error("field must be amount, description, date or category, got '{0}'")]
    InvalidField(String),
}

impl ParseError {
    /// True when the input is not a strict command at all, as opposed to a
    /// strict command with bad arguments.
    pub fn is_no_match(&self) -> bool {
        matches!(self, ParseError::Empty | ParseError::UnknownKeyword(_))
    }
}

/// Parse one line into a [`Command`].
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let tokens = shlex::split(&escape_comment_marks(input)).ok_or(ParseError::Tokenize)?;
    let Some((keyword, args)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };

    match keyword.to_lowercase().as_str() {
        "add" => parse_add(args),
        "category" => parse_category(args),
        "remove" => parse_remove(args),
        "edit" => parse_edit(args),
        other => Err(ParseError::UnknownKeyword(other.to_string())),
    }
}

/// `shlex` drops everything from a word-initial `#` onwards. Here `#` is
/// plain text, so escape it wherever it would start a comment.
fn escape_comment_marks(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut quote: Option<char> = None;
    let mut word_start = true;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (None | Some('"'), '\\') => {
                out.push(c);
                out.extend(chars.next());
                word_start = false;
                continue;
            }
            (None, '\'' | '"') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '#') if word_start => out.push('\\'),
            _ => {}
        }
        out.push(c);
        word_start = quote.is_none() && c.is_whitespace();
    }
    out
}

fn parse_add(args: &[String]) -> Result<Command, ParseError> {
    let [amount, description, date, category] = args else {
        return Err(ParseError::Usage(ADD_USAGE));
    };
    let amount = parse_amount(amount).ok_or_else(|| ParseError::InvalidAmount(amount.clone()))?;
    parse_display_date(date)?;

    Ok(Command::Add {
        amount,
        description: description.clone(),
        date: date.trim().to_string(),
        category: category.clone(),
    })
}

fn parse_category(args: &[String]) -> Result<Command, ParseError> {
    let Some((action, rest)) = args.split_first() else {
        return Err(ParseError::Usage(CATEGORY_USAGE));
    };

    let action = match action.to_lowercase().as_str() {
        "reset" => {
            if !rest.is_empty() {
                return Err(ParseError::Usage(CATEGORY_USAGE));
            }
            return Ok(Command::Category(CategoryAction::Reset));
        }
        "add" => CategoryAction::Add,
        "remove" => CategoryAction::Remove,
        _ => return Err(ParseError::InvalidAction(action.clone())),
    };

    match rest {
        [name] if !name.trim().is_empty() => Ok(Command::Category(action(name.trim().to_string()))),
        _ => Err(ParseError::Usage(CATEGORY_USAGE)),
    }
}

fn parse_id(s: &str) -> Result<i64, ParseError> {
    s.trim()
        .parse()
        .map_err(|_| ParseError::InvalidId(s.to_string()))
}

fn parse_remove(args: &[String]) -> Result<Command, ParseError> {
    if args.is_empty() {
        return Err(ParseError::Usage(REMOVE_USAGE));
    }
    let ids = args
        .iter()
        .map(|a| parse_id(a))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::Remove { ids })
}

fn parse_edit(args: &[String]) -> Result<Command, ParseError> {
    let [id, field, value @ ..] = args else {
        return Err(ParseError::Usage(EDIT_USAGE));
    };
    if value.is_empty() {
        return Err(ParseError::Usage(EDIT_USAGE));
    }

    let id = parse_id(id)?;
    let field: EditField = field
        .parse()
        .map_err(|_| ParseError::InvalidField(field.clone()))?;
    let value = value.join(" ");

    let value = match field {
        EditField::Amount => {
            let amount = parse_amount(&value).ok_or(ParseError::InvalidAmount(value))?;
            format_amount(amount)
        }
        EditField::Date => {
            parse_display_date(&value)?;
            value.trim().to_string()
        }
        EditField::Description | EditField::Category => value,
    };

    Ok(Command::Edit { id, field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_ordinary_text() {
        assert_eq!(
            parse_command("edit 0 description Invoice #42 from Acme").unwrap(),
            Command::Edit {
                id: 0,
                field: EditField::Description,
                value: "Invoice #42 from Acme".to_string(),
            }
        );
        assert_eq!(
            parse_command(r#"add -5 "Coffee" 01/03/2024 #misc"#).unwrap(),
            Command::Add {
                amount: -5.0,
                description: "Coffee".to_string(),
                date: "01/03/2024".to_string(),
                category: "#misc".to_string(),
            }
        );
    }

    #[test]
    fn test_hash_inside_quotes_untouched() {
        assert_eq!(escape_comment_marks(r##"add 1 "# one" x 'y #'"##), r##"add 1 "# one" x 'y #'"##);
        assert_eq!(escape_comment_marks(r"a \#b #c"), r"a \#b \#c");
    }

    #[test]
    fn test_parse_add_quoted() {
        let cmd = parse_command(r#"add 100 "Paycheck" 01/03/2024 "Salary""#).unwrap();
        assert_eq!(
            cmd,
            Command::Add {
                amount: 100.0,
                description: "Paycheck".to_string(),
                date: "01/03/2024".to_string(),
                category: "Salary".to_string(),
            }
        );
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let cmd = parse_command(r#"ADD -4.5 "Coffee and cake" 02/03/2024 Dining"#).unwrap();
        assert!(matches!(cmd, Command::Add { amount, .. } if amount == -4.5));
    }

    #[test]
    fn test_add_errors_are_distinct() {
        assert_eq!(
            parse_command("add 10 Lunch 01/03/2024"),
            Err(ParseError::Usage(ADD_USAGE))
        );
        assert_eq!(
            parse_command("add ten Lunch 01/03/2024 Dining"),
            Err(ParseError::InvalidAmount("ten".to_string()))
        );
        assert!(matches!(
            parse_command("add 10 Lunch 2024-03-01 Dining"),
            Err(ParseError::InvalidDate(DateError::Format(_)))
        ));
    }

    #[test]
    fn test_unbalanced_quotes() {
        let err = parse_command(r#"add 10 "Lunch 01/03/2024 Dining"#).unwrap_err();
        assert_eq!(err, ParseError::Tokenize);
        assert!(!err.is_no_match());
    }

    #[test]
    fn test_no_match() {
        assert!(parse_command("").unwrap_err().is_no_match());
        assert!(parse_command("   ").unwrap_err().is_no_match());
        let err = parse_command("I spent 20 on lunch").unwrap_err();
        assert_eq!(err, ParseError::UnknownKeyword("i".to_string()));
        assert!(err.is_no_match());
    }

    #[test]
    fn test_category() {
        assert_eq!(
            parse_command("category reset").unwrap(),
            Command::Category(CategoryAction::Reset)
        );
        assert_eq!(
            parse_command(r#"category add "Pet Care""#).unwrap(),
            Command::Category(CategoryAction::Add("Pet Care".to_string()))
        );
        assert_eq!(
            parse_command("category remove"),
            Err(ParseError::Usage(CATEGORY_USAGE))
        );
        assert_eq!(
            parse_command("category rename Food"),
            Err(ParseError::InvalidAction("rename".to_string()))
        );
    }

    #[test]
    fn test_remove_many() {
        assert_eq!(
            parse_command("remove 3 1 -2").unwrap(),
            Command::Remove { ids: vec![3, 1, -2] }
        );
        assert_eq!(
            parse_command("remove 3 x"),
            Err(ParseError::InvalidId("x".to_string()))
        );
        assert_eq!(parse_command("remove"), Err(ParseError::Usage(REMOVE_USAGE)));
    }

    #[test]
    fn test_edit_joins_value() {
        assert_eq!(
            parse_command("edit 2 description Weekly groceries run").unwrap(),
            Command::Edit {
                id: 2,
                field: EditField::Description,
                value: "Weekly groceries run".to_string(),
            }
        );
    }

    #[test]
    fn test_edit_typed_values() {
        assert_eq!(
            parse_command("edit 0 amount -12.5").unwrap(),
            Command::Edit {
                id: 0,
                field: EditField::Amount,
                value: "-12.50".to_string(),
            }
        );
        assert_eq!(
            parse_command("edit 0 amount lots"),
            Err(ParseError::InvalidAmount("lots".to_string()))
        );
        assert!(matches!(
            parse_command("edit 0 date 2024/03/01"),
            Err(ParseError::InvalidDate(_))
        ));
        assert_eq!(
            parse_command("edit 0 colour red"),
            Err(ParseError::InvalidField("colour".to_string()))
        );
        assert_eq!(parse_command("edit 0 amount"), Err(ParseError::Usage(EDIT_USAGE)));
    }
}
