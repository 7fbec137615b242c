//! Instructions sent to the language model, the response schema it must
//! follow, and decoding/review of what comes back.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::command::WireCommand;
use crate::time::{format_display, parse_display_date};
use crate::translator::{TranslationError, TranslationRequest};

/// Behavioural rules for the model.
pub fn build_system_prompt() -> String {
    "You are the command parser of a personal finance tracker. Convert the user's \
natural language input into a JSON object {\"commands\": [...]} holding the \
sequence of commands that achieves what the user asked, in the order they asked.

Guidelines:
- Output every date as DD/MM/YYYY.
- If the user does not give a date, use today's date from the context.
- Every add command must carry a description and a category. Categories MUST be \
taken from the list of available categories; never invent one. If nothing fits \
exactly, choose the closest available category.
- Capitalize the first letter of descriptions and categories.
- Money spent is always an expense: a negative amount. Money received is always \
income: a positive amount.
- If the user both spent money and received money, emit one add command for the \
expense and a separate add command for the income. Never net them into one amount.
- If the user gives one total for several items that cost the same, split the \
total evenly: one add command per item, each with total / number of items.
- If the user gives a total and also the individual amounts, add only the \
individual amounts, never the total.
- Requests to change, edit, fix or modify an existing transaction are always an \
edit command, never a remove followed by an add.
- Only use the \"amount\" field for add commands. For edit commands the new \
value goes in \"value\", even when the field being edited is the amount.
- Only fill the fields that belong to the command being emitted; leave every \
other field null.

Example 1:
User: I spent 200$ on groceries, 70$ in Walmart and 130$ in Costco.
Result: two add commands, -70 \"Walmart\" (Groceries) and -130 \"Costco\" (Groceries). \
No -200 command.

Example 2:
User: I spent 500$ on a new monitor, a new mouse and a new keyboard, they all cost the same.
Result: three add commands of -166.67 each: \"Monitor\", \"Mouse\", \"Keyboard\".

Example 3:
User: I paid 45 for dinner and my friend paid me back 20.
Result: two add commands, -45 \"Dinner\" (Dining) and 20 \"Repayment from friend\"."
        .to_string()
}

/// Per-call context: today's date, valid categories, current ledger.
pub fn build_context_prompt(request: &TranslationRequest) -> String {
    let categories = request
        .categories
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");

    let transactions = if request.transactions.is_empty() {
        "(no transactions yet)".to_string()
    } else {
        request
            .transactions
            .iter()
            .map(|t| t.snapshot_line())
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Context:\n\
- Today's date: {}\n\
- Available categories: [{}]\n\
- Current transactions:\n{}",
        format_display(request.today),
        categories,
        transactions
    )
}

/// Syntax of the four commands and where each argument belongs.
pub fn build_commands_prompt() -> String {
    "Supported commands:

1. add: adds an income (positive amount) or expense (negative amount).
   Fields: command=\"add\", amount, description, date (DD/MM/YYYY), category \
(one of the available categories).

2. category: manages categories.
   Fields: command=\"category\", action (\"add\", \"remove\" or \"reset\"), \
name (category name; not used for reset).

3. remove: removes one or more transactions by ID.
   Fields: command=\"remove\", unique_ids (list of IDs from the current transactions).

4. edit: changes one field of one transaction.
   Fields: command=\"edit\", unique_ids (a list with exactly one ID), field \
(\"amount\", \"description\", \"date\" or \"category\"), value (the new value as \
text; dates as DD/MM/YYYY).

Use only the fields listed for each command, in the places listed. Leave all \
other fields null."
        .to_string()
}

/// JSON schema of `{"commands": [WireCommand]}` in the strict form accepted
/// by structured-output APIs: every property listed, optional ones nullable.
pub fn response_schema() -> Value {
    let nullable = |ty: &str| json!({ "type": [ty, "null"] });
    json!({
        "type": "object",
        "properties": {
            "commands": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "command": { "type": "string", "enum": ["add", "category", "remove", "edit"] },
                        "name": nullable("string"),
                        "amount": nullable("number"),
                        "value": nullable("string"),
                        "description": nullable("string"),
                        "date": nullable("string"),
                        "action": { "type": ["string", "null"], "enum": ["add", "remove", "reset", null] },
                        "category": nullable("string"),
                        "field": { "type": ["string", "null"], "enum": ["amount", "description", "date", "category", null] },
                        "unique_ids": { "type": ["array", "null"], "items": { "type": "integer" } }
                    },
                    "required": [
                        "command", "name", "amount", "value", "description",
                        "date", "action", "category", "field", "unique_ids"
                    ],
                    "additionalProperties": false
                }
            }
        },
        "required": ["commands"],
        "additionalProperties": false
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Object { commands: Vec<WireCommand> },
    Bare(Vec<WireCommand>),
}

/// Decode the model's text into wire commands. Tolerates a surrounding
/// Markdown code fence; anything else that is not the expected JSON fails
/// the whole translation.
pub fn decode_response(text: &str) -> Result<Vec<WireCommand>, TranslationError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(TranslationError::InvalidResponse("empty response".to_string()));
    }
    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope::Object { commands }) | Ok(Envelope::Bare(commands)) => Ok(commands),
        Err(e) => Err(TranslationError::InvalidResponse(e.to_string())),
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // drop the info string ("json") up to the first newline
    let rest = rest.split_once('\n').map(|(_, r)| r).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Places where a model response drifted from the prompt contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractViolation {
    UnknownCommand { index: usize, command: String },
    DateFormat { index: usize, date: String },
    CategoryNotListed { index: usize, category: String },
    ExtraneousField { index: usize, field: &'static str },
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCommand { index, command } => {
                write!(f, "command #{index}: unknown command '{command}'")
            }
            Self::DateFormat { index, date } => {
                write!(f, "command #{index}: date '{date}' is not DD/MM/YYYY")
            }
            Self::CategoryNotListed { index, category } => {
                write!(f, "command #{index}: category '{category}' is not an available category")
            }
            Self::ExtraneousField { index, field } => {
                write!(f, "command #{index}: field '{field}' does not belong to this command")
            }
        }
    }
}

/// Check translated commands against the output contract. The executor
/// enforces what matters; this only reports drift.
pub fn review_commands(commands: &[WireCommand], request: &TranslationRequest) -> Vec<ContractViolation> {
    let mut out = Vec::new();

    for (index, c) in commands.iter().enumerate() {
        let kind = c.command.trim().to_ascii_lowercase();
        let allowed: &[&str] = match kind.as_str() {
            "add" => &["amount", "description", "date", "category"],
            "category" => &["action", "name"],
            "remove" => &["unique_ids"],
            "edit" => &["unique_ids", "field", "value"],
            _ => {
                out.push(ContractViolation::UnknownCommand {
                    index,
                    command: c.command.clone(),
                });
                continue;
            }
        };

        let present = [
            ("name", c.name.is_some()),
            ("amount", c.amount.is_some()),
            ("value", c.value.is_some()),
            ("description", c.description.is_some()),
            ("date", c.date.is_some()),
            ("action", c.action.is_some()),
            ("category", c.category.is_some()),
            ("field", c.field.is_some()),
            ("unique_ids", c.unique_ids.is_some()),
        ];
        for (field, is_set) in present {
            if is_set && !allowed.contains(&field) {
                out.push(ContractViolation::ExtraneousField { index, field });
            }
        }

        if let Some(date) = &c.date
            && parse_display_date(date).is_err()
        {
            out.push(ContractViolation::DateFormat {
                index,
                date: date.clone(),
            });
        }

        if kind == "add"
            && let Some(category) = &c.category
            && !request.categories.iter().any(|known| known == category)
        {
            out.push(ContractViolation::CategoryNotListed {
                index,
                category: category.clone(),
            });
        }
    }

    out
}
