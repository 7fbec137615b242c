//! fintrack-core: command model, strict parser, translation contract and
//! ledger value types for the fintrack personal finance tracker

pub mod command;
pub mod parser;
pub mod prompt;
pub mod time;
pub mod totals;
pub mod transaction;
pub mod translator;

pub use command::{CategoryAction, Command, CommandError, EditField, WireCommand};
pub use parser::{ParseError, parse_command};
pub use prompt::{ContractViolation, decode_response, review_commands};
pub use time::DateError;
pub use totals::{Totals, calculate_totals};
pub use transaction::{LEDGER_HEADERS, Transaction, format_amount, parse_amount};
pub use translator::{TranslationError, TranslationRequest, Translator, UnavailableTranslator};
