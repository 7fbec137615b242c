//! Natural-language translation contract.
//!
//! A [`Translator`] turns free text into an ordered sequence of wire
//! commands. The concrete model binding lives in the binary; everything the
//! core needs to know about it is here and in [`crate::prompt`].

use chrono::NaiveDate;
use thiserror::Error;

use crate::command::WireCommand;
use crate::transaction::Transaction;

/// Everything the model is told besides the user's words.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub utterance: String,
    pub today: NaiveDate,
    pub categories: Vec<String>,
    pub transactions: Vec<Transaction>,
}

/// A translation either yields a whole sequence or fails as one unit.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("no language model configured: {0}")]
    NotConfigured(String),
    #[error("model request failed: {0}")]
    Request(String),
    #[error("model request timed out")]
    Timeout,
    #[error("model returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model response was not a command sequence: {0}")]
    InvalidResponse(String),
}

pub trait Translator {
    fn translate(&self, request: &TranslationRequest) -> Result<Vec<WireCommand>, TranslationError>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(&self, request: &TranslationRequest) -> Result<Vec<WireCommand>, TranslationError> {
        (**self).translate(request)
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate(&self, request: &TranslationRequest) -> Result<Vec<WireCommand>, TranslationError> {
        (**self).translate(request)
    }
}

/// Stand-in used when no model is configured: every translation fails with
/// the reason it was given.
#[derive(Debug, Clone)]
pub struct UnavailableTranslator {
    pub reason: String,
}

impl Translator for UnavailableTranslator {
    fn translate(&self, _request: &TranslationRequest) -> Result<Vec<WireCommand>, TranslationError> {
        Err(TranslationError::NotConfigured(self.reason.clone()))
    }
}
