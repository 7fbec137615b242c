//! Composition of the two command front ends with the executor.
//!
//! A line of input is first tried against the strict grammar; if that fails
//! it goes to the [`Translator`]. Every resulting command runs to completion
//! (file rewrite and renumbering included) before the next one starts. There
//! is no rollback: a failure halfway leaves earlier commands committed.

use chrono::{NaiveDate, Utc};
use fintrack_core::prompt::review_commands;
use fintrack_core::time::today_in;
use fintrack_core::{
    Command, Totals, Transaction, TranslationRequest, Translator, WireCommand, calculate_totals,
    parse_command,
};

use crate::categories::{CategoryInit, CategoryRegistry};
use crate::error::Result;
use crate::executor::{Executor, ExecutorPolicy, Outcome};
use crate::store::LedgerStore;

/// The UI seam: how the session reports back.
pub trait Presenter {
    fn show_success(&mut self, message: &str);
    fn show_error(&mut self, title: &str, message: &str);
    fn render_transactions(&mut self, transactions: &[Transaction]);
    fn render_totals(&mut self, totals: Totals);
}

/// Source of "today" for the translator context.
#[derive(Debug, Clone)]
pub enum Clock {
    /// Current date in an IANA timezone.
    Zone(String),
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::Fixed(d) => *d,
            Clock::Zone(tz) => today_in(tz).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to UTC date");
                Utc::now().date_naive()
            }),
        }
    }
}

pub struct Session<T, P> {
    store: LedgerStore,
    categories: CategoryRegistry,
    policy: ExecutorPolicy,
    translator: T,
    presenter: P,
    clock: Clock,
}

impl<T: Translator, P: Presenter> Session<T, P> {
    pub fn new(store: LedgerStore, categories: CategoryRegistry, translator: T, presenter: P) -> Self {
        Self {
            store,
            categories,
            policy: ExecutorPolicy::default(),
            translator,
            presenter,
            clock: Clock::Zone("UTC".to_string()),
        }
    }

    pub fn with_policy(mut self, policy: ExecutorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Make sure both files exist and are well formed, then render.
    pub fn initialize(&mut self) -> Result<()> {
        self.store.initialize()?;
        if self.categories.initialize()? == CategoryInit::Healed {
            self.presenter.show_error(
                "Categories",
                "The categories file was malformed and has been reset to the default list.",
            );
        }
        self.refresh()
    }

    /// Re-read the ledger and push it and its totals to the presenter.
    pub fn refresh(&mut self) -> Result<()> {
        let transactions = self.store.read_transactions()?;
        self.presenter.render_transactions(&transactions);
        self.presenter.render_totals(calculate_totals(&transactions));
        Ok(())
    }

    /// Strict grammar first, natural-language translation as fallback.
    pub fn submit_command_line(&mut self, text: &str) -> Result<Vec<Outcome>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        match parse_command(text) {
            Ok(cmd) => self.run_command(&cmd),
            Err(e) => {
                tracing::debug!(error = %e, "not a strict command; translating");
                let diagnostic = (!e.is_no_match()).then(|| e.to_string());
                self.translate_and_run(text, diagnostic.as_deref())
            }
        }
    }

    /// Strict grammar only; a parse error is reported as is.
    pub fn submit_strict(&mut self, text: &str) -> Result<Vec<Outcome>> {
        match parse_command(text) {
            Ok(cmd) => self.run_command(&cmd),
            Err(e) => {
                self.presenter.show_error("Command Error", &e.to_string());
                Ok(Vec::new())
            }
        }
    }

    /// Translator only.
    pub fn submit_natural_language(&mut self, text: &str) -> Result<Vec<Outcome>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        self.translate_and_run(text, None)
    }

    fn run_command(&mut self, cmd: &Command) -> Result<Vec<Outcome>> {
        let outcome = Executor::new(&self.store, &self.categories, self.policy).execute(cmd)?;
        self.report(&outcome);
        self.refresh()?;
        Ok(vec![outcome])
    }

    fn translation_request(&self, utterance: &str) -> Result<TranslationRequest> {
        Ok(TranslationRequest {
            utterance: utterance.to_string(),
            today: self.clock.today(),
            categories: self.categories.read_categories()?,
            transactions: self.store.read_transactions()?,
        })
    }

    fn translate_and_run(&mut self, text: &str, diagnostic: Option<&str>) -> Result<Vec<Outcome>> {
        let request = self.translation_request(text)?;
        let commands = match self.translator.translate(&request) {
            Ok(commands) => commands,
            Err(e) => {
                tracing::warn!(error = %e, "translation failed");
                let mut message = format!("Could not interpret the input: {e}");
                if let Some(d) = diagnostic {
                    message.push_str(&format!("\nCommand error: {d}"));
                }
                self.presenter.show_error("Translation Error", &message);
                return Ok(Vec::new());
            }
        };

        for v in review_commands(&commands, &request) {
            tracing::warn!(violation = %v, "translated command drifted from the prompt contract");
        }

        if commands.is_empty() {
            self.presenter
                .show_error("Translation Error", "No commands were found in the input.");
            return Ok(Vec::new());
        }

        tracing::info!(count = commands.len(), "executing translated commands");
        self.run_wire_sequence(commands)
    }

    /// Execute in order; each command commits before the next one starts.
    /// A storage error stops the sequence, but the view still shows what the
    /// earlier commands committed.
    fn run_wire_sequence(&mut self, commands: Vec<WireCommand>) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::with_capacity(commands.len());
        for wire in commands {
            match Executor::new(&self.store, &self.categories, self.policy).execute_wire(wire) {
                Ok(outcome) => {
                    self.report(&outcome);
                    outcomes.push(outcome);
                }
                Err(e) => {
                    tracing::error!(error = %e, done = outcomes.len(), "sequence aborted");
                    if let Err(refresh) = self.refresh() {
                        tracing::warn!(error = %refresh, "refresh after abort failed");
                    }
                    return Err(e);
                }
            }
        }
        self.refresh()?;
        Ok(outcomes)
    }

    fn report(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Success(m) => self.presenter.show_success(m),
            Outcome::PartialSuccess { message, .. } => {
                self.presenter.show_error("Partial Success", message)
            }
            Outcome::Unsuccessful(m) => self.presenter.show_error("Unsuccessful", m),
            Outcome::Error { kind, message } => self.presenter.show_error(kind.title(), message),
        }
    }
}
