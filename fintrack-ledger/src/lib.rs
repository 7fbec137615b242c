//! fintrack-ledger: transaction ledger, category registry, command executor
//! and the session that ties the command front ends together

pub mod categories;
pub mod error;
pub mod executor;
pub mod session;
pub mod store;

pub use categories::{CategoryInit, CategoryRegistry, DEFAULT_CATEGORIES};
pub use error::{LedgerError, Result};
pub use executor::{ErrorKind, Executor, ExecutorPolicy, Outcome};
pub use session::{Clock, Presenter, Session};
pub use store::LedgerStore;
