use fintrack_core::{Totals, Transaction};
use fintrack_ledger::Presenter;

/// One line per transaction, as shown by `list` and the shell panes.
pub fn transaction_row(t: &Transaction) -> String {
    format!(
        "{:>4}  {}  {:>10}  {}  [{}]",
        t.id,
        t.display_date(),
        t.amount,
        t.description,
        t.category
    )
}

pub fn transaction_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "(no transactions)".to_string();
    }
    let mut out = format!("{:>4}  {:<10}  {:>10}  {}\n", "ID", "Date", "Amount", "Description [Category]");
    for t in transactions {
        out.push_str(&transaction_row(t));
        out.push('\n');
    }
    out
}

/// Presenter for the one-shot subcommands. Outcomes go to stdout/stderr;
/// the ledger is only echoed with `--show`.
#[derive(Debug, Default)]
pub struct StdoutPresenter {
    pub echo_ledger: bool,
    pub failures: usize,
}

impl StdoutPresenter {
    pub fn new(echo_ledger: bool) -> Self {
        Self {
            echo_ledger,
            failures: 0,
        }
    }
}

impl Presenter for StdoutPresenter {
    fn show_success(&mut self, message: &str) {
        println!("{message}");
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.failures += 1;
        eprintln!("{title}: {message}");
    }

    fn render_transactions(&mut self, transactions: &[Transaction]) {
        if self.echo_ledger {
            print!("{}", transaction_table(transactions));
        }
    }

    fn render_totals(&mut self, totals: Totals) {
        if self.echo_ledger {
            println!("{}", totals.summary());
        }
    }
}
