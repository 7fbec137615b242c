use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fintrack_core::{Translator, UnavailableTranslator, calculate_totals};
use fintrack_ledger::{CategoryRegistry, Clock, ExecutorPolicy, LedgerStore, Presenter, Session};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod llm;
mod presenter;
mod shell;
mod state;

use config::Config;
use presenter::{StdoutPresenter, transaction_table};
use shell::ShellView;
use state::DataPaths;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("FINTRACK_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "fintrack", version = VERSION, about = "Personal finance tracker with plain-English input")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive full-screen shell (default)
    Shell,

    /// Run one command line: strict syntax, falling back to the language model
    Run {
        /// e.g. add -12.5 "Lunch" 05/03/2024 "Dining"
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        line: Vec<String>,

        /// Strict syntax only; never call the language model
        #[arg(long)]
        strict: bool,

        /// Print the ledger and totals afterwards
        #[arg(long)]
        show: bool,
    },

    /// Describe what happened in plain English
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Print the ledger and totals afterwards
        #[arg(long)]
        show: bool,
    },

    /// Print all transactions
    List,

    /// Print income, expense and net totals
    Totals,

    /// Print the category list
    Categories,

    /// Write the default config and create the ledger and category files
    Init,

    /// Store API keys in ~/.fintrack/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste an OpenAI API key
    PasteOpenaiApiKey,

    /// Paste an Anthropic API key
    PasteAnthropicToken,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    init_logging(&cfg)?;
    tracing::info!(version = VERSION, "fintrack starting");

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let mut session = open_session(&cfg, build_translator(&cfg), ShellView::default())?;
            shell::run_shell(&mut session)?;
        }

        Command::Run { line, strict, show } => {
            let line = command_line(&line)?;
            let mut session = open_session(&cfg, build_translator(&cfg), StdoutPresenter::new(false))?;
            // after initialize, so only the post-command ledger is echoed
            session.presenter_mut().echo_ledger = show;
            if strict {
                session.submit_strict(&line)?;
            } else {
                session.submit_command_line(&line)?;
            }
            exit_status(session.presenter())?;
        }

        Command::Ask { text, show } => {
            let text = text.join(" ");
            let mut session = open_session(&cfg, build_translator(&cfg), StdoutPresenter::new(false))?;
            session.presenter_mut().echo_ledger = show;
            session.submit_natural_language(&text)?;
            exit_status(session.presenter())?;
        }

        Command::List => {
            let store = open_store(&cfg)?;
            print!("{}", transaction_table(&store.read_transactions()?));
        }

        Command::Totals => {
            let store = open_store(&cfg)?;
            println!("{}", calculate_totals(&store.read_transactions()?).summary());
        }

        Command::Categories => {
            let paths = DataPaths::load(&cfg)?;
            let categories = CategoryRegistry::new(paths.categories);
            categories.initialize()?;
            for c in categories.read_categories()? {
                println!("{c}");
            }
        }

        Command::Init => {
            if config::init_config()? {
                println!("Wrote {}", config::config_path()?.display());
            } else {
                println!("Config already exists: {}", config::config_path()?.display());
            }
            let cfg = config::load_config()?;
            let paths = DataPaths::load(&cfg)?;
            LedgerStore::new(&paths.transactions).initialize()?;
            CategoryRegistry::new(&paths.categories).initialize()?;
            println!("Ledger: {}", paths.transactions.display());
            println!("Categories: {}", paths.categories.display());
        }

        Command::Auth { command } => match command {
            AuthCommand::PasteOpenaiApiKey => auth::openai_paste_api_key()?,
            AuthCommand::PasteAnthropicToken => auth::anthropic_paste_token()?,
        },
    }

    Ok(())
}

/// `run 'remove 1 2'` arrives as one argument and is used as is. Several
/// arguments are re-quoted so descriptions with spaces survive the shell's
/// word splitting.
fn command_line(args: &[String]) -> Result<String> {
    match args {
        [one] => Ok(one.clone()),
        _ => shlex::try_join(args.iter().map(String::as_str)).context("quote command line"),
    }
}

/// Logs go to a file so the full-screen shell is left alone.
/// `RUST_LOG` overrides `[log] level`.
fn init_logging(cfg: &Config) -> Result<()> {
    let path = state::log_path()?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fintrack={level},fintrack_core={level},fintrack_ledger={level}",
            level = cfg.log.level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// The configured model, or a stand-in that explains why there is none.
fn build_translator(cfg: &Config) -> Box<dyn Translator> {
    match llm::LlmTranslator::from_config(&cfg.llm) {
        Ok(t) => {
            tracing::info!(provider = ?t.provider(), model = %cfg.llm.model, "language model ready");
            Box::new(t)
        }
        Err(e) => {
            tracing::warn!(error = %e, "natural-language input disabled");
            Box::new(UnavailableTranslator {
                reason: e.to_string(),
            })
        }
    }
}

fn open_session<P: Presenter>(
    cfg: &Config,
    translator: Box<dyn Translator>,
    presenter: P,
) -> Result<Session<Box<dyn Translator>, P>> {
    let paths = DataPaths::load(cfg)?;
    let mut session = Session::new(
        LedgerStore::new(paths.transactions),
        CategoryRegistry::new(paths.categories),
        translator,
        presenter,
    )
    .with_policy(ExecutorPolicy {
        strict_categories: cfg.ledger.strict_categories,
    })
    .with_clock(Clock::Zone(cfg.profile.timezone.clone()));
    session.initialize()?;
    Ok(session)
}

fn open_store(cfg: &Config) -> Result<LedgerStore> {
    let paths = DataPaths::load(cfg)?;
    let store = LedgerStore::new(paths.transactions);
    store.initialize()?;
    Ok(store)
}

fn exit_status(presenter: &StdoutPresenter) -> Result<()> {
    if presenter.failures > 0 {
        bail!("{} command(s) did not succeed", presenter.failures);
    }
    Ok(())
}
