use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// `$FINTRACK_HOME`, or `~/.fintrack`.
pub fn fintrack_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("FINTRACK_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".fintrack"))
}

pub fn ensure_fintrack_home() -> Result<PathBuf> {
    let dir = fintrack_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn log_path() -> Result<PathBuf> {
    Ok(ensure_fintrack_home()?.join("fintrack.log"))
}

/// Where the ledger and category files live for a given config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub transactions: PathBuf,
    pub categories: PathBuf,
}

impl DataPaths {
    pub fn resolve(home: &Path, cfg: &Config) -> Self {
        Self {
            transactions: under(home, &cfg.ledger.transactions_file),
            categories: under(home, &cfg.ledger.categories_file),
        }
    }

    pub fn load(cfg: &Config) -> Result<Self> {
        Ok(Self::resolve(&ensure_fintrack_home()?, cfg))
    }
}

// Relative names are taken from the home dir; absolute paths are kept.
fn under(home: &Path, name: &str) -> PathBuf {
    let p = Path::new(name);
    if p.is_absolute() { p.to_path_buf() } else { home.join(p) }
}
