use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_fintrack_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub ledger: LedgerSection,
    pub profile: ProfileSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSection {
    /// "openai" or "anthropic"
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.0,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerSection {
    pub transactions_file: String,
    pub categories_file: String,
    /// Reject `add` with a category that is not registered.
    pub strict_categories: bool,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            transactions_file: "transactions.csv".to_string(),
            categories_file: "categories.txt".to_string(),
            strict_categories: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileSection {
    /// IANA name, used for "today".
    pub timezone: String,
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_fintrack_home()?.join("config.toml"))
}

pub fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Write the default config unless one exists. Returns whether it wrote.
pub fn init_config() -> Result<bool> {
    let p = config_path()?;
    if p.exists() {
        return Ok(false);
    }
    save_config(&Config::default())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(parse_config("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = parse_config(
            r#"
[llm]
provider = "anthropic"
model = "claude-3-5-haiku-latest"

[ledger]
strict_categories = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.llm.provider, "anthropic");
        assert_eq!(cfg.llm.timeout_secs, 30);
        assert!(!cfg.ledger.strict_categories);
        assert_eq!(cfg.ledger.transactions_file, "transactions.csv");
        assert_eq!(cfg.profile.timezone, "UTC");
    }

    #[test]
    fn defaults_survive_a_toml_round_trip() {
        let s = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(s.contains("[ledger]"));
        assert_eq!(parse_config(&s).unwrap(), Config::default());
    }

    #[test]
    fn bad_types_are_reported() {
        assert!(parse_config("[llm]\ntimeout_secs = \"soon\"").is_err());
    }
}
