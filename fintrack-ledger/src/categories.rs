//! Category registry backed by a text file, one name per line.
//!
//! The file is self-healing: if any line is blank, [`CategoryRegistry::initialize`]
//! replaces the whole file with [`DEFAULT_CATEGORIES`]. The discarded content
//! is kept next to it as `<file>.invalid`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Groceries",
    "Rent",
    "Utilities",
    "Transportation",
    "Entertainment",
    "Dining",
    "Savings",
    "Investments",
    "Medical",
    "Miscellaneous",
];

/// What `initialize` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryInit {
    Created,
    Valid,
    Healed,
}

#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    path: PathBuf,
}

impl CategoryRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn initialize(&self) -> Result<CategoryInit> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(LedgerError::io(parent))?;
            }
            self.reset_to_default()?;
            return Ok(CategoryInit::Created);
        }

        let content = fs::read_to_string(&self.path).map_err(LedgerError::io(&self.path))?;
        if is_valid_content(&content) {
            return Ok(CategoryInit::Valid);
        }

        let quarantine = invalid_path(&self.path);
        fs::write(&quarantine, &content).map_err(LedgerError::io(&quarantine))?;
        tracing::warn!(
            path = %self.path.display(),
            saved_as = %quarantine.display(),
            "category file malformed; reset to defaults"
        );
        self.reset_to_default()?;
        Ok(CategoryInit::Healed)
    }

    pub fn read_categories(&self) -> Result<Vec<String>> {
        let content = fs::read_to_string(&self.path).map_err(LedgerError::io(&self.path))?;
        Ok(content.lines().map(|l| l.trim().to_string()).collect())
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.read_categories()?.iter().any(|c| c == name))
    }

    /// Add `name` unless it is already present.
    pub fn add_category(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() || name.contains(['\n', '\r']) {
            return Err(LedgerError::InvalidCategoryName(name.to_string()));
        }
        let mut categories = self.read_categories()?;
        if categories.iter().any(|c| c == name) {
            return Ok(());
        }
        categories.push(name.to_string());
        self.write_all(&categories)?;
        tracing::info!(category = name, "category added");
        Ok(())
    }

    /// Returns `false` if `name` was not present.
    pub fn remove_category(&self, name: &str) -> Result<bool> {
        let mut categories = self.read_categories()?;
        let Some(pos) = categories.iter().position(|c| c == name.trim()) else {
            return Ok(false);
        };
        categories.remove(pos);
        self.write_all(&categories)?;
        tracing::info!(category = name, "category removed");
        Ok(true)
    }

    pub fn reset_to_default(&self) -> Result<()> {
        self.write_all(&DEFAULT_CATEGORIES.map(String::from))?;
        tracing::info!("categories reset to defaults");
        Ok(())
    }

    fn write_all(&self, categories: &[String]) -> Result<()> {
        let mut out = String::new();
        for c in categories {
            out.push_str(c);
            out.push('\n');
        }
        fs::write(&self.path, out).map_err(LedgerError::io(&self.path))
    }
}

/// Valid iff every line, trimmed, is non-empty. An empty file is a valid
/// empty registry.
pub fn is_valid_content(content: &str) -> bool {
    content.lines().all(|l| {
        let l = l.trim();
        !l.is_empty() && !l.contains(['\n', '\r'])
    })
}

fn invalid_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".invalid");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> (TempDir, CategoryRegistry) {
        let td = TempDir::new().unwrap();
        let reg = CategoryRegistry::new(td.path().join("categories.txt"));
        (td, reg)
    }

    #[test]
    fn test_created_with_defaults() {
        let (_td, reg) = registry();
        assert_eq!(reg.initialize().unwrap(), CategoryInit::Created);
        assert_eq!(reg.read_categories().unwrap(), DEFAULT_CATEGORIES);
        assert_eq!(reg.initialize().unwrap(), CategoryInit::Valid);
    }

    #[test]
    fn test_blank_line_heals_to_defaults() {
        let (td, reg) = registry();
        fs::write(reg.path(), "Food\n\nTravel\n").unwrap();
        assert_eq!(reg.initialize().unwrap(), CategoryInit::Healed);
        assert_eq!(reg.read_categories().unwrap(), DEFAULT_CATEGORIES);
        assert_eq!(
            fs::read_to_string(td.path().join("categories.txt.invalid")).unwrap(),
            "Food\n\nTravel\n"
        );
    }

    #[test]
    fn test_whitespace_only_line_is_blank() {
        assert!(!is_valid_content("Food\n   \nTravel"));
        assert!(!is_valid_content("Food\r\n\r\nTravel"));
        assert!(is_valid_content("Food\nTravel\n"));
        assert!(is_valid_content(""));
    }

    #[test]
    fn test_add_is_idempotent() {
        let (_td, reg) = registry();
        reg.initialize().unwrap();
        reg.add_category("Pets").unwrap();
        reg.add_category("Pets").unwrap();
        let cats = reg.read_categories().unwrap();
        assert_eq!(cats.iter().filter(|c| *c == "Pets").count(), 1);
        assert_eq!(cats.last().map(String::as_str), Some("Pets"));
        // the file stays valid after appends
        assert_eq!(reg.initialize().unwrap(), CategoryInit::Valid);
    }

    #[test]
    fn test_add_rejects_bad_names() {
        let (_td, reg) = registry();
        reg.initialize().unwrap();
        assert!(matches!(
            reg.add_category("  "),
            Err(LedgerError::InvalidCategoryName(_))
        ));
        assert!(matches!(
            reg.add_category("Two\nLines"),
            Err(LedgerError::InvalidCategoryName(_))
        ));
    }

    #[test]
    fn test_remove_and_reset() {
        let (_td, reg) = registry();
        reg.initialize().unwrap();
        assert!(reg.remove_category("Rent").unwrap());
        assert!(!reg.remove_category("Rent").unwrap());
        assert!(!reg.contains("Rent").unwrap());
        reg.reset_to_default().unwrap();
        assert!(reg.contains("Rent").unwrap());
    }

    #[test]
    fn test_remove_all_leaves_valid_empty_registry() {
        let (_td, reg) = registry();
        reg.initialize().unwrap();
        for c in DEFAULT_CATEGORIES {
            reg.remove_category(c).unwrap();
        }
        assert_eq!(reg.initialize().unwrap(), CategoryInit::Valid);
        assert!(reg.read_categories().unwrap().is_empty());
    }
}
