use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// User preferences that shape aggregation. Passed explicitly to the filter
/// step; there is no process-wide settings state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Inflows whose sender contains any of these (case-insensitive) are hidden.
    pub excluded_income_terms: BTreeSet<String>,
    /// Outflows whose recipient contains any of these (case-insensitive) are hidden.
    pub excluded_expense_terms: BTreeSet<String>,
}

impl Settings {
    /// Missing file means defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Returns `false` for blank or already present terms.
    pub fn add_income_exclusion(&mut self, term: &str) -> bool {
        insert_term(&mut self.excluded_income_terms, term)
    }

    pub fn add_expense_exclusion(&mut self, term: &str) -> bool {
        insert_term(&mut self.excluded_expense_terms, term)
    }

    pub fn remove_income_exclusion(&mut self, term: &str) -> bool {
        self.excluded_income_terms.remove(term.trim())
    }

    pub fn remove_expense_exclusion(&mut self, term: &str) -> bool {
        self.excluded_expense_terms.remove(term.trim())
    }
}

fn insert_term(set: &mut BTreeSet<String>, term: &str) -> bool {
    let term = term.trim();
    !term.is_empty() && set.insert(term.to_string())
}
