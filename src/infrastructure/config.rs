//! Configuration management

use crate::domain::labels::HeadingLevel;
use crate::error::{FolioError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Mapping from a label category to the categories whose counters it zeroes.
pub type LabelResets = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Character that opens a tag
    pub tag_prefix: char,
    /// Nesting level at which parsing gives up
    pub tag_max_depth: usize,
    /// Tags whose content is kept as literal text
    pub verbatim_tags: Vec<String>,
    /// Separator between a doc_id and a label id ("intro::ch:start")
    pub label_sep: String,
    /// Counter reset table used by the ordering pass
    pub label_resets: LabelResets,
    /// How long the registration pass waits for its lock
    pub registration_timeout_ms: u64,
    /// Line number of the first line of a parsed string
    pub line_offset: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            tag_prefix: '@',
            tag_max_depth: 30,
            verbatim_tags: vec!["verb".to_string(), "verbatim".to_string()],
            label_sep: "::".to_string(),
            label_resets: Self::default_label_resets(),
            registration_timeout_ms: 50,
            line_offset: 1,
        }
    }
}

impl Settings {
    /// Each heading level resets the counters of every more specific level.
    pub fn default_label_resets() -> LabelResets {
        let mut resets = LabelResets::new();
        for (i, level) in HeadingLevel::ALL.iter().enumerate() {
            let below: BTreeSet<String> = HeadingLevel::ALL[i + 1..]
                .iter()
                .map(|l| l.name().to_string())
                .collect();
            if !below.is_empty() {
                resets.insert(level.name().to_string(), below);
            }
        }
        resets
    }

    /// Parse settings from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| FolioError::Config(format!("Failed to load {}: {}", path.display(), e)))
    }

    /// Reject values the parser and label manager cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.tag_prefix.is_alphanumeric()
            || self.tag_prefix.is_whitespace()
            || matches!(self.tag_prefix, '{' | '}' | '[' | ']' | '_')
        {
            return Err(FolioError::Config(format!(
                "Invalid tag_prefix: '{}'",
                self.tag_prefix
            )));
        }
        if self.tag_max_depth < 2 {
            return Err(FolioError::Config(
                "tag_max_depth must be at least 2".to_string(),
            ));
        }
        if self.label_sep.is_empty() {
            return Err(FolioError::Config("label_sep cannot be empty".to_string()));
        }
        Ok(())
    }
}
