//! The UIDL reference grammar handed to the model as an example of
//! the document to produce. The text is opaque: it is loaded once at
//! startup and embedded in prompts as is.

use std::fs;

use anyhow::{Context, Result};

use crate::core::AppConfig;

const BUNDLED_GRAMMAR: &str = include_str!("../../grammar/uidl.yaml");

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceGrammar {
    version: String,
    text: String,
}

impl ReferenceGrammar {
    pub fn new(version: &str, text: &str) -> Self {
        Self {
            version: version.to_string(),
            text: text.to_string(),
        }
    }

    /// The grammar shipped with the crate.
    pub fn bundled(version: &str) -> Self {
        Self::new(version, BUNDLED_GRAMMAR)
    }

    pub fn load(path: &str, version: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read UIDL grammar from {}", path))?;
        Ok(Self::new(version, &text))
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match &config.grammar_path {
            Some(path) => Self::load(path, &config.grammar_version),
            None => Ok(Self::bundled(&config.grammar_version)),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
