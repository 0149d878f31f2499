//! Literal text substitution over raw query files.
//!
//! All originals are compiled into one alternation, longest first, so a
//! single left-to-right pass replaces every occurrence. A short original that
//! prefixes a longer one never wins where the longer one matches, and
//! replaced text is never scanned again.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::error::{Result, SqlMaskError};
use crate::models::ReplacementEntry;

const REGEX_SIZE_LIMIT: usize = 67_108_864;

/// Compiled replacement table.
#[derive(Debug)]
pub struct TextSubstitutor {
    pattern: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl TextSubstitutor {
    /// Compiles `replacements`. Entries are tried in the order given, so
    /// callers pass them sorted by descending original length.
    pub fn new(replacements: &[ReplacementEntry]) -> Result<Self> {
        let mut ordered: Vec<&ReplacementEntry> = replacements
            .iter()
            .filter(|entry| !entry.original.is_empty())
            .collect();
        // Stable: equal lengths keep the caller's order.
        ordered.sort_by(|a, b| b.original.len().cmp(&a.original.len()));

        if ordered.is_empty() {
            return Ok(Self {
                pattern: None,
                replacements: HashMap::new(),
            });
        }

        let alternation = ordered
            .iter()
            .map(|entry| regex::escape(&entry.original))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&alternation)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| {
                SqlMaskError::configuration(format!("Failed to compile replacement table: {e}"))
            })?;

        let replacements = ordered
            .into_iter()
            .map(|entry| (entry.original.clone(), entry.obfuscated.clone()))
            .collect();

        Ok(Self {
            pattern: Some(pattern),
            replacements,
        })
    }

    /// Number of distinct originals.
    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Replaces every occurrence of every original in one pass.
    pub fn apply(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |captures: &regex::Captures<'_>| {
                let matched = &captures[0];
                self.replacements
                    .get(matched)
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }
}
