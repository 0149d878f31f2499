//! The run-wide identifier mapping.
//!
//! `NameMapper` is append-only: an entry, once recorded, is returned for
//! every later lookup of the same original and is never replaced. Values
//! are unique across the whole table, including identity entries for
//! exempt identifiers.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::config::ObfuscationConfig;
use crate::error::{Result, SqlMaskError};
use crate::models::{IdentifierKind, MappingEntry, ReplacementEntry};
use crate::naming::NameGenerator;

/// Original-to-obfuscated identifier table with collision detection.
#[derive(Debug)]
pub struct NameMapper {
    forward: IndexMap<String, MappingEntry>,
    reverse: HashMap<String, String>,
    generator: NameGenerator,
    min_length: usize,
    max_retries: u32,
}

impl NameMapper {
    /// Creates an empty mapper for one run.
    pub fn new(config: &ObfuscationConfig) -> Self {
        Self {
            forward: IndexMap::new(),
            reverse: HashMap::new(),
            generator: NameGenerator::from_config(config),
            min_length: config.min_obfuscation_length,
            max_retries: config.max_collision_retries,
        }
    }

    /// Returns the obfuscated form of `original`, minting it on first sight.
    ///
    /// The empty string means "no qualifier" and passes through unrecorded.
    /// Identifiers of `min_obfuscation_length` characters or fewer map to
    /// themselves.
    ///
    /// # Errors
    /// `NamingCollision` when every salted candidate is already owned by a
    /// different original.
    pub fn resolve(&mut self, kind: IdentifierKind, original: &str) -> Result<String> {
        if original.is_empty() {
            return Ok(String::new());
        }
        if let Some(entry) = self.forward.get(original) {
            return Ok(entry.obfuscated.clone());
        }

        if original.chars().count() <= self.min_length {
            if self.reverse.contains_key(original) {
                return Err(SqlMaskError::NamingCollision {
                    candidate: original.to_string(),
                    attempts: 1,
                });
            }
            self.record(kind, original, original.to_string());
            return Ok(original.to_string());
        }

        let mut last_candidate = String::new();
        for attempt in 0..=self.max_retries {
            let candidate = self.generator.mint(original, attempt);
            if !self.reverse.contains_key(&candidate) {
                tracing::trace!(%kind, original, obfuscated = %candidate, "Minted obfuscated name");
                self.record(kind, original, candidate.clone());
                return Ok(candidate);
            }
            tracing::debug!(%kind, attempt, "Minted name collided, retrying with salt");
            last_candidate = candidate;
        }

        Err(SqlMaskError::NamingCollision {
            candidate: last_candidate,
            attempts: self.max_retries.saturating_add(1),
        })
    }

    fn record(&mut self, kind: IdentifierKind, original: &str, obfuscated: String) {
        self.reverse
            .insert(obfuscated.clone(), original.to_string());
        self.forward.insert(
            original.to_string(),
            MappingEntry {
                original: original.to_string(),
                obfuscated,
                kind,
            },
        );
    }

    /// Looks up an already-recorded identifier without minting.
    pub fn get(&self, original: &str) -> Option<&str> {
        self.forward
            .get(original)
            .map(|entry| entry.obfuscated.as_str())
    }

    /// True when `name` is the value of some recorded entry.
    pub fn contains_obfuscated(&self, name: &str) -> bool {
        self.reverse.contains_key(name)
    }

    /// Number of recorded entries, identity entries included.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// True when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Entries in first-sighting order.
    pub fn entries(&self) -> impl Iterator<Item = &MappingEntry> {
        self.forward.values()
    }

    /// Number of identity entries.
    pub fn exempt_count(&self) -> usize {
        self.entries().filter(|entry| entry.is_identity()).count()
    }

    /// Non-identity entries sorted by descending original length, ties
    /// broken lexicographically, ready for text substitution.
    pub fn replacements(&self) -> Vec<ReplacementEntry> {
        let mut replacements: Vec<ReplacementEntry> = self
            .entries()
            .filter(|entry| !entry.is_identity())
            .map(|entry| ReplacementEntry {
                original: entry.original.clone(),
                obfuscated: entry.obfuscated.clone(),
            })
            .collect();

        replacements.sort_by(|a, b| {
            b.original
                .len()
                .cmp(&a.original.len())
                .then_with(|| a.original.cmp(&b.original))
        });
        replacements
    }

    #[cfg(test)]
    pub(crate) fn occupy(&mut self, obfuscated: &str, owner: &str) {
        self.reverse
            .insert(obfuscated.to_string(), owner.to_string());
    }
}
