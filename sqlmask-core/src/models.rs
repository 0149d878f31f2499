//! Core data models for identifier anonymization.
//!
//! These types describe what the engine learns while rewriting a schema
//! and harvesting queries: which identifiers were seen, what they map to,
//! and how tables depend on each other.

use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;

use crate::config::ObfuscationConfig;

/// Syntactic role of an identifier at first sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Table,
    Column,
    Index,
    Constraint,
    Alias,
    Qualifier,
    Cte,
    Window,
    Literal,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            IdentifierKind::Table => "table",
            IdentifierKind::Column => "column",
            IdentifierKind::Index => "index",
            IdentifierKind::Constraint => "constraint",
            IdentifierKind::Alias => "alias",
            IdentifierKind::Qualifier => "qualifier",
            IdentifierKind::Cte => "cte",
            IdentifierKind::Window => "window",
            IdentifierKind::Literal => "literal",
        };
        f.write_str(label)
    }
}

/// One row of the name mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub original: String,
    pub obfuscated: String,
    pub kind: IdentifierKind,
}

impl MappingEntry {
    /// True for exempt identifiers that map to themselves.
    pub fn is_identity(&self) -> bool {
        self.original == self.obfuscated
    }
}

/// A literal `(original, obfuscated)` pair applied to raw query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementEntry {
    pub original: String,
    pub obfuscated: String,
}

/// A rewritten table definition with its foreign-key edges.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    /// Obfuscated table name, the key used by the dependency graph
    pub name: String,
    pub original_name: String,
    /// Obfuscated owning database/schema qualifier, if any
    pub qualifier: Option<String>,
    pub columns: Vec<String>,
    pub indexes: Vec<String>,
    pub constraints: Vec<String>,
    /// Obfuscated names of referenced tables, declaration order, no duplicates
    pub dependencies: Vec<String>,
    /// The rewritten `CREATE TABLE` statement
    pub statement: Statement,
    /// Rewritten `CREATE INDEX` statements targeting this table
    pub attached_indexes: Vec<Statement>,
}

impl TableDefinition {
    /// Creates an empty definition around a rewritten statement.
    pub fn new(name: String, original_name: String, statement: Statement) -> Self {
        Self {
            name,
            original_name,
            qualifier: None,
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
            dependencies: Vec::new(),
            statement,
            attached_indexes: Vec::new(),
        }
    }

    /// Records a dependency edge once.
    pub fn add_dependency(&mut self, table: String) {
        if !self.dependencies.contains(&table) {
            self.dependencies.push(table);
        }
    }

    /// Tables without outgoing edges are leaves of the graph.
    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tables: usize,
    pub query_files: usize,
    pub query_statements: usize,
    /// Non-identity mapping entries
    pub obfuscated_identifiers: usize,
    /// Identity entries below the exemption threshold
    pub exempt_identifiers: usize,
}

/// Serializable record of one run, written next to the outputs on request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationReport {
    pub format_version: String,
    pub tool_version: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub config: ObfuscationConfig,
    /// Obfuscated table names in emission order
    pub table_order: Vec<String>,
    pub summary: RunSummary,
    pub mappings: Vec<MappingEntry>,
}

impl ObfuscationReport {
    /// Creates a report stamped with the current time and crate version.
    pub fn new(
        config: ObfuscationConfig,
        table_order: Vec<String>,
        summary: RunSummary,
        mappings: Vec<MappingEntry>,
    ) -> Self {
        Self {
            format_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now(),
            config,
            table_order,
            summary,
            mappings,
        }
    }

    /// Looks up the obfuscated form of an original identifier.
    pub fn obfuscated(&self, original: &str) -> Option<&str> {
        self.mappings
            .iter()
            .find(|entry| entry.original == original)
            .map(|entry| entry.obfuscated.as_str())
    }
}
