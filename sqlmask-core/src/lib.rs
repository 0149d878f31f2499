//! Core engine for sqlmask.
//!
//! This crate anonymizes the identifiers of a SQL schema and of a corpus of
//! queries written against it, while keeping both syntactically valid and
//! mutually consistent. Table, column, index, constraint and alias names are
//! replaced with short opaque tokens through one run-wide mapping.
//!
//! # Guarantees
//! - The mapping is injective and stable for the lifetime of a run
//! - Short identifiers (at or below the configured threshold) are kept as-is
//! - The rewritten schema is emitted in foreign-key dependency order
//! - Query files keep their formatting; only identifier text is replaced
//! - A failed run writes no output
//!
//! # Architecture
//! A run has two phases. Phase one parses the schema, rewrites it in place
//! (`schema`), orders it (`graph`), and harvests names from every query file
//! (`harvest`), all into one `NameMapper`. Phase two substitutes the finished
//! mapping into the raw query text (`substitute`).
//!
//! ```rust,no_run
//! use sqlmask_core::{ObfuscationConfig, Obfuscator, RunPaths};
//!
//! # fn main() -> sqlmask_core::Result<()> {
//! let mut obfuscator = Obfuscator::new(ObfuscationConfig::default())?;
//! let summary = obfuscator.run(&RunPaths {
//!     schema_input: "schema.sql".into(),
//!     schema_output: "out/schema.sql".into(),
//!     query_dir: "queries".into(),
//!     query_output: "out/queries.sql".into(),
//!     mapping_output: None,
//! })?;
//! println!("{} tables", summary.tables);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod harvest;
pub mod logging;
pub mod mapper;
pub mod models;
pub mod naming;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod substitute;
pub mod verify;

// Re-export commonly used types
pub use config::{ConfigValidationError, NamingStrategy, ObfuscationConfig, SqlDialect};
pub use error::{Result, SqlMaskError};
pub use graph::DependencyGraph;
pub use harvest::{QueryHarvester, harvest};
pub use mapper::NameMapper;
pub use models::{
    IdentifierKind, MappingEntry, ObfuscationReport, ReplacementEntry, RunSummary,
    TableDefinition,
};
pub use pipeline::{Obfuscator, RunPaths};
pub use schema::{RewrittenStatement, SchemaRewriter};
pub use substitute::TextSubstitutor;
pub use verify::SchemaShape;
