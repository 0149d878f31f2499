//! Error types for the anonymization engine.
//!
//! Every error in this module is fatal for a run. The engine favors failing
//! fast over best-effort output: an inconsistent mapping would silently
//! corrupt everything written after it.

use thiserror::Error;

/// Main error type for sqlmask operations.
///
/// # Security
/// Messages carry structural context (table names, statement kinds, line
/// snippets) but never the full mapping table.
#[derive(Debug, Error)]
pub enum SqlMaskError {
    /// Input was rejected by the SQL parser
    #[error("SQL parse failed in {context}: {source} near `{snippet}`")]
    Parse {
        context: String,
        snippet: String,
        #[source]
        source: sqlparser::parser::ParserError,
    },

    /// A construct the rewriter deliberately refuses to handle
    #[error("Unsupported construct: {construct} ({context})")]
    UnsupportedConstruct { construct: String, context: String },

    /// Every minted candidate for an identifier was already taken
    #[error(
        "Naming collision: '{candidate}' is already assigned to another identifier after {attempts} attempts"
    )]
    NamingCollision { candidate: String, attempts: u32 },

    /// The foreign-key graph is not acyclic
    #[error("Foreign-key dependency cycle: {}", cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    /// The same table was defined twice in one schema
    #[error("Table '{name}' is defined more than once")]
    DuplicateTable { name: String },

    /// Re-parsed output does not have the structure of the input
    #[error("Schema shape mismatch after obfuscation: {details}")]
    ShapeMismatch { details: String },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with SqlMaskError
pub type Result<T> = std::result::Result<T, SqlMaskError>;

impl SqlMaskError {
    /// Creates an unsupported-construct error
    pub fn unsupported(construct: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            construct: construct.into(),
            context: context.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with the path or operation that failed
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}
