//! Obfuscation run configuration.
//!
//! Holds the naming parameters, the exemption rules and the SQL dialect.
//! Configurations can be loaded from a JSON file and adjusted through
//! builder methods; `validate` must pass before a run starts.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Result, SqlMaskError};

/// Longest token the hashed generator can produce: a 32-bit hash encodes
/// to seven base32 characters before padding.
pub const MAX_TOKEN_LENGTH: usize = 7;

/// How obfuscated names are minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    /// Seeded xxHash32 of the original, base32-encoded. Reproducible.
    #[default]
    Hashed,
    /// Seeded pseudo-random tokens, independent of the original text.
    Random,
}

/// SQL dialect handed to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    /// Permissive generic dialect
    Generic,
    /// MySQL / MariaDB dumps
    #[default]
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
    /// Microsoft SQL Server
    MsSql,
    /// Strict ANSI SQL
    Ansi,
}

impl SqlDialect {
    /// Name understood by `sqlparser::dialect::dialect_from_str`.
    pub const fn parser_name(&self) -> &'static str {
        match self {
            SqlDialect::Generic => "generic",
            SqlDialect::MySql => "mysql",
            SqlDialect::Postgres => "postgresql",
            SqlDialect::Sqlite => "sqlite",
            SqlDialect::MsSql => "mssql",
            SqlDialect::Ansi => "ansi",
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.parser_name())
    }
}

impl std::str::FromStr for SqlDialect {
    type Err = SqlMaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(SqlDialect::Generic),
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "sqlite" => Ok(SqlDialect::Sqlite),
            "mssql" | "sqlserver" => Ok(SqlDialect::MsSql),
            "ansi" => Ok(SqlDialect::Ansi),
            other => Err(SqlMaskError::configuration(format!(
                "Unknown SQL dialect '{}'",
                other
            ))),
        }
    }
}

/// Validation errors for obfuscation configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("token_length must be between 1 and 7, got {0}")]
    InvalidTokenLength(usize),
    #[error(
        "token_length ({token_length}) must exceed min_obfuscation_length ({min_length}) so minted names never shadow exempt ones"
    )]
    TokenShadowsExempt {
        token_length: usize,
        min_length: usize,
    },
    #[error("exempt_alias_substrings must not contain empty strings")]
    EmptyExemptSubstring,
}

/// Configuration for one obfuscation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObfuscationConfig {
    /// Identifiers at or below this many characters map to themselves
    pub min_obfuscation_length: usize,
    /// Length of minted tokens
    pub token_length: usize,
    /// Hash seed, or RNG seed for the random strategy
    pub seed: u32,
    /// Naming strategy
    pub naming: NamingStrategy,
    /// Salted re-mints attempted before a collision becomes fatal
    pub max_collision_retries: u32,
    /// Projected-expression aliases containing any of these are left alone
    pub exempt_alias_substrings: Vec<String>,
    /// Dialect used to parse schema and query files
    pub dialect: SqlDialect,
    /// Re-parse the rendered schema and compare its shape with the input
    pub verify_shape: bool,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            min_obfuscation_length: 3,
            token_length: 5,
            seed: 10,
            naming: NamingStrategy::Hashed,
            max_collision_retries: 8,
            // Generated aggregate aliases must stay recognizable downstream.
            exempt_alias_substrings: vec!["COUNT".to_string()],
            dialect: SqlDialect::MySql,
            verify_shape: false,
        }
    }
}

impl ObfuscationConfig {
    /// Creates a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a config from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SqlMaskError::io(format!("Failed to read config {}", path.display()), e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SqlMaskError::serialization(format!("Invalid config {}", path.display()), e)
        })
    }

    /// Builder method to set the exemption threshold.
    pub fn with_min_obfuscation_length(mut self, length: usize) -> Self {
        self.min_obfuscation_length = length;
        self
    }

    /// Builder method to set the minted token length.
    pub fn with_token_length(mut self, length: usize) -> Self {
        self.token_length = length;
        self
    }

    /// Builder method to set the seed.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the naming strategy.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Builder method to set the collision retry budget.
    pub fn with_max_collision_retries(mut self, retries: u32) -> Self {
        self.max_collision_retries = retries;
        self
    }

    /// Builder method to replace the exempt alias substrings.
    pub fn with_exempt_alias_substrings<I, S>(mut self, substrings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exempt_alias_substrings = substrings.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the dialect.
    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Builder method to toggle round-trip shape verification.
    pub fn with_verify_shape(mut self, verify: bool) -> Self {
        self.verify_shape = verify;
        self
    }

    /// True when an alias must be kept verbatim.
    pub fn is_exempt_alias(&self, alias: &str) -> bool {
        self.exempt_alias_substrings
            .iter()
            .any(|substring| alias.contains(substring.as_str()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.token_length == 0 || self.token_length > MAX_TOKEN_LENGTH {
            return Err(ConfigValidationError::InvalidTokenLength(self.token_length));
        }
        if self.token_length <= self.min_obfuscation_length {
            return Err(ConfigValidationError::TokenShadowsExempt {
                token_length: self.token_length,
                min_length: self.min_obfuscation_length,
            });
        }
        if self.exempt_alias_substrings.iter().any(String::is_empty) {
            return Err(ConfigValidationError::EmptyExemptSubstring);
        }
        Ok(())
    }
}
