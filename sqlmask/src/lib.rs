//! Library module for the sqlmask binary.
//!
//! This module exposes the command-line surface for testing purposes.
//! The main binary functionality is in main.rs.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use sqlmask_core::{
    NamingStrategy, ObfuscationConfig, Obfuscator, Result, RunPaths, RunSummary, SqlDialect,
    logging::LogFormat,
};

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "sqlmask")]
#[command(about = "Anonymize identifiers in a SQL schema and its queries")]
#[command(version)]
#[command(long_about = "
sqlmask - consistent identifier anonymization for SQL corpora

Rewrites a schema dump so that every table, column, index, constraint and
qualifier name is replaced by a short opaque token, emits it in foreign-key
dependency order, and applies the same mapping to a directory of query files.

Identifiers of --min-length characters or fewer are kept as-is. Aliases
containing an --exempt-alias substring (default: COUNT) are kept as-is.

Nothing is written unless the whole run succeeds.

EXAMPLES:
  sqlmask --schema-input schema.sql --schema-output out/schema.sql \\
          --query-dir queries --query-output out/queries.sql
  sqlmask --config sqlmask.json --mapping-output out/mapping.json ...
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Schema file with CREATE TABLE / CREATE INDEX statements
    #[arg(long, value_name = "FILE")]
    pub schema_input: PathBuf,

    /// Destination for the rewritten schema
    #[arg(long, value_name = "FILE")]
    pub schema_output: PathBuf,

    /// Directory of query files, read in file-name order
    #[arg(long, value_name = "DIR")]
    pub query_dir: PathBuf,

    /// Destination for the concatenated, substituted queries
    #[arg(long, value_name = "FILE")]
    pub query_output: PathBuf,

    /// Write the identifier mapping as JSON
    #[arg(long, value_name = "FILE")]
    pub mapping_output: Option<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(long, value_name = "FILE", env = "SQLMASK_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQL dialect (generic, mysql, postgres, sqlite, mssql, ansi)
    #[arg(long, value_name = "DIALECT")]
    pub dialect: Option<SqlDialect>,

    /// Seed for hashed or random naming
    #[arg(long)]
    pub seed: Option<u32>,

    /// Naming strategy
    #[arg(long, value_enum)]
    pub naming: Option<NamingArg>,

    /// Identifiers this long or shorter are not obfuscated
    #[arg(long, value_name = "CHARS")]
    pub min_length: Option<usize>,

    /// Length of generated names (1-7)
    #[arg(long, value_name = "CHARS")]
    pub token_length: Option<usize>,

    /// Keep aliases containing this substring (repeatable)
    #[arg(long = "exempt-alias", value_name = "SUBSTRING")]
    pub exempt_alias: Vec<String>,

    /// Re-parse the rewritten schema and compare its structure with the input
    #[arg(long)]
    pub verify_shape: bool,
}

/// Flags shared by every invocation.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl GlobalArgs {
    /// Log format selected by the flags.
    pub const fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Naming strategy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingArg {
    /// Deterministic keyed hash of the original name
    Hashed,
    /// Seeded random tokens
    Random,
}

impl From<NamingArg> for NamingStrategy {
    fn from(value: NamingArg) -> Self {
        match value {
            NamingArg::Hashed => NamingStrategy::Hashed,
            NamingArg::Random => NamingStrategy::Random,
        }
    }
}

impl Cli {
    /// Input and output locations for the run.
    pub fn run_paths(&self) -> RunPaths {
        RunPaths {
            schema_input: self.schema_input.clone(),
            schema_output: self.schema_output.clone(),
            query_dir: self.query_dir.clone(),
            query_output: self.query_output.clone(),
            mapping_output: self.mapping_output.clone(),
        }
    }
}

/// Builds the run configuration: file values (or defaults) with CLI
/// overrides applied on top.
///
/// # Errors
/// Returns an error if the configuration file cannot be read or parsed.
pub fn build_config(cli: &Cli) -> Result<ObfuscationConfig> {
    let mut config = match &cli.config {
        Some(path) => ObfuscationConfig::from_json_file(path)?,
        None => ObfuscationConfig::new(),
    };

    if let Some(dialect) = cli.dialect {
        config = config.with_dialect(dialect);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(naming) = cli.naming {
        config = config.with_naming(naming.into());
    }
    if let Some(length) = cli.min_length {
        config = config.with_min_obfuscation_length(length);
    }
    if let Some(length) = cli.token_length {
        config = config.with_token_length(length);
    }
    if !cli.exempt_alias.is_empty() {
        config = config.with_exempt_alias_substrings(cli.exempt_alias.iter().cloned());
    }
    if cli.verify_shape {
        config = config.with_verify_shape(true);
    }

    Ok(config)
}

/// Executes one obfuscation run.
///
/// # Errors
/// Returns the first configuration, parse, rewrite or I/O error; no output
/// is written in that case.
pub fn execute(cli: &Cli) -> Result<RunSummary> {
    let config = build_config(cli)?;
    tracing::debug!(
        dialect = %config.dialect,
        naming = ?config.naming,
        min_length = config.min_obfuscation_length,
        "Resolved configuration"
    );

    let mut obfuscator = Obfuscator::new(config)?;
    obfuscator.run(&cli.run_paths())
}

/// One-line human summary printed after a successful run.
pub fn format_summary(summary: &RunSummary) -> String {
    format!(
        "sqlmask v{}: {} tables, {} query files ({} statements), {} identifiers obfuscated, {} kept",
        env!("CARGO_PKG_VERSION"),
        summary.tables,
        summary.query_files,
        summary.query_statements,
        summary.obfuscated_identifiers,
        summary.exempt_identifiers
    )
}
