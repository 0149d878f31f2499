//! SQL identifier anonymization tool.
//!
//! This binary rewrites a schema dump and a directory of queries so that
//! every identifier is replaced consistently by an opaque token.
//!
//! # Guarantees
//! - Outputs are only written when the whole run succeeds
//! - Identifier mappings are never logged above TRACE

use anyhow::Context;
use clap::Parser;
use sqlmask::{Cli, execute, format_summary};
use sqlmask_core::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format())?;

    let summary = execute(&cli).with_context(|| {
        format!(
            "Failed to obfuscate {} with queries from {}",
            cli.schema_input.display(),
            cli.query_dir.display()
        )
    })?;

    if !cli.global.quiet {
        println!("{}", format_summary(&summary));
    }
    Ok(())
}
