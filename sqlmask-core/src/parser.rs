//! Thin adapter over `sqlparser` for parsing and rendering.
//!
//! Parsing and rendering are delegated entirely; this module only picks
//! the dialect and turns parser failures into `SqlMaskError::Parse` with a
//! snippet of the offending line.

use std::sync::LazyLock;

use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, dialect_from_str};
use sqlparser::parser::{Parser, ParserError};

use crate::config::SqlDialect;
use crate::error::{Result, SqlMaskError};

const SNIPPET_WIDTH: usize = 80;

static ERROR_LOCATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Line: (\d+), Column: (\d+)").ok());

/// Resolves the parser dialect.
pub fn dialect_for(dialect: SqlDialect) -> Result<Box<dyn Dialect>> {
    dialect_from_str(dialect.parser_name()).ok_or_else(|| {
        SqlMaskError::configuration(format!("SQL dialect '{}' is not available", dialect))
    })
}

/// Parses a buffer of zero or more semicolon-terminated statements.
///
/// `context` names the input (usually a file path) in error messages.
pub fn parse_statements(text: &str, dialect: SqlDialect, context: &str) -> Result<Vec<Statement>> {
    let dialect = dialect_for(dialect)?;
    Parser::parse_sql(dialect.as_ref(), text).map_err(|source| SqlMaskError::Parse {
        context: context.to_string(),
        snippet: snippet_for(text, &source),
        source,
    })
}

/// Renders one statement followed by a statement terminator.
pub fn render(statement: &Statement) -> String {
    format!("{};\n", statement)
}

/// Picks the source line a parser error points at, or the first non-blank
/// line when the error carries no location.
fn snippet_for(text: &str, error: &ParserError) -> String {
    let message = error.to_string();
    let line_number = ERROR_LOCATION
        .as_ref()
        .and_then(|re| re.captures(&message))
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok());

    let line = match line_number {
        Some(number) => text.lines().nth(number.saturating_sub(1)),
        None => text.lines().find(|line| !line.trim().is_empty()),
    };

    let line = line.unwrap_or_default().trim();
    line.chars().take(SNIPPET_WIDTH).collect()
}
