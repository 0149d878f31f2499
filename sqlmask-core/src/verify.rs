//! Structural comparison of a schema before and after obfuscation.

use sqlparser::ast::{ColumnOption, Statement, TableConstraint};

use crate::config::SqlDialect;
use crate::error::{Result, SqlMaskError};
use crate::parser::parse_statements;

/// Column and foreign-key counts of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TableShape {
    pub columns: usize,
    pub foreign_keys: usize,
}

/// Name-independent outline of a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaShape {
    /// One entry per table, in file order
    pub tables: Vec<TableShape>,
    pub indexes: usize,
}

impl SchemaShape {
    /// Parses `text` and records its shape.
    pub fn from_sql(text: &str, dialect: SqlDialect, context: &str) -> Result<Self> {
        let mut shape = SchemaShape::default();
        for statement in parse_statements(text, dialect, context)? {
            match statement {
                Statement::CreateTable(create) => {
                    let inline = create
                        .columns
                        .iter()
                        .flat_map(|column| &column.options)
                        .filter(|option| matches!(option.option, ColumnOption::ForeignKey { .. }))
                        .count();
                    let table_level = create
                        .constraints
                        .iter()
                        .filter(|constraint| matches!(constraint, TableConstraint::ForeignKey { .. }))
                        .count();
                    shape.tables.push(TableShape {
                        columns: create.columns.len(),
                        foreign_keys: inline.saturating_add(table_level),
                    });
                }
                Statement::CreateIndex(_) => shape.indexes = shape.indexes.saturating_add(1),
                _ => {}
            }
        }
        Ok(shape)
    }

    pub fn foreign_keys(&self) -> usize {
        self.tables.iter().map(|table| table.foreign_keys).sum()
    }

    /// Compares table shapes as a multiset, since emission reorders tables.
    ///
    /// # Errors
    /// `ShapeMismatch` describing the first difference found.
    pub fn ensure_matches(&self, rendered: &SchemaShape) -> Result<()> {
        if self.tables.len() != rendered.tables.len() {
            return Err(mismatch(format!(
                "{} tables in input, {} in output",
                self.tables.len(),
                rendered.tables.len()
            )));
        }
        if self.indexes != rendered.indexes {
            return Err(mismatch(format!(
                "{} index statements in input, {} in output",
                self.indexes, rendered.indexes
            )));
        }

        let mut expected = self.tables.clone();
        let mut actual = rendered.tables.clone();
        expected.sort_unstable();
        actual.sort_unstable();
        if expected != actual {
            return Err(mismatch(format!(
                "column or foreign-key counts differ ({} foreign keys in input, {} in output)",
                self.foreign_keys(),
                rendered.foreign_keys()
            )));
        }
        Ok(())
    }
}

fn mismatch(details: String) -> SqlMaskError {
    SqlMaskError::ShapeMismatch { details }
}
