//! Foreign-key dependency graph and dependency-ordered emission.
//!
//! Tables are keyed by their obfuscated, unqualified name. Emission is a
//! depth-first post-order walk: every table comes after all tables it
//! references, so the output can be replayed into an empty database.

use std::collections::HashSet;

use indexmap::IndexMap;
use sqlparser::ast::Statement;

use crate::error::{Result, SqlMaskError};
use crate::models::TableDefinition;
use crate::parser;

/// Rewritten tables with their reference edges, in insertion order.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    tables: IndexMap<String, TableDefinition>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    ///
    /// # Errors
    /// `DuplicateTable` if a table with the same name is already present.
    pub fn insert(&mut self, table: TableDefinition) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(SqlMaskError::DuplicateTable {
                name: table.original_name,
            });
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Attaches a rewritten `CREATE INDEX` to the table it indexes.
    pub fn attach_index(&mut self, table: &str, statement: Statement) -> Result<()> {
        match self.tables.get_mut(table) {
            Some(definition) => {
                definition.attached_indexes.push(statement);
                Ok(())
            }
            None => Err(SqlMaskError::unsupported(
                "CREATE INDEX on a table not defined earlier in the schema",
                parser::render(&statement).trim_end().to_string(),
            )),
        }
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no table has been inserted.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns every table exactly once, dependencies first.
    ///
    /// Edges to tables absent from the graph are skipped with a warning.
    ///
    /// # Errors
    /// `DependencyCycle` with the cycle path (original names) when the
    /// references are not acyclic. A table referencing itself is a cycle.
    pub fn emission_order(&self) -> Result<Vec<&TableDefinition>> {
        let mut emitted = Vec::with_capacity(self.tables.len());
        let mut visited: HashSet<&str> = HashSet::new();
        let mut in_progress: HashSet<&str> = HashSet::new();

        for root in self.tables.values() {
            if visited.contains(root.name.as_str()) {
                continue;
            }

            // Each frame is a table and the index of its next unvisited edge.
            let mut stack: Vec<(&TableDefinition, usize)> = vec![(root, 0)];
            in_progress.insert(root.name.as_str());

            while let Some(frame) = stack.last_mut() {
                let table: &TableDefinition = frame.0;
                let Some(dependency) = table.dependencies.get(frame.1) else {
                    stack.pop();
                    in_progress.remove(table.name.as_str());
                    visited.insert(table.name.as_str());
                    emitted.push(table);
                    continue;
                };
                frame.1 = frame.1.saturating_add(1);

                if visited.contains(dependency.as_str()) {
                    continue;
                }
                if in_progress.contains(dependency.as_str()) {
                    return Err(cycle_error(&stack, dependency));
                }

                match self.tables.get(dependency) {
                    Some(target) => {
                        in_progress.insert(target.name.as_str());
                        stack.push((target, 0));
                    }
                    None => {
                        tracing::warn!(
                            table = %table.original_name,
                            "Foreign key references a table outside the schema; ordering edge skipped"
                        );
                    }
                }
            }
        }

        Ok(emitted)
    }

    /// Obfuscated table names in emission order.
    pub fn table_order(&self) -> Result<Vec<String>> {
        Ok(self
            .emission_order()?
            .into_iter()
            .map(|table| table.name.clone())
            .collect())
    }

    /// Renders every table, followed by its attached indexes, in emission
    /// order.
    pub fn render(&self) -> Result<String> {
        let mut output = String::new();
        for table in self.emission_order()? {
            output.push_str(&parser::render(&table.statement));
            for index in &table.attached_indexes {
                output.push_str(&parser::render(index));
            }
        }
        Ok(output)
    }
}

/// Builds the cycle path from the frame that first entered `closing` to the
/// top of the stack, closed by `closing` itself.
fn cycle_error(stack: &[(&TableDefinition, usize)], closing: &str) -> SqlMaskError {
    let start = stack
        .iter()
        .position(|(table, _)| table.name == closing)
        .unwrap_or_default();

    let mut cycle: Vec<String> = stack[start..]
        .iter()
        .map(|(table, _)| table.original_name.clone())
        .collect();
    if let Some(first) = cycle.first().cloned() {
        cycle.push(first);
    }

    SqlMaskError::DependencyCycle { cycle }
}
