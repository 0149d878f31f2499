//! In-place rewriting of schema definition statements.
//!
//! `SchemaRewriter` is the transforming pass: every identifier position in a
//! `CREATE TABLE` or `CREATE INDEX` statement is replaced with its mapped
//! value, and foreign-key targets are recorded as dependency edges. Any
//! construct whose identifiers cannot all be reached is refused rather than
//! emitted half-obfuscated.

use std::ops::ControlFlow;

use sqlparser::ast::{
    ColumnOption, CreateIndex, CreateTable, Expr, HiveDistributionStyle, Ident, ObjectName,
    Statement, TableConstraint, VisitMut, visit_expressions_mut,
};

use crate::error::{Result, SqlMaskError};
use crate::mapper::NameMapper;
use crate::models::{IdentifierKind, TableDefinition};

/// Result of rewriting one schema statement.
#[derive(Debug)]
pub enum RewrittenStatement {
    /// A table definition with its dependency edges
    Table(Box<TableDefinition>),
    /// A standalone index that belongs after the named (obfuscated) table
    Index { table: String, statement: Statement },
}

/// Transforming pass over parsed schema statements.
pub struct SchemaRewriter<'m> {
    mapper: &'m mut NameMapper,
}

impl<'m> SchemaRewriter<'m> {
    /// Creates a rewriter that records into `mapper`.
    pub fn new(mapper: &'m mut NameMapper) -> Self {
        Self { mapper }
    }

    /// Rewrites one statement. Only `CREATE TABLE` and `CREATE INDEX` are
    /// accepted.
    pub fn rewrite(&mut self, statement: Statement) -> Result<RewrittenStatement> {
        match statement {
            Statement::CreateTable(create) => {
                let definition = self.rewrite_table(create)?;
                Ok(RewrittenStatement::Table(Box::new(definition)))
            }
            Statement::CreateIndex(create) => {
                let (table, create) = self.rewrite_index(create)?;
                Ok(RewrittenStatement::Index {
                    table,
                    statement: Statement::CreateIndex(create),
                })
            }
            other => Err(SqlMaskError::unsupported(
                format!("{} statement", statement_kind(&other)),
                "schema files may only contain CREATE TABLE and CREATE INDEX",
            )),
        }
    }

    fn rewrite_table(&mut self, mut create: CreateTable) -> Result<TableDefinition> {
        let original_name = last_part(&create.name);
        let context = format!("table {}", original_name);

        if create.query.is_some() {
            return Err(SqlMaskError::unsupported("CREATE TABLE ... AS SELECT", context));
        }
        if create.like.is_some() {
            return Err(SqlMaskError::unsupported("CREATE TABLE ... LIKE", context));
        }
        if create.cluster_by.is_some() {
            return Err(SqlMaskError::unsupported("CLUSTER BY", context));
        }
        if !matches!(create.hive_distribution, HiveDistributionStyle::NONE) {
            return Err(SqlMaskError::unsupported("PARTITIONED BY", context));
        }

        let (qualifier, name) = self.rewrite_object_name(&mut create.name)?;

        let mut columns = Vec::with_capacity(create.columns.len());
        let mut indexes = Vec::new();
        let mut constraints = Vec::new();
        let mut dependencies = Vec::new();

        for column in &mut create.columns {
            let column_context = format!("column {} of {}", column.name.value, context);
            self.rewrite_ident(&mut column.name, IdentifierKind::Column)?;
            columns.push(column.name.value.clone());

            for option in &mut column.options {
                self.rewrite_optional(&mut option.name, IdentifierKind::Constraint, &mut constraints)?;
                match &mut option.option {
                    ColumnOption::Check(_) => {
                        return Err(SqlMaskError::unsupported("CHECK constraint", column_context));
                    }
                    ColumnOption::ForeignKey {
                        foreign_table,
                        referred_columns,
                        ..
                    } => {
                        let (_, referenced) = self.rewrite_object_name(foreign_table)?;
                        self.rewrite_idents(referred_columns, IdentifierKind::Column)?;
                        dependencies.push(referenced);
                    }
                    generated @ ColumnOption::Generated { .. } => {
                        self.rewrite_expression_identifiers(generated)?;
                    }
                    _ => {}
                }
            }
        }

        for constraint in &mut create.constraints {
            match constraint {
                TableConstraint::Unique {
                    name,
                    index_name,
                    columns: key_columns,
                    ..
                }
                | TableConstraint::PrimaryKey {
                    name,
                    index_name,
                    columns: key_columns,
                    ..
                } => {
                    self.rewrite_optional(name, IdentifierKind::Constraint, &mut constraints)?;
                    self.rewrite_optional(index_name, IdentifierKind::Index, &mut indexes)?;
                    self.rewrite_idents(key_columns, IdentifierKind::Column)?;
                }
                TableConstraint::ForeignKey {
                    name,
                    columns: local_columns,
                    foreign_table,
                    referred_columns,
                    ..
                } => {
                    self.rewrite_optional(name, IdentifierKind::Constraint, &mut constraints)?;
                    let (_, referenced) = self.rewrite_object_name(foreign_table)?;
                    self.rewrite_idents(local_columns, IdentifierKind::Column)?;
                    self.rewrite_idents(referred_columns, IdentifierKind::Column)?;
                    dependencies.push(referenced);
                }
                TableConstraint::Check { .. } => {
                    return Err(SqlMaskError::unsupported("CHECK constraint", context));
                }
                TableConstraint::Index {
                    name,
                    columns: key_columns,
                    ..
                } => {
                    self.rewrite_optional(name, IdentifierKind::Index, &mut indexes)?;
                    self.rewrite_idents(key_columns, IdentifierKind::Column)?;
                }
                TableConstraint::FulltextOrSpatial {
                    opt_index_name,
                    columns: key_columns,
                    ..
                } => {
                    self.rewrite_optional(opt_index_name, IdentifierKind::Index, &mut indexes)?;
                    self.rewrite_idents(key_columns, IdentifierKind::Column)?;
                }
                #[allow(unreachable_patterns)]
                other => {
                    return Err(SqlMaskError::unsupported(
                        format!("table constraint `{}`", other),
                        context,
                    ));
                }
            }
        }

        // Table-level clauses that refer to columns.
        self.rewrite_expression_identifiers(&mut create.partition_by)?;
        self.rewrite_expression_identifiers(&mut create.order_by)?;
        self.rewrite_expression_identifiers(&mut create.primary_key)?;

        let mut definition =
            TableDefinition::new(name, original_name, Statement::CreateTable(create));
        definition.qualifier = qualifier;
        definition.columns = columns;
        definition.indexes = indexes;
        definition.constraints = constraints;
        for dependency in dependencies {
            definition.add_dependency(dependency);
        }

        tracing::debug!(
            columns = definition.columns.len(),
            dependencies = definition.dependencies.len(),
            "Rewrote table definition"
        );
        Ok(definition)
    }

    fn rewrite_index(&mut self, mut create: CreateIndex) -> Result<(String, CreateIndex)> {
        if let Some(index_name) = &mut create.name {
            for part in &mut index_name.0 {
                self.rewrite_ident(part, IdentifierKind::Index)?;
            }
        }
        let (_, table) = self.rewrite_object_name(&mut create.table_name)?;
        self.rewrite_expression_identifiers(&mut create.columns)?;
        self.rewrite_idents(&mut create.include, IdentifierKind::Column)?;
        self.rewrite_expression_identifiers(&mut create.predicate)?;
        Ok((table, create))
    }

    /// Rewrites every part of a possibly qualified name. The last part is
    /// the object, the rest are qualifiers. Returns the rewritten
    /// `(qualifier, name)`.
    fn rewrite_object_name(&mut self, name: &mut ObjectName) -> Result<(Option<String>, String)> {
        let last = name.0.len().saturating_sub(1);
        let mut qualifiers = Vec::new();
        let mut object = String::new();

        for (position, part) in name.0.iter_mut().enumerate() {
            if position == last {
                self.rewrite_ident(part, IdentifierKind::Table)?;
                object = part.value.clone();
            } else {
                self.rewrite_ident(part, IdentifierKind::Qualifier)?;
                qualifiers.push(part.value.clone());
            }
        }

        let qualifier = (!qualifiers.is_empty()).then(|| qualifiers.join("."));
        Ok((qualifier, object))
    }

    fn rewrite_ident(&mut self, ident: &mut Ident, kind: IdentifierKind) -> Result<()> {
        ident.value = self.mapper.resolve(kind, &ident.value)?;
        Ok(())
    }

    fn rewrite_idents(&mut self, idents: &mut [Ident], kind: IdentifierKind) -> Result<()> {
        for ident in idents {
            self.rewrite_ident(ident, kind)?;
        }
        Ok(())
    }

    fn rewrite_optional(
        &mut self,
        ident: &mut Option<Ident>,
        kind: IdentifierKind,
        collected: &mut Vec<String>,
    ) -> Result<()> {
        if let Some(ident) = ident {
            self.rewrite_ident(ident, kind)?;
            collected.push(ident.value.clone());
        }
        Ok(())
    }

    /// Rewrites column references inside expressions (index keys, partial
    /// index predicates, generated columns, table partitioning and ordering).
    fn rewrite_expression_identifiers<V: VisitMut>(&mut self, node: &mut V) -> Result<()> {
        let mapper = &mut *self.mapper;
        let flow = visit_expressions_mut(node, |expr| {
            let outcome = match expr {
                Expr::Identifier(ident) => resolve_into(mapper, ident, IdentifierKind::Column),
                Expr::CompoundIdentifier(parts) => {
                    let last = parts.len().saturating_sub(1);
                    parts.iter_mut().enumerate().try_for_each(|(position, ident)| {
                        let kind = if position == last {
                            IdentifierKind::Column
                        } else {
                            IdentifierKind::Table
                        };
                        resolve_into(mapper, ident, kind)
                    })
                }
                _ => Ok(()),
            };
            match outcome {
                Ok(()) => ControlFlow::Continue(()),
                Err(error) => ControlFlow::Break(error),
            }
        });

        match flow {
            ControlFlow::Break(error) => Err(error),
            ControlFlow::Continue(()) => Ok(()),
        }
    }
}

fn resolve_into(mapper: &mut NameMapper, ident: &mut Ident, kind: IdentifierKind) -> Result<()> {
    ident.value = mapper.resolve(kind, &ident.value)?;
    Ok(())
}

/// Unqualified object name, unquoted.
pub(crate) fn last_part(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

/// Leading keywords of a statement, for error messages.
pub(crate) fn statement_kind(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
