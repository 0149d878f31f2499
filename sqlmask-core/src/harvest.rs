//! Read-only identifier harvesting from query statements.
//!
//! Query files are never rewritten structurally. The harvester only walks
//! each parsed statement and registers the names it finds with the mapper,
//! so the text substitution pass has a complete replacement table.

use std::ops::ControlFlow;

use sqlparser::ast::{
    ColumnOption, CreateTable, Expr, Ident, NamedWindowDefinition, ObjectName, Query, SelectItem,
    SetExpr, Statement, TableAlias, TableConstraint, TableFactor, Value, Visit, Visitor,
    WindowType,
};

use crate::config::ObfuscationConfig;
use crate::error::{Result, SqlMaskError};
use crate::mapper::NameMapper;
use crate::models::IdentifierKind;

/// Registers every name of one statement with the mapper.
pub fn harvest(
    statement: &Statement,
    mapper: &mut NameMapper,
    config: &ObfuscationConfig,
) -> Result<()> {
    QueryHarvester::new(mapper, config).harvest(statement)
}

/// Visitor that records relation names, aliases, CTE and window names, and
/// string literals.
pub struct QueryHarvester<'a> {
    mapper: &'a mut NameMapper,
    config: &'a ObfuscationConfig,
}

impl<'a> QueryHarvester<'a> {
    pub fn new(mapper: &'a mut NameMapper, config: &'a ObfuscationConfig) -> Self {
        Self { mapper, config }
    }

    /// Walks `statement`, stopping at the first mapper error.
    pub fn harvest(&mut self, statement: &Statement) -> Result<()> {
        match statement.visit(self) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(error) => Err(error),
        }
    }

    fn register(&mut self, kind: IdentifierKind, name: &str) -> Result<()> {
        self.mapper.resolve(kind, name).map(|_| ())
    }

    fn register_object_name(&mut self, name: &ObjectName) -> Result<()> {
        let last = name.0.len().saturating_sub(1);
        for (position, part) in name.0.iter().enumerate() {
            let kind = if position == last {
                IdentifierKind::Table
            } else {
                IdentifierKind::Qualifier
            };
            self.register(kind, &part.value)?;
        }
        Ok(())
    }

    fn register_alias(&mut self, alias: &Option<TableAlias>) -> Result<()> {
        match alias {
            Some(alias) => self.register(IdentifierKind::Alias, &alias.name.value),
            None => Ok(()),
        }
    }

    fn register_optional(&mut self, kind: IdentifierKind, ident: &Option<Ident>) -> Result<()> {
        match ident {
            Some(ident) => self.register(kind, &ident.value),
            None => Ok(()),
        }
    }

    fn collect_query(&mut self, query: &Query) -> Result<()> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.register(IdentifierKind::Cte, &cte.alias.name.value)?;
            }
        }
        self.collect_set_expr(&query.body)
    }

    /// Projection and window names of every `SELECT` in a set expression.
    /// Nested queries are reached separately by the visitor.
    fn collect_set_expr(&mut self, body: &SetExpr) -> Result<()> {
        match body {
            SetExpr::Select(select) => {
                for item in &select.projection {
                    self.collect_select_item(item)?;
                }
                for NamedWindowDefinition(name, _) in &select.named_window {
                    self.register(IdentifierKind::Window, &name.value)?;
                }
                Ok(())
            }
            SetExpr::SetOperation { left, right, .. } => {
                self.collect_set_expr(left)?;
                self.collect_set_expr(right)
            }
            _ => Ok(()),
        }
    }

    fn collect_select_item(&mut self, item: &SelectItem) -> Result<()> {
        match item {
            SelectItem::ExprWithAlias { alias, .. } => {
                if self.config.is_exempt_alias(&alias.value) {
                    tracing::trace!(alias = %alias.value, "Alias exempt from obfuscation");
                    return Ok(());
                }
                self.register(IdentifierKind::Alias, &alias.value)
            }
            SelectItem::QualifiedWildcard(name, _) => self.register_object_name(name),
            _ => Ok(()),
        }
    }

    fn collect_table_factor(&mut self, factor: &TableFactor) -> Result<()> {
        match factor {
            TableFactor::Table { alias, .. }
            | TableFactor::Derived { alias, .. }
            | TableFactor::TableFunction { alias, .. }
            | TableFactor::Function { alias, .. }
            | TableFactor::UNNEST { alias, .. }
            | TableFactor::JsonTable { alias, .. }
            | TableFactor::OpenJsonTable { alias, .. }
            | TableFactor::NestedJoin { alias, .. }
            | TableFactor::Pivot { alias, .. }
            | TableFactor::Unpivot { alias, .. }
            | TableFactor::MatchRecognize { alias, .. } => self.register_alias(alias),
            #[allow(unreachable_patterns)]
            other => Err(SqlMaskError::unsupported(
                format!("table factor `{}`", other),
                "query harvesting",
            )),
        }
    }

    fn collect_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Function(function) => match &function.over {
                Some(WindowType::NamedWindow(name)) => {
                    self.register(IdentifierKind::Window, &name.value)
                }
                Some(WindowType::WindowSpec(spec)) => {
                    self.register_optional(IdentifierKind::Window, &spec.window_name)
                }
                None => Ok(()),
            },
            Expr::Value(value) => match string_literal(value) {
                Some(text) => self.register(IdentifierKind::Literal, text),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Table definitions appearing among queries contribute their names
    /// without being rewritten.
    fn collect_create_table(&mut self, create: &CreateTable) -> Result<()> {
        self.register_object_name(&create.name)?;

        for column in &create.columns {
            self.register(IdentifierKind::Column, &column.name.value)?;
            for option in &column.options {
                self.register_optional(IdentifierKind::Constraint, &option.name)?;
                if let ColumnOption::ForeignKey { foreign_table, .. } = &option.option {
                    self.register_object_name(foreign_table)?;
                }
            }
        }

        for constraint in &create.constraints {
            match constraint {
                TableConstraint::ForeignKey {
                    name,
                    foreign_table,
                    ..
                } => {
                    self.register_optional(IdentifierKind::Constraint, name)?;
                    self.register_object_name(foreign_table)?;
                }
                TableConstraint::Unique {
                    name, index_name, ..
                }
                | TableConstraint::PrimaryKey {
                    name, index_name, ..
                } => {
                    self.register_optional(IdentifierKind::Constraint, name)?;
                    self.register_optional(IdentifierKind::Index, index_name)?;
                }
                TableConstraint::Check { name, .. } => {
                    self.register_optional(IdentifierKind::Constraint, name)?;
                }
                TableConstraint::Index { name, .. } => {
                    self.register_optional(IdentifierKind::Index, name)?;
                }
                TableConstraint::FulltextOrSpatial { opt_index_name, .. } => {
                    self.register_optional(IdentifierKind::Index, opt_index_name)?;
                }
                #[allow(unreachable_patterns)]
                _ => {}
            }
        }
        Ok(())
    }
}

impl Visitor for QueryHarvester<'_> {
    type Break = SqlMaskError;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        match statement {
            Statement::CreateTable(create) => flow(self.collect_create_table(create)),
            _ => ControlFlow::Continue(()),
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        flow(self.collect_query(query))
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        flow(self.register_object_name(relation))
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        flow(self.collect_table_factor(table_factor))
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        flow(self.collect_expr(expr))
    }
}

fn flow(result: Result<()>) -> ControlFlow<SqlMaskError> {
    match result {
        Ok(()) => ControlFlow::Continue(()),
        Err(error) => ControlFlow::Break(error),
    }
}

/// Text of any string-literal form; `None` for numbers, booleans, byte and
/// hex strings, and placeholders.
fn string_literal(value: &Value) -> Option<&str> {
    match value {
        Value::SingleQuotedString(text)
        | Value::DoubleQuotedString(text)
        | Value::TripleSingleQuotedString(text)
        | Value::TripleDoubleQuotedString(text)
        | Value::EscapedStringLiteral(text)
        | Value::UnicodeStringLiteral(text)
        | Value::NationalStringLiteral(text)
        | Value::SingleQuotedRawStringLiteral(text)
        | Value::DoubleQuotedRawStringLiteral(text)
        | Value::TripleSingleQuotedRawStringLiteral(text)
        | Value::TripleDoubleQuotedRawStringLiteral(text) => Some(text.as_str()),
        Value::DollarQuotedString(quoted) => Some(quoted.value.as_str()),
        _ => None,
    }
}
