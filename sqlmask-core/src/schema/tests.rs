use super::*;
use crate::config::{ObfuscationConfig, SqlDialect};
use crate::parser::{parse_statements, render};

fn rewrite_all(sql: &str, mapper: &mut NameMapper) -> Result<Vec<RewrittenStatement>> {
    rewrite_with(sql, SqlDialect::MySql, mapper)
}

fn rewrite_with(
    sql: &str,
    dialect: SqlDialect,
    mapper: &mut NameMapper,
) -> Result<Vec<RewrittenStatement>> {
    let statements = parse_statements(sql, dialect, "schema.sql")?;
    let mut rewriter = SchemaRewriter::new(mapper);
    statements
        .into_iter()
        .map(|statement| rewriter.rewrite(statement))
        .collect()
}

fn table(rewritten: RewrittenStatement) -> TableDefinition {
    match rewritten {
        RewrittenStatement::Table(definition) => *definition,
        RewrittenStatement::Index { .. } => panic!("expected a table definition"),
    }
}

#[test]
fn test_table_identifiers_are_rewritten() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten = rewrite_all(
        "CREATE TABLE customers (id INT PRIMARY KEY, email VARCHAR(255) NOT NULL, \
         UNIQUE KEY uk_email (email));",
        &mut mapper,
    )
    .unwrap();
    let definition = table(rewritten.remove(0));

    let customers = mapper.get("customers").unwrap().to_string();
    let email = mapper.get("email").unwrap().to_string();
    let uk_email = mapper.get("uk_email").unwrap().to_string();

    assert_eq!(definition.name, customers);
    assert_eq!(definition.original_name, "customers");
    assert_eq!(definition.columns, vec!["id".to_string(), email.clone()]);
    assert_eq!(definition.indexes, vec![uk_email.clone()]);
    assert!(definition.is_leaf());

    let sql = render(&definition.statement);
    assert!(!sql.contains("customers"), "{sql}");
    assert!(!sql.contains("email"), "{sql}");
    assert!(sql.contains(&customers));
    assert!(sql.contains(&uk_email));
}

#[test]
fn test_foreign_keys_become_dependencies() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let rewritten = rewrite_all(
        "CREATE TABLE parent (id INT PRIMARY KEY);\n\
         CREATE TABLE child (id INT, parent_id INT, \
         CONSTRAINT fk_parent FOREIGN KEY (parent_id) REFERENCES parent (id));",
        &mut mapper,
    )
    .unwrap();
    let mut definitions: Vec<TableDefinition> = rewritten.into_iter().map(table).collect();
    let child = definitions.remove(1);

    let parent = mapper.get("parent").unwrap().to_string();
    assert_eq!(child.dependencies, vec![parent]);
    assert_eq!(
        child.constraints,
        vec![mapper.get("fk_parent").unwrap().to_string()]
    );

    let sql = render(&child.statement);
    assert!(!sql.contains("parent_id"), "{sql}");
    assert!(!sql.contains("fk_parent"), "{sql}");
}

#[test]
fn test_inline_references_become_dependencies() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten = rewrite_all(
        "CREATE TABLE orders (id INT, customer_id INT REFERENCES customers (id));",
        &mut mapper,
    )
    .unwrap();
    let orders = table(rewritten.remove(0));

    assert_eq!(
        orders.dependencies,
        vec![mapper.get("customers").unwrap().to_string()]
    );
}

#[test]
fn test_repeated_references_recorded_once() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten = rewrite_all(
        "CREATE TABLE transfers (id INT, source_id INT, target_id INT, \
         FOREIGN KEY (source_id) REFERENCES accounts (id), \
         FOREIGN KEY (target_id) REFERENCES accounts (id));",
        &mut mapper,
    )
    .unwrap();
    let transfers = table(rewritten.remove(0));
    assert_eq!(transfers.dependencies.len(), 1);
}

#[test]
fn test_qualified_names_rewrite_every_part() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten =
        rewrite_all("CREATE TABLE shop.invoices (total INT);", &mut mapper).unwrap();
    let invoices = table(rewritten.remove(0));

    let shop = mapper.get("shop").unwrap().to_string();
    assert_eq!(invoices.qualifier, Some(shop.clone()));
    assert_eq!(invoices.name, mapper.get("invoices").unwrap());

    let sql = render(&invoices.statement);
    assert!(sql.contains(&format!("{}.{}", shop, invoices.name)), "{sql}");
}

#[test]
fn test_quote_style_is_preserved() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten = rewrite_all("CREATE TABLE `accounts` (`balance` INT);", &mut mapper).unwrap();
    let accounts = table(rewritten.remove(0));

    let sql = render(&accounts.statement);
    let balance = mapper.get("balance").unwrap();
    assert!(sql.contains(&format!("`{}`", accounts.name)), "{sql}");
    assert!(sql.contains(&format!("`{}`", balance)), "{sql}");
}

#[test]
fn test_check_constraints_are_rejected() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let err = rewrite_all(
        "CREATE TABLE payments (amount INT, CHECK (amount > 0));",
        &mut mapper,
    )
    .unwrap_err();
    assert!(matches!(err, SqlMaskError::UnsupportedConstruct { .. }));

    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let err = rewrite_all("CREATE TABLE payments (amount INT CHECK (amount > 0));", &mut mapper)
        .unwrap_err();
    assert!(matches!(err, SqlMaskError::UnsupportedConstruct { .. }));
}

#[test]
fn test_other_statements_are_rejected() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let err = rewrite_all("DROP TABLE customers;", &mut mapper).unwrap_err();
    match err {
        SqlMaskError::UnsupportedConstruct { construct, .. } => {
            assert_eq!(construct, "DROP TABLE statement");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_partition_and_order_clauses_are_rewritten() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten = rewrite_with(
        "CREATE TABLE events_log (happened INT, region INT) PARTITION BY region;\n\
         CREATE TABLE metrics (sample_at INT) ORDER BY (sample_at);",
        SqlDialect::Generic,
        &mut mapper,
    )
    .unwrap();
    let events = render(&table(rewritten.remove(0)).statement);
    let metrics = render(&table(rewritten.remove(0)).statement);

    let region = mapper.get("region").unwrap();
    let sample_at = mapper.get("sample_at").unwrap();
    assert!(events.contains(&format!("PARTITION BY {region}")), "{events}");
    assert!(!events.contains("region"), "{events}");
    assert!(metrics.contains(&format!("ORDER BY ({sample_at})")), "{metrics}");
    assert!(!metrics.contains("sample_at"), "{metrics}");
}

#[test]
fn test_hive_partitioning_is_rejected() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let err = rewrite_with(
        "CREATE TABLE sales (amount INT) PARTITIONED BY (region INT);",
        SqlDialect::Generic,
        &mut mapper,
    )
    .unwrap_err();
    match err {
        SqlMaskError::UnsupportedConstruct { construct, .. } => {
            assert_eq!(construct, "PARTITIONED BY");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_create_table_as_select_is_rejected() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let err = rewrite_all(
        "CREATE TABLE archive AS SELECT * FROM orders;",
        &mut mapper,
    )
    .unwrap_err();
    assert!(matches!(err, SqlMaskError::UnsupportedConstruct { .. }));
}

#[test]
fn test_create_index_attaches_to_table() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let mut rewritten = rewrite_all(
        "CREATE TABLE orders (id INT, placed_at INT);\n\
         CREATE INDEX idx_placed ON orders (placed_at);",
        &mut mapper,
    )
    .unwrap();

    match rewritten.remove(1) {
        RewrittenStatement::Index { table, statement } => {
            assert_eq!(table, mapper.get("orders").unwrap());
            let sql = render(&statement);
            assert!(!sql.contains("placed_at"), "{sql}");
            assert!(!sql.contains("idx_placed"), "{sql}");
            assert!(sql.contains(mapper.get("placed_at").unwrap()));
        }
        RewrittenStatement::Table(_) => panic!("expected an index"),
    }
}

#[test]
fn test_shared_column_names_map_consistently() {
    let mut mapper = NameMapper::new(&ObfuscationConfig::default());
    let rewritten = rewrite_all(
        "CREATE TABLE authors (created_at INT);\nCREATE TABLE books (created_at INT);",
        &mut mapper,
    )
    .unwrap();
    let definitions: Vec<TableDefinition> = rewritten.into_iter().map(table).collect();
    assert_eq!(definitions[0].columns, definitions[1].columns);
}

#[test]
fn test_statement_kind_takes_leading_keywords() {
    let statements =
        parse_statements("DROP TABLE customers", SqlDialect::Generic, "inline").unwrap();
    assert_eq!(statement_kind(&statements[0]), "DROP TABLE");
}
