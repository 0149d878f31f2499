//! End-to-end tests for the obfuscation pipeline
//!
//! These drive `Obfuscator` through both phases over in-memory text and
//! over files in a temporary directory.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::fs;

use sqlmask_core::{
    ObfuscationConfig, Obfuscator, RunPaths, SchemaShape, SqlDialect, SqlMaskError,
};

const PARENT_CHILD: &str = "\
CREATE TABLE parent (id INT PRIMARY KEY);
CREATE TABLE child (id INT, parent_id INT, FOREIGN KEY (parent_id) REFERENCES parent(id));
";

const SHOP: &str = "\
CREATE TABLE `order_lines` (
  `line_id` INT PRIMARY KEY,
  `order_id` INT NOT NULL,
  `product_id` INT NOT NULL,
  `quantity` INT,
  CONSTRAINT `fk_line_order` FOREIGN KEY (`order_id`) REFERENCES `orders` (`order_id`),
  CONSTRAINT `fk_line_product` FOREIGN KEY (`product_id`) REFERENCES `products` (`product_id`)
);
CREATE TABLE `orders` (
  `order_id` INT PRIMARY KEY,
  `customer_id` INT REFERENCES `customers` (`customer_id`),
  `placed_at` DATETIME
);
CREATE TABLE `products` (`product_id` INT PRIMARY KEY, `title` VARCHAR(120));
CREATE TABLE `customers` (`customer_id` INT PRIMARY KEY, `email` VARCHAR(255));
CREATE INDEX `idx_orders_placed` ON `orders` (`placed_at`);
";

fn position_of(schema: &str, table: &str) -> usize {
    schema
        .find(&format!("CREATE TABLE `{table}`"))
        .or_else(|| schema.find(&format!("CREATE TABLE {table} ")))
        .expect("table emitted")
}

#[test]
fn test_end_to_end_parent_before_child() {
    let query = "SELECT parent_id FROM child;";
    let mut obfuscator = Obfuscator::new(ObfuscationConfig::default()).unwrap();

    let schema = obfuscator.obfuscate_schema(PARENT_CHILD, "schema.sql").unwrap();
    obfuscator.harvest_queries(query, "query.sql").unwrap();
    let queries = obfuscator.substitute_queries([query]).unwrap();

    let mapper = obfuscator.mapper();
    let parent = mapper.get("parent").unwrap();
    let child = mapper.get("child").unwrap();
    let parent_id = mapper.get("parent_id").unwrap();

    assert!(position_of(&schema, parent) < position_of(&schema, child));
    assert!(schema.contains(parent_id));
    assert_eq!(queries, format!("SELECT {parent_id} FROM {child};"));
}

#[test]
fn test_end_to_end_every_referenced_table_precedes_its_referrer() {
    let mut obfuscator = Obfuscator::new(ObfuscationConfig::default()).unwrap();
    let schema = obfuscator.obfuscate_schema(SHOP, "shop.sql").unwrap();

    let mapper = obfuscator.mapper();
    let at = |original: &str| position_of(&schema, mapper.get(original).unwrap());

    assert!(at("orders") < at("order_lines"));
    assert!(at("products") < at("order_lines"));
    assert!(at("customers") < at("orders"));

    for original in [
        "order_lines",
        "orders",
        "products",
        "customers",
        "line_id",
        "order_id",
        "product_id",
        "quantity",
        "customer_id",
        "placed_at",
        "email",
        "title",
        "fk_line_order",
        "fk_line_product",
        "idx_orders_placed",
    ] {
        assert!(!schema.contains(original), "{original} leaked: {schema}");
    }

    // Indexes follow the table they belong to.
    let lines: Vec<&str> = schema.lines().collect();
    let index_at = lines
        .iter()
        .position(|line| line.starts_with("CREATE INDEX"))
        .unwrap();
    let owner = lines[..index_at].last().unwrap();
    assert!(lines[index_at].contains(mapper.get("idx_orders_placed").unwrap()));
    assert!(owner.starts_with(&format!("CREATE TABLE `{}`", mapper.get("orders").unwrap())));
}

#[test]
fn test_end_to_end_rendered_schema_keeps_its_shape() {
    let mut obfuscator = Obfuscator::new(ObfuscationConfig::default()).unwrap();
    let schema = obfuscator.obfuscate_schema(SHOP, "shop.sql").unwrap();

    let before = SchemaShape::from_sql(SHOP, SqlDialect::MySql, "shop.sql").unwrap();
    let after = SchemaShape::from_sql(&schema, SqlDialect::MySql, "rendered").unwrap();

    before.ensure_matches(&after).unwrap();
    assert_eq!(after.tables.len(), 4);
    assert_eq!(after.foreign_keys(), 3);
    assert_eq!(after.indexes, 1);
}

#[test]
fn test_end_to_end_query_formatting_survives() {
    let query = "\
-- monthly totals
SELECT o.customer_id,
       SUM(l.quantity) AS units,   COUNT(*) AS LINE_COUNT
FROM   orders o
JOIN   order_lines l ON l.order_id = o.order_id
WHERE  o.placed_at >= '2024-01-01'
GROUP  BY o.customer_id;
";
    let mut obfuscator = Obfuscator::new(ObfuscationConfig::default()).unwrap();
    obfuscator.obfuscate_schema(SHOP, "shop.sql").unwrap();
    obfuscator.harvest_queries(query, "totals.sql").unwrap();
    let output = obfuscator.substitute_queries([query]).unwrap();

    let mapper = obfuscator.mapper();
    assert_eq!(output.lines().count(), query.lines().count());
    assert!(output.starts_with("-- monthly totals\n"));
    assert!(output.contains("AS LINE_COUNT"));
    assert!(output.contains(&format!("AS {}", mapper.get("units").unwrap())));
    assert!(output.contains(&format!(
        "JOIN   {} l ON l.{} = o.{}",
        mapper.get("order_lines").unwrap(),
        mapper.get("order_id").unwrap(),
        mapper.get("order_id").unwrap()
    )));
    assert!(!output.contains("customer_id"));
}

#[test]
fn test_end_to_end_same_seed_same_mapping() {
    let run = |seed: u32| {
        let mut obfuscator =
            Obfuscator::new(ObfuscationConfig::default().with_seed(seed)).unwrap();
        obfuscator.obfuscate_schema(SHOP, "shop.sql").unwrap()
    };

    assert_eq!(run(10), run(10));
    assert_ne!(run(10), run(11));
}

#[test]
fn test_end_to_end_failed_run_leaves_directory_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("schema.sql"),
        "CREATE TABLE accounts (id INT, balance INT CHECK (balance >= 0));\n",
    )
    .unwrap();
    fs::create_dir(root.join("queries")).unwrap();
    fs::write(root.join("queries").join("q.sql"), "SELECT balance FROM accounts;\n").unwrap();

    let paths = RunPaths {
        schema_input: root.join("schema.sql"),
        schema_output: root.join("schema.out.sql"),
        query_dir: root.join("queries"),
        query_output: root.join("queries.out.sql"),
        mapping_output: Some(root.join("mapping.json")),
    };
    let mut obfuscator = Obfuscator::new(ObfuscationConfig::default()).unwrap();
    let err = obfuscator.run(&paths).unwrap_err();

    assert!(matches!(err, SqlMaskError::UnsupportedConstruct { .. }));
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["queries", "schema.sql"]);
}
