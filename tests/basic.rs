//! Basic SELECT behavior over a single table

mod common;

use common::{monitoring_context, TestContext};
use vigil_sql::{ColumnDef, Error, Value, ValueType};

#[test]
fn select_star_in_schema_order() {
    let ctx = monitoring_context();
    let output = ctx.query("SELECT * FROM host");
    let names: Vec<&str> = output.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name"]);
    assert_cells!(
        ctx,
        "SELECT * FROM host",
        vec![vec!["1", "alpha"], vec!["2", "beta"]]
    );
}

#[test]
fn filter_by_primary_key() {
    let ctx = monitoring_context();
    assert_cells!(ctx, "SELECT name FROM host WHERE id=2", vec![vec!["beta"]]);
}

#[test]
fn where_drops_every_non_matching_row() {
    let ctx = monitoring_context();
    assert_rows!(ctx, "SELECT name FROM host WHERE id=3", 0);
    assert_rows!(ctx, "SELECT name FROM host WHERE id IN (1, 3)", 1);
    assert_cells!(
        ctx,
        "SELECT name FROM host WHERE id IN (1, 3)",
        vec![vec!["alpha"]]
    );
}

#[test]
fn conjunction_narrows_the_result() {
    let ctx = monitoring_context();
    assert_rows!(
        ctx,
        "SELECT name FROM host WHERE id=2 AND name='beta'",
        1
    );
    assert_rows!(
        ctx,
        "SELECT name FROM host WHERE id=2 AND name='alpha'",
        0
    );
}

#[test]
fn output_descriptors_carry_alias_and_table() {
    let ctx = monitoring_context();
    let output = ctx.query("SELECT name AS host_name FROM host h");
    assert_eq!(output.columns.len(), 1);
    let column = &output.columns[0];
    assert_eq!(column.name, "name");
    assert_eq!(column.alias.as_deref(), Some("host_name"));
    assert_eq!(column.table, "host");
    assert_eq!(column.table_alias.as_deref(), Some("h"));
}

#[test]
fn qualified_wildcard_expands_one_table() {
    let ctx = monitoring_context();
    assert_cells!(
        ctx,
        "SELECT h.* FROM host h WHERE h.id=1",
        vec![vec!["1", "alpha"]]
    );
}

#[test]
fn order_by_and_limit() {
    let ctx = monitoring_context();
    assert_cells!(
        ctx,
        "SELECT name FROM host ORDER BY name DESC",
        vec![vec!["beta"], vec!["alpha"]]
    );
    assert_cells!(
        ctx,
        "SELECT name FROM host ORDER BY id ASC LIMIT 1",
        vec![vec!["alpha"]]
    );
    assert_cells!(ctx, "SELECT name FROM host LIMIT 1", vec![vec!["alpha"]]);
}

#[test]
fn identical_statement_renders_identically() {
    let ctx = monitoring_context();
    let statement = "SELECT name FROM host WHERE id=1";
    let first = ctx.query(statement);
    let second = ctx.query(statement);
    assert_eq!(first, second);
}

#[test]
fn comparison_operators_from_the_gap() {
    let ctx = monitoring_context();
    assert_rows!(ctx, "SELECT name FROM host WHERE id<=1", 1);
    assert_rows!(ctx, "SELECT name FROM host WHERE id<>1", 1);
    assert_rows!(ctx, "SELECT name FROM host WHERE id!=1", 1);
    assert_rows!(ctx, "SELECT name FROM host WHERE id>=1", 2);
}

#[test]
fn unknown_table_and_column_abort_the_statement() {
    let ctx = monitoring_context();
    assert_eq!(
        ctx.engine.execute("SELECT name FROM nosuch").unwrap_err(),
        Error::TableNotFound("nosuch".into())
    );
    assert_eq!(
        ctx.engine.execute("SELECT nosuch FROM host").unwrap_err(),
        Error::ColumnNotFound("nosuch".into())
    );
}

#[test]
fn unqualified_column_in_two_tables_is_ambiguous() {
    let ctx = TestContext::new();
    ctx.table(
        "item",
        vec![ColumnDef::new("name", ValueType::Text)],
        &[&[Value::text("cpu")]],
    );
    ctx.table(
        "trigger",
        vec![ColumnDef::new("name", ValueType::Text)],
        &[&[Value::text("high load")]],
    );
    assert_eq!(
        ctx.engine
            .execute("SELECT name FROM item, trigger")
            .unwrap_err(),
        Error::AmbiguousColumn("name".into())
    );
}

#[test]
fn cross_type_predicate_is_a_type_error() {
    let ctx = monitoring_context();
    assert_eq!(
        ctx.engine
            .execute("SELECT name FROM host WHERE name=1")
            .unwrap_err(),
        Error::UndefinedOperation {
            op: "=",
            left: ValueType::Text,
            right: ValueType::Int,
        }
    );
}
