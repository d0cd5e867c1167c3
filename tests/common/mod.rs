//! Shared fixtures for the integration suites
#![allow(dead_code)]

use std::sync::{Arc, Once};
use vigil_sql::{
    ColumnDef, EngineConfig, MemoryCatalog, QueryEngine, SelectOutput, ShapeInterner,
    StatementOutput, Table, Value, ValueType,
};

/// Installs a fmt subscriber once so RUST_LOG surfaces engine traces in test
/// output.
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One engine over one in-memory catalog, plus the interner its live tables
/// are built with.
pub struct TestContext {
    pub catalog: Arc<MemoryCatalog>,
    pub interner: Arc<ShapeInterner>,
    pub engine: QueryEngine,
}

impl TestContext {
    pub fn new() -> Self {
        init_tracing();
        let catalog = Arc::new(MemoryCatalog::new());
        let interner = Arc::new(ShapeInterner::new());
        let engine = QueryEngine::with_config(catalog.clone(), EngineConfig::for_testing());
        TestContext {
            catalog,
            interner,
            engine,
        }
    }

    /// Registers a live table with the given rows, returning its handle.
    pub fn table(&self, name: &str, columns: Vec<ColumnDef>, rows: &[&[Value]]) -> Arc<Table> {
        let table = Arc::new(Table::new(self.interner.clone()));
        for values in rows {
            table.append(values.iter().cloned().collect()).unwrap();
        }
        self.catalog.register_live(name, columns, table.clone());
        table
    }

    /// Runs a SELECT, panicking on errors or non-SELECT output.
    pub fn query(&self, statement: &str) -> SelectOutput {
        match self.engine.execute(statement) {
            Ok(StatementOutput::Rows(output)) => output,
            Ok(other) => panic!("expected a result set from {statement:?}, got {other:?}"),
            Err(err) => panic!("{statement:?} failed: {err}"),
        }
    }

    /// Runs an INSERT or UPDATE, returning the modified-row count.
    pub fn exec(&self, statement: &str) -> usize {
        match self.engine.execute(statement) {
            Ok(StatementOutput::Modified(count)) => count,
            Ok(other) => panic!("expected a row count from {statement:?}, got {other:?}"),
            Err(err) => panic!("{statement:?} failed: {err}"),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The host/hostgroup pair most scenarios run against:
/// host (1, alpha), (2, beta); hostgroup (1, g1), (1, g2).
pub fn monitoring_context() -> TestContext {
    let ctx = TestContext::new();
    ctx.table(
        "host",
        vec![
            ColumnDef::new("id", ValueType::Uint).primary_key(),
            ColumnDef::new("name", ValueType::Text),
        ],
        &[
            &[Value::Uint(1), Value::text("alpha")],
            &[Value::Uint(2), Value::text("beta")],
        ],
    );
    ctx.table(
        "hostgroup",
        vec![
            ColumnDef::new("host_id", ValueType::Uint).indexed(),
            ColumnDef::new("groupname", ValueType::Text),
        ],
        &[
            &[Value::Uint(1), Value::text("g1")],
            &[Value::Uint(1), Value::text("g2")],
        ],
    );
    ctx
}

/// Asserts a SELECT's rendered cells, row by row.
#[macro_export]
macro_rules! assert_cells {
    ($ctx:expr, $sql:expr, $expected:expr) => {{
        let output = $ctx.query($sql);
        let expected: Vec<Vec<&str>> = $expected;
        let actual: Vec<Vec<&str>> = output
            .rows
            .iter()
            .map(|row| row.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(actual, expected, "statement: {}", $sql);
    }};
}

/// Asserts a SELECT's emitted row count.
#[macro_export]
macro_rules! assert_rows {
    ($ctx:expr, $sql:expr, $count:expr) => {{
        let output = $ctx.query($sql);
        assert_eq!(output.rows.len(), $count, "statement: {}", $sql);
    }};
}
