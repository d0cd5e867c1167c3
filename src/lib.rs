//! An embedded SQL-like query engine over live in-memory monitoring snapshots
//!
//! Monitoring front ends (a wire-protocol shim, a REST layer) hand a statement
//! string to [`QueryEngine::execute`] together with a [`Catalog`] that maps
//! table names to ordered column definitions and live-snapshot callbacks. The
//! engine tokenizes the statement, resolves tables and columns against the
//! catalog, materializes and joins the referenced snapshots, filters, groups
//! and renders the result as text cells. Tables are query-scoped views over
//! data the caller owns; nothing persists inside the engine.
//!
//! ```
//! use std::sync::Arc;
//! use vigil_sql::{
//!     ColumnDef, MemoryCatalog, QueryEngine, ShapeInterner, Table, Value, ValueType,
//! };
//!
//! let interner = Arc::new(ShapeInterner::new());
//! let host = Arc::new(Table::new(interner));
//! host.append([Value::Uint(1), Value::text("alpha")].into_iter().collect())?;
//! host.append([Value::Uint(2), Value::text("beta")].into_iter().collect())?;
//!
//! let catalog = Arc::new(MemoryCatalog::new());
//! catalog.register_live(
//!     "host",
//!     vec![
//!         ColumnDef::new("id", ValueType::Uint).primary_key(),
//!         ColumnDef::new("name", ValueType::Text),
//!     ],
//!     host,
//! );
//!
//! let engine = QueryEngine::new(catalog);
//! let output = engine.execute("SELECT name FROM host WHERE id=2")?;
//! let result = output.into_rows().unwrap();
//! assert_eq!(result.rows, vec![vec!["beta".to_string()]]);
//! # Ok::<(), vigil_sql::Error>(())
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod parsing;
pub mod planning;
pub mod types;

pub use catalog::{Catalog, ColumnDef, KeyKind, MemoryCatalog, TableDef};
pub use config::EngineConfig;
pub use engine::{QueryEngine, StatementOutput};
pub use error::{Error, Result};
pub use execution::{OutputColumn, SelectOutput};
pub use types::row::Row;
pub use types::shape::{RowShape, ShapeInterner};
pub use types::table::Table;
pub use types::value::{CmpOp, Value, ValueType};
