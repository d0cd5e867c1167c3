//! Schema catalog boundary
//!
//! The engine never owns the monitoring data. A catalog maps a table name to
//! its ordered column definitions and a snapshot callback that hands back the
//! table's current live contents. Front ends (wire shim, REST layer) plug
//! their own catalog in; [`MemoryCatalog`] covers embedders and tests.

use crate::types::table::Table;
use crate::types::value::{Value, ValueType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// How a column participates in keys and index acceleration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    #[default]
    None,
    /// Part of the table's primary key.
    Primary,
    /// Secondary-indexable; joins on this column may build a position index.
    Index,
}

/// One column of a catalog table definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub datatype: ValueType,
    /// Declared text length; text values are truncated to it on write.
    pub length: Option<usize>,
    pub nullable: bool,
    pub key: KeyKind,
    /// Synthesized on INSERT when no value is supplied.
    pub default: Option<Value>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, datatype: ValueType) -> Self {
        ColumnDef {
            name: name.into(),
            datatype,
            length: None,
            nullable: true,
            key: KeyKind::None,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.key = KeyKind::Primary;
        self.nullable = false;
        self
    }

    pub fn indexed(mut self) -> Self {
        if self.key == KeyKind::None {
            self.key = KeyKind::Index;
        }
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        if self.key == KeyKind::Primary {
            return self;
        }
        self.nullable = nullable;
        self
    }

    pub fn length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Snapshot provider: returns the table's current live contents. The handle
/// must not be appended to while a statement iterates it; catalogs hand back
/// either a private copy or a snapshot that stays quiet for the statement's
/// lifetime.
pub type SnapshotFn = Arc<dyn Fn() -> Arc<Table> + Send + Sync>;

/// A catalog table: ordered column definitions plus the snapshot callback.
#[derive(Clone)]
pub struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
    snapshot: SnapshotFn,
}

impl TableDef {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>, snapshot: SnapshotFn) -> Self {
        TableDef {
            name: name.into(),
            columns,
            snapshot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Position and definition of a named column.
    pub fn column(&self, name: &str) -> Option<(usize, &ColumnDef)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
    }

    /// The table's current live contents.
    pub fn snapshot(&self) -> Arc<Table> {
        (self.snapshot)()
    }
}

impl std::fmt::Debug for TableDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDef")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// The catalog handle consumed by the engine.
pub trait Catalog: Send + Sync {
    /// Looks up a table definition by name.
    fn table(&self, name: &str) -> Option<TableDef>;
}

/// A thread-safe in-memory catalog. Registered tables are live: the snapshot
/// callback returns the same handle every time, so INSERTs through the engine
/// are visible to later statements.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: RwLock<HashMap<String, TableDef>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table definition, replacing any previous one of that name.
    pub fn register(&self, def: TableDef) {
        self.tables.write().insert(def.name().to_string(), def);
    }

    /// Registers a definition backed by a fixed live table handle.
    pub fn register_live(
        &self,
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        table: Arc<Table>,
    ) {
        let name = name.into();
        let snapshot: SnapshotFn = Arc::new(move || table.clone());
        self.register(TableDef::new(name, columns, snapshot));
    }
}

impl Catalog for MemoryCatalog {
    fn table(&self, name: &str) -> Option<TableDef> {
        self.tables.read().get(name).cloned()
    }
}
