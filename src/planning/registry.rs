//! Column registry and name resolution
//!
//! Every column reference a statement makes — select list, WHERE, join
//! fields, GROUP BY, ORDER BY — is interned here while parsing, so `col`
//! mentioned in two clauses resolves to the same descriptor. Once the FROM
//! table list is known, `bind` associates each descriptor with its table
//! (explicit qualifier, or implicit only when exactly one table is in scope)
//! and with the schema-declared column definition, and computes its absolute
//! position in the joined row. Evaluation resolves ids to positions through
//! the registry, never by baking positions into the expression tree.

use crate::catalog::{ColumnDef, TableDef};
use crate::error::{Error, Result};
use crate::parsing::expr::Expr;
use crate::types::expression::{ColumnId, Expression};

/// One FROM-clause table with its catalog definition and the absolute column
/// offset of its leaf in the joined row.
#[derive(Clone, Debug)]
pub struct BoundTable {
    pub name: String,
    pub alias: Option<String>,
    pub def: TableDef,
    pub offset: usize,
}

impl BoundTable {
    /// Whether a reference qualifier addresses this table. An alias shadows
    /// the table name.
    pub fn answers_to(&self, qualifier: &str) -> bool {
        match &self.alias {
            Some(alias) => alias == qualifier,
            None => self.name == qualifier,
        }
    }

    /// The name columns of this table are qualified with when the engine
    /// itself generates references (wildcard expansion).
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A registered column reference, bound to its table after `bind`.
#[derive(Clone, Debug)]
pub struct ColumnEntry {
    pub qualifier: Option<String>,
    pub name: String,
    pub table: Option<usize>,
    pub table_name: Option<String>,
    pub table_alias: Option<String>,
    pub position: Option<usize>,
    pub def: Option<ColumnDef>,
}

#[derive(Debug, Default)]
pub struct ColumnRegistry {
    entries: Vec<ColumnEntry>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a (qualifier, column) reference, returning the id of the
    /// existing descriptor when the same reference was seen before.
    pub fn intern(&mut self, qualifier: Option<&str>, name: &str) -> ColumnId {
        if let Some(id) = self.entries.iter().position(|e| {
            e.qualifier.as_deref() == qualifier && e.name == name
        }) {
            return id;
        }
        self.entries.push(ColumnEntry {
            qualifier: qualifier.map(str::to_string),
            name: name.to_string(),
            table: None,
            table_name: None,
            table_alias: None,
            position: None,
            def: None,
        });
        self.entries.len() - 1
    }

    pub fn entry(&self, id: ColumnId) -> &ColumnEntry {
        &self.entries[id]
    }

    /// The absolute position of a bound column in the joined row.
    pub fn position(&self, id: ColumnId) -> Result<usize> {
        self.entries[id]
            .position
            .ok_or_else(|| Error::Internal(format!("column {} not bound", self.entries[id].name)))
    }

    /// Associates every registered reference with a FROM table and its
    /// schema column definition.
    pub fn bind(&mut self, tables: &[BoundTable]) -> Result<()> {
        for entry in &mut self.entries {
            let (table_index, index_in_table, def) =
                lookup_column(entry.qualifier.as_deref(), &entry.name, tables)?;
            let bound = &tables[table_index];
            entry.table = Some(table_index);
            entry.table_name = Some(bound.name.clone());
            entry.table_alias = bound.alias.clone();
            entry.position = Some(bound.offset + index_in_table);
            entry.def = Some(def);
        }
        Ok(())
    }
}

/// Resolves a (qualifier, column) reference against the FROM tables:
/// explicit qualifier, or implicit only when exactly one table carries the
/// column. Returns the table index, the column's index within that table and
/// its definition.
pub(crate) fn lookup_column(
    qualifier: Option<&str>,
    name: &str,
    tables: &[BoundTable],
) -> Result<(usize, usize, ColumnDef)> {
    let table_index = match qualifier {
        Some(qualifier) => tables
            .iter()
            .position(|t| t.answers_to(qualifier))
            .ok_or_else(|| Error::TableNotFound(qualifier.to_string()))?,
        None => {
            let mut matches = tables
                .iter()
                .enumerate()
                .filter(|(_, t)| t.def.column(name).is_some())
                .map(|(i, _)| i);
            let first = matches
                .next()
                .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
            if matches.next().is_some() {
                return Err(Error::AmbiguousColumn(name.to_string()));
            }
            first
        }
    };
    let (index_in_table, def) = tables[table_index].def.column(name).ok_or_else(|| {
        Error::ColumnNotFound(match qualifier {
            Some(q) => format!("{}.{}", q, name),
            None => name.to_string(),
        })
    })?;
    Ok((table_index, index_in_table, def.clone()))
}

/// Lowers a name-based expression into registry-id form, interning every
/// column reference. Wildcards are not valid here; the select compiler
/// expands them before lowering.
pub fn resolve(expr: &Expr, registry: &mut ColumnRegistry) -> Result<Expression> {
    match expr {
        Expr::All | Expr::QualifiedAll(_) => {
            Err(Error::Parse("* is only valid in a select list".into()))
        }
        Expr::Column(qualifier, name) => {
            Ok(Expression::Column(registry.intern(qualifier.as_deref(), name)))
        }
        Expr::Literal(value) => Ok(Expression::Constant(value.clone())),
        Expr::Compare(op, left, right) => Ok(Expression::Compare(
            *op,
            Box::new(resolve(left, registry)?),
            Box::new(resolve(right, registry)?),
        )),
        Expr::And(left, right) => Ok(Expression::And(
            Box::new(resolve(left, registry)?),
            Box::new(resolve(right, registry)?),
        )),
        Expr::InList { expr, list } => Ok(Expression::InList {
            expr: Box::new(resolve(expr, registry)?),
            list: list
                .iter()
                .map(|item| resolve(item, registry))
                .collect::<Result<Vec<_>>>()?,
        }),
        Expr::Aggregate(func, arg) => Ok(Expression::Aggregate(
            *func,
            arg.as_ref()
                .map(|a| resolve(a, registry).map(Box::new))
                .transpose()?,
        )),
    }
}
