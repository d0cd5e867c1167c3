//! Query-scoped tables
//!
//! A table is an append-only collection of frozen rows sharing one shape,
//! protected by a reader/writer lock. Tables are cheap, short-lived views:
//! the catalog materializes one per referenced table per statement, joins
//! produce intermediate ones, and all of them are dropped when the statement
//! finishes. The shape is derived lazily from the first row, so a
//! materialization callback does not need to declare anything up front.
//!
//! Secondary indexes map a column value to row positions. They are built
//! lazily per column against a table that is read-only for the rest of the
//! query; append keeps already-built indexes current, but there is no
//! invalidation protocol beyond that.

use crate::error::{Error, Result};
use crate::types::row::{Row, RowRef};
use crate::types::shape::{RowShape, ShapeInterner};
use crate::types::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct TableInner {
    shape: Option<RowShape>,
    rows: Vec<RowRef>,
    /// Column position -> value -> positions of rows holding that value.
    indexes: HashMap<usize, HashMap<Value, Vec<usize>>>,
}

pub struct Table {
    interner: Arc<ShapeInterner>,
    inner: RwLock<TableInner>,
}

impl Table {
    pub fn new(interner: Arc<ShapeInterner>) -> Self {
        Table {
            interner,
            inner: RwLock::new(TableInner::default()),
        }
    }

    /// Builds a table with a known shape and row set, used by joins and
    /// result copies where every row already passed a shape check.
    pub(crate) fn from_parts(
        interner: Arc<ShapeInterner>,
        shape: Option<RowShape>,
        rows: Vec<RowRef>,
    ) -> Self {
        Table {
            interner,
            inner: RwLock::new(TableInner {
                shape,
                rows,
                indexes: HashMap::new(),
            }),
        }
    }

    pub(crate) fn interner(&self) -> &Arc<ShapeInterner> {
        &self.interner
    }

    /// Appends a row, freezing it. The shared shape is derived from the first
    /// row once a second one arrives; every later row must match it.
    pub fn append(&self, row: Row) -> Result<()> {
        let mut inner = self.inner.write();
        match &inner.shape {
            Some(shape) => row.check_shape(shape)?,
            None => {
                if let Some(first) = inner.rows.first() {
                    // Second row: fix the shape from the first, then check.
                    let shape = self.interner.intern(&first.shape_types());
                    row.check_shape(&shape)?;
                    inner.shape = Some(shape);
                }
            }
        }
        let position = inner.rows.len();
        let row: RowRef = Arc::new(row);
        for (column, index) in inner.indexes.iter_mut() {
            if let Some(value) = row.get(*column) {
                if !value.is_null() {
                    index.entry(value.clone()).or_default().push(position);
                }
            }
        }
        inner.rows.push(row);
        Ok(())
    }

    /// Replaces the row at `position` with a shape-checked substitute. Used
    /// by UPDATE; positions of all other rows are unaffected.
    pub fn replace(&self, position: usize, row: Row) -> Result<()> {
        let mut inner = self.inner.write();
        if position >= inner.rows.len() {
            return Err(Error::Internal(format!(
                "row position {} out of range",
                position
            )));
        }
        let shape = match &inner.shape {
            Some(shape) => Some(shape.clone()),
            None if inner.rows.len() == 1 => {
                Some(self.interner.intern(&inner.rows[0].shape_types()))
            }
            None => None,
        };
        if let Some(shape) = &shape {
            row.check_shape(shape)?;
        }
        if !inner.indexes.is_empty() {
            // Replacement invalidates position lists wholesale; rebuild below.
            let columns: Vec<usize> = inner.indexes.keys().copied().collect();
            inner.rows[position] = Arc::new(row);
            for column in columns {
                let rebuilt = build_position_index(&inner.rows, column);
                inner.indexes.insert(column, rebuilt);
            }
        } else {
            inner.rows[position] = Arc::new(row);
        }
        Ok(())
    }

    pub fn shape(&self) -> Option<RowShape> {
        let inner = self.inner.read();
        match &inner.shape {
            Some(shape) => Some(shape.clone()),
            // Single-row tables have not fixed their shape yet; derive a view.
            None => inner
                .rows
                .first()
                .map(|row| self.interner.intern(&row.shape_types())),
        }
    }

    pub fn row_count(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn column_count(&self) -> usize {
        let inner = self.inner.read();
        match &inner.shape {
            Some(shape) => shape.len(),
            None => inner.rows.first().map(|row| row.len()).unwrap_or(0),
        }
    }

    /// A snapshot of the row handles, in append order.
    pub fn rows(&self) -> Vec<RowRef> {
        self.inner.read().rows.clone()
    }

    pub fn get(&self, position: usize) -> Option<RowRef> {
        self.inner.read().rows.get(position).cloned()
    }

    /// Builds the secondary index for a column if it is not present yet.
    /// Null values are skipped; they never match an equality lookup.
    pub fn build_index(&self, column: usize) {
        let mut inner = self.inner.write();
        if inner.indexes.contains_key(&column) {
            return;
        }
        let index = build_position_index(&inner.rows, column);
        inner.indexes.insert(column, index);
    }

    pub fn has_index(&self, column: usize) -> bool {
        self.inner.read().indexes.contains_key(&column)
    }

    /// Positions of rows whose `column` equals `value`, through the index.
    /// `None` when no index exists for the column.
    pub fn lookup(&self, column: usize, value: &Value) -> Option<Vec<usize>> {
        let inner = self.inner.read();
        inner
            .indexes
            .get(&column)
            .map(|index| index.get(value).cloned().unwrap_or_default())
    }

    /// The Cartesian product of two tables. The output shape is the
    /// concatenation of the input shapes; output rows share the input values.
    pub fn cross_join(&self, other: &Table) -> Result<Table> {
        let left_rows = self.rows();
        let right_rows = other.rows();
        let shape = self.joined_shape(other);

        let mut rows = Vec::with_capacity(left_rows.len() * right_rows.len());
        for left in &left_rows {
            for right in &right_rows {
                rows.push(Arc::new(Row::concat(left, right)));
            }
        }
        Ok(Table::from_parts(self.interner.clone(), shape, rows))
    }

    /// The subset of the Cartesian product where `left_column` equals
    /// `right_column` under structural value equality. Consults a secondary
    /// index on the right table's join column when one exists; the result is
    /// identical either way, the index only skips non-matching candidates.
    pub fn inner_join(
        &self,
        other: &Table,
        left_column: usize,
        right_column: usize,
    ) -> Result<Table> {
        let left_rows = self.rows();
        let right_rows = other.rows();
        let shape = self.joined_shape(other);
        let indexed = other.has_index(right_column);

        let mut rows = Vec::new();
        for left in &left_rows {
            let key = left.get(left_column).ok_or_else(|| {
                Error::Internal(format!("join column {} out of range", left_column))
            })?;
            if key.is_null() {
                continue;
            }
            if indexed {
                if let Some(positions) = other.lookup(right_column, key) {
                    for position in positions {
                        if let Some(right) = right_rows.get(position) {
                            rows.push(Arc::new(Row::concat(left, right)));
                        }
                    }
                }
            } else {
                for right in &right_rows {
                    let candidate = right.get(right_column).ok_or_else(|| {
                        Error::Internal(format!("join column {} out of range", right_column))
                    })?;
                    if !candidate.is_null() && candidate == key {
                        rows.push(Arc::new(Row::concat(left, right)));
                    }
                }
            }
        }
        Ok(Table::from_parts(self.interner.clone(), shape, rows))
    }

    fn joined_shape(&self, other: &Table) -> Option<RowShape> {
        match (self.shape(), other.shape()) {
            (Some(left), Some(right)) => Some(self.interner.concat(&left, &right)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Table")
            .field("rows", &inner.rows.len())
            .field("columns", &inner.shape.as_ref().map(|s| s.len()))
            .field("indexes", &inner.indexes.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn build_position_index(rows: &[RowRef], column: usize) -> HashMap<Value, Vec<usize>> {
    let mut index: HashMap<Value, Vec<usize>> = HashMap::new();
    for (position, row) in rows.iter().enumerate() {
        if let Some(value) = row.get(column) {
            if !value.is_null() {
                index.entry(value.clone()).or_default().push(position);
            }
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::ValueType;

    fn table(interner: &Arc<ShapeInterner>, rows: &[&[Value]]) -> Table {
        let t = Table::new(interner.clone());
        for values in rows {
            t.append(values.iter().cloned().collect()).unwrap();
        }
        t
    }

    #[test]
    fn shape_is_derived_from_first_row() {
        let interner = Arc::new(ShapeInterner::new());
        let t = Table::new(interner.clone());

        t.append([Value::Uint(1), Value::text("alpha")].into_iter().collect())
            .unwrap();
        // One row: shape not fixed yet, but derivable.
        assert_eq!(t.shape().unwrap().types(), &[ValueType::Uint, ValueType::Text]);

        t.append([Value::Uint(2), Value::text("beta")].into_iter().collect())
            .unwrap();

        let err = t
            .append([Value::text("gamma"), Value::Uint(3)].into_iter().collect())
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));

        let err = t.append([Value::Uint(4)].into_iter().collect()).unwrap_err();
        assert!(matches!(err, Error::ShapeLenMismatch { .. }));
    }

    #[test]
    fn cross_join_single_row_preserves_count() {
        let interner = Arc::new(ShapeInterner::new());
        let t = table(
            &interner,
            &[
                &[Value::Uint(1), Value::text("alpha")],
                &[Value::Uint(2), Value::text("beta")],
                &[Value::Uint(3), Value::text("gamma")],
            ],
        );
        let u = table(&interner, &[&[Value::text("g1")]]);

        let joined = t.cross_join(&u).unwrap();
        assert_eq!(joined.row_count(), 3);
        assert_eq!(joined.column_count(), 3);
        for (row, name) in joined.rows().iter().zip(["alpha", "beta", "gamma"]) {
            assert_eq!(row.get(1).unwrap().as_text().unwrap(), name);
            assert_eq!(row.get(2).unwrap().as_text().unwrap(), "g1");
        }
    }

    #[test]
    fn inner_join_agrees_with_and_without_index() {
        let interner = Arc::new(ShapeInterner::new());
        let host = table(
            &interner,
            &[
                &[Value::Uint(1), Value::text("alpha")],
                &[Value::Uint(2), Value::text("beta")],
            ],
        );
        let make_groups = || {
            table(
                &interner,
                &[
                    &[Value::Uint(1), Value::text("g1")],
                    &[Value::Uint(1), Value::text("g2")],
                    &[Value::Uint(3), Value::text("g3")],
                ],
            )
        };

        let plain = host.inner_join(&make_groups(), 0, 0).unwrap();

        let indexed_groups = make_groups();
        indexed_groups.build_index(0);
        let indexed = host.inner_join(&indexed_groups, 0, 0).unwrap();

        let collect = |t: &Table| {
            t.rows()
                .iter()
                .map(|r| r.values().to_vec())
                .collect::<Vec<_>>()
        };
        assert_eq!(collect(&plain), collect(&indexed));
        assert_eq!(plain.row_count(), 2);
    }

    #[test]
    fn append_keeps_existing_index_current() {
        let interner = Arc::new(ShapeInterner::new());
        let t = table(&interner, &[&[Value::Uint(1)], &[Value::Uint(2)]]);
        t.build_index(0);

        t.append([Value::Uint(2)].into_iter().collect()).unwrap();
        assert_eq!(t.lookup(0, &Value::Uint(2)).unwrap(), vec![1, 2]);
    }

    #[test]
    fn null_join_keys_never_match() {
        let interner = Arc::new(ShapeInterner::new());
        let left = table(&interner, &[&[Value::Null(ValueType::Uint)]]);
        let right = table(&interner, &[&[Value::Null(ValueType::Uint)]]);
        let joined = left.inner_join(&right, 0, 0).unwrap();
        assert_eq!(joined.row_count(), 0);
    }
}
