//! Rows: ordered, fixed-length value sequences
//!
//! A row is mutable only while it is being assembled. Appending it to a table
//! freezes it behind an `Arc`, after which no code path can change it; join
//! temporaries and result tables share frozen rows instead of copying them.

use crate::error::{Error, Result};
use crate::types::shape::RowShape;
use crate::types::value::{Value, ValueType};
use std::sync::Arc;

/// A frozen row handle, shared between a table and any join temporaries.
pub type RowRef = Arc<Row>;

/// One record: an ordered sequence of values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Row {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Appends the next value while the row is under assembly.
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The row's value-type sequence, used to derive a table's shape from its
    /// first row.
    pub fn shape_types(&self) -> Vec<ValueType> {
        self.values.iter().map(Value::value_type).collect()
    }

    /// Checks the row against an already-derived shape: same length, and each
    /// value's type tag matching its position (typed nulls carry the tag).
    pub fn check_shape(&self, shape: &RowShape) -> Result<()> {
        if self.values.len() != shape.len() {
            return Err(Error::ShapeLenMismatch {
                expected: shape.len(),
                found: self.values.len(),
            });
        }
        for (position, value) in self.values.iter().enumerate() {
            let expected = shape
                .column_type(position)
                .ok_or_else(|| Error::Internal("shape position out of range".into()))?;
            if value.value_type() != expected {
                return Err(Error::TypeMismatch {
                    expected,
                    found: value.value_type(),
                });
            }
        }
        Ok(())
    }

    /// Builds a new row from the concatenation of two frozen rows, for join
    /// output. Values are shared, not copied.
    pub fn concat(left: &Row, right: &Row) -> Row {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend(left.values.iter().cloned());
        values.extend(right.values.iter().cloned());
        Row { values }
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Row {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::shape::ShapeInterner;

    #[test]
    fn shape_check_matches_types_and_length() {
        let interner = ShapeInterner::new();
        let shape = interner.intern(&[ValueType::Uint, ValueType::Text]);

        let mut row = Row::new();
        row.push(Value::Uint(1));
        row.push(Value::text("alpha"));
        assert!(row.check_shape(&shape).is_ok());

        let mut short = Row::new();
        short.push(Value::Uint(1));
        assert!(matches!(
            short.check_shape(&shape),
            Err(Error::ShapeLenMismatch { .. })
        ));

        let mut wrong = Row::new();
        wrong.push(Value::Int(1));
        wrong.push(Value::text("alpha"));
        assert!(matches!(
            wrong.check_shape(&shape),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn typed_null_satisfies_its_position() {
        let interner = ShapeInterner::new();
        let shape = interner.intern(&[ValueType::Uint, ValueType::Text]);

        let mut row = Row::new();
        row.push(Value::Uint(2));
        row.push(Value::Null(ValueType::Text));
        assert!(row.check_shape(&shape).is_ok());
    }
}
