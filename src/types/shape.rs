//! Row shapes and the shape interner
//!
//! A shape is the ordered value-type sequence of a row. Shapes are interned:
//! structurally equal shapes share one allocation, so compatibility checks
//! between tables are pointer comparisons rather than element walks. The
//! interner is owned by whichever long-lived component creates the engine;
//! there is no process-wide registry.

use crate::types::value::ValueType;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// An interned row shape. Cloning is an `Arc` bump.
#[derive(Clone, Debug)]
pub struct RowShape {
    types: Arc<[ValueType]>,
}

impl RowShape {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn column_type(&self, position: usize) -> Option<ValueType> {
        self.types.get(position).copied()
    }

    pub fn types(&self) -> &[ValueType] {
        &self.types
    }

    /// Identity comparison. Interning guarantees structurally equal shapes
    /// are the same allocation, so this is the shape equality check.
    pub fn same(&self, other: &RowShape) -> bool {
        Arc::ptr_eq(&self.types, &other.types)
    }
}

/// Deduplicating store of row shapes. The lock is held only for the
/// compare-and-insert during shape derivation.
#[derive(Debug, Default)]
pub struct ShapeInterner {
    shapes: Mutex<HashSet<Arc<[ValueType]>>>,
}

impl ShapeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical shape for the given type sequence, inserting it
    /// on first sight.
    pub fn intern(&self, types: &[ValueType]) -> RowShape {
        let mut shapes = self.shapes.lock();
        if let Some(existing) = shapes.get(types) {
            return RowShape {
                types: existing.clone(),
            };
        }
        let arc: Arc<[ValueType]> = Arc::from(types);
        shapes.insert(arc.clone());
        RowShape { types: arc }
    }

    /// The interned concatenation of two shapes, used by join output tables.
    pub fn concat(&self, left: &RowShape, right: &RowShape) -> RowShape {
        let mut types = Vec::with_capacity(left.len() + right.len());
        types.extend_from_slice(left.types());
        types.extend_from_slice(right.types());
        self.intern(&types)
    }
}
