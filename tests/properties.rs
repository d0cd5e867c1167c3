//! Property tests for the table operators and the shape interner

use proptest::prelude::*;
use std::sync::Arc;
use vigil_sql::{RowShape, ShapeInterner, Table, Value, ValueType};

fn keyed_table(interner: &Arc<ShapeInterner>, keys: &[u64]) -> Table {
    let table = Table::new(interner.clone());
    for (position, key) in keys.iter().enumerate() {
        table
            .append(
                [Value::Uint(*key), Value::Int(position as i64)]
                    .into_iter()
                    .collect(),
            )
            .unwrap();
    }
    table
}

fn collect(table: &Table) -> Vec<Vec<Value>> {
    table.rows().iter().map(|r| r.values().to_vec()).collect()
}

fn value_type(index: usize) -> ValueType {
    match index % 5 {
        0 => ValueType::Bool,
        1 => ValueType::Int,
        2 => ValueType::Uint,
        3 => ValueType::Double,
        _ => ValueType::Text,
    }
}

proptest! {
    /// An index on the right join column never changes the join result.
    #[test]
    fn indexed_inner_join_matches_full_scan(
        left_keys in prop::collection::vec(0u64..8, 0..24),
        right_keys in prop::collection::vec(0u64..8, 0..24),
    ) {
        let interner = Arc::new(ShapeInterner::new());
        let left = keyed_table(&interner, &left_keys);

        let plain = keyed_table(&interner, &right_keys);
        let scanned = left.inner_join(&plain, 0, 0).unwrap();

        let indexed = keyed_table(&interner, &right_keys);
        indexed.build_index(0);
        let accelerated = left.inner_join(&indexed, 0, 0).unwrap();

        prop_assert_eq!(collect(&scanned), collect(&accelerated));
    }

    /// Cross join against a single-row table keeps the left row count and
    /// concatenates the columns.
    #[test]
    fn cross_join_with_single_row_preserves_count(
        keys in prop::collection::vec(0u64..100, 1..32),
    ) {
        let interner = Arc::new(ShapeInterner::new());
        let left = keyed_table(&interner, &keys);
        let right = Table::new(interner.clone());
        right
            .append([Value::text("only")].into_iter().collect())
            .unwrap();

        let joined = left.cross_join(&right).unwrap();
        prop_assert_eq!(joined.row_count(), keys.len());
        prop_assert_eq!(joined.column_count(), left.column_count() + 1);
        for (position, row) in joined.rows().iter().enumerate() {
            prop_assert_eq!(row.get(0).unwrap(), &Value::Uint(keys[position]));
            prop_assert_eq!(row.get(2).unwrap(), &Value::text("only"));
        }
    }

    /// Interning the same ordered type sequence twice yields the identical
    /// shape allocation.
    #[test]
    fn interned_shapes_are_identity_equal(
        indices in prop::collection::vec(0usize..5, 0..8),
    ) {
        let types: Vec<ValueType> = indices.iter().copied().map(value_type).collect();
        let interner = ShapeInterner::new();
        let first: RowShape = interner.intern(&types);
        let second: RowShape = interner.intern(&types);
        prop_assert!(first.same(&second));
    }

    /// The join result is the equality-filtered subset of the cross product.
    #[test]
    fn inner_join_is_a_cross_join_subset(
        left_keys in prop::collection::vec(0u64..6, 0..12),
        right_keys in prop::collection::vec(0u64..6, 0..12),
    ) {
        let interner = Arc::new(ShapeInterner::new());
        let left = keyed_table(&interner, &left_keys);
        let right = keyed_table(&interner, &right_keys);

        let inner = collect(&left.inner_join(&right, 0, 0).unwrap());
        let filtered: Vec<Vec<Value>> = collect(&left.cross_join(&right).unwrap())
            .into_iter()
            .filter(|row| row[0] == row[2])
            .collect();
        prop_assert_eq!(inner, filtered);
    }
}
