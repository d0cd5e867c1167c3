//! Row-at-a-time expression evaluation
//!
//! Column references resolve to positions through the registry on every
//! evaluation; the active row changes each time, the registry does not.

use crate::error::{Error, Result};
use crate::planning::registry::ColumnRegistry;
use crate::types::expression::Expression;
use crate::types::row::Row;
use crate::types::value::{CmpOp, Value, ValueType};

pub fn evaluate(expr: &Expression, row: &Row, registry: &ColumnRegistry) -> Result<Value> {
    match expr {
        Expression::Column(id) => {
            let position = registry.position(*id)?;
            row.get(position)
                .cloned()
                .ok_or_else(|| Error::Internal(format!("row position {} out of range", position)))
        }
        Expression::Constant(value) => Ok(value.clone()),
        Expression::Compare(op, left, right) => {
            let left = evaluate(left, row, registry)?;
            let right = evaluate(right, row, registry)?;
            left.compare(*op, &right)
        }
        Expression::And(left, right) => {
            if !truthy(evaluate(left, row, registry)?)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(evaluate(right, row, registry)?)?))
        }
        Expression::InList { expr, list } => {
            let value = evaluate(expr, row, registry)?;
            for item in list {
                let item = evaluate(item, row, registry)?;
                if value.compare(CmpOp::Eq, &item)? == Value::Bool(true) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expression::Aggregate(func, _) => Err(Error::Internal(format!(
            "{} evaluated outside a result bucket",
            func.name()
        ))),
    }
}

/// Strict boolean coercion for predicate positions: booleans pass through, a
/// null boolean is false, anything else is a type error.
pub fn truthy(value: Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Null(ValueType::Bool) => Ok(false),
        other => Err(Error::TypeMismatch {
            expected: ValueType::Bool,
            found: other.value_type(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::value::CmpOp;

    #[test]
    fn constants_and_comparisons() {
        let registry = ColumnRegistry::new();
        let row = Row::new();
        let expr = Expression::Compare(
            CmpOp::Gt,
            Box::new(Expression::Constant(Value::Int(3))),
            Box::new(Expression::Constant(Value::Int(2))),
        );
        assert_eq!(evaluate(&expr, &row, &registry).unwrap(), Value::Bool(true));
    }

    #[test]
    fn and_short_circuits() {
        let registry = ColumnRegistry::new();
        let row = Row::new();
        // The right side would be a type error if evaluated.
        let expr = Expression::And(
            Box::new(Expression::Constant(Value::Bool(false))),
            Box::new(Expression::Constant(Value::Int(1))),
        );
        assert_eq!(
            evaluate(&expr, &row, &registry).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn in_list_membership() {
        let registry = ColumnRegistry::new();
        let row = Row::new();
        let expr = Expression::InList {
            expr: Box::new(Expression::Constant(Value::Int(1))),
            list: vec![
                Expression::Constant(Value::Int(0)),
                Expression::Constant(Value::Int(1)),
            ],
        };
        assert_eq!(evaluate(&expr, &row, &registry).unwrap(), Value::Bool(true));
    }
}
