//! Resolved expression trees
//!
//! The pickers build name-based expressions while parsing; binding rewrites
//! them into this form, where every column reference is a registry id. The
//! id resolves to a row position through the registry only at evaluation
//! time, since the active row changes on every evaluation. Trees are
//! immutable once built.

use crate::types::value::{CmpOp, Value};

/// Index of a column descriptor in the statement's column registry.
pub type ColumnId = usize;

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A column reference, late-bound through the registry.
    Column(ColumnId),
    /// A literal value.
    Constant(Value),
    /// A binary comparison.
    Compare(CmpOp, Box<Expression>, Box<Expression>),
    /// Logical conjunction.
    And(Box<Expression>, Box<Expression>),
    /// Set membership: `expr IN (a, b, c)`.
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
    },
    /// An aggregate over a bucket of rows. `None` argument counts rows
    /// (`COUNT(*)`). Only valid in the select list; the render loop drives
    /// its running state.
    Aggregate(AggregateFunc, Option<Box<Expression>>),
}

impl Expression {
    /// True if any node in the tree is an aggregate call.
    pub fn has_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate(..) => true,
            Expression::Column(_) | Expression::Constant(_) => false,
            Expression::Compare(_, l, r) | Expression::And(l, r) => {
                l.has_aggregate() || r.has_aggregate()
            }
            Expression::InList { expr, list } => {
                expr.has_aggregate() || list.iter().any(|e| e.has_aggregate())
            }
        }
    }
}

/// The aggregate function set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl AggregateFunc {
    /// Recognizes an aggregate function name, case-insensitively.
    pub fn parse(word: &str) -> Option<AggregateFunc> {
        if word.eq_ignore_ascii_case("count") {
            Some(AggregateFunc::Count)
        } else if word.eq_ignore_ascii_case("max") {
            Some(AggregateFunc::Max)
        } else if word.eq_ignore_ascii_case("min") {
            Some(AggregateFunc::Min)
        } else if word.eq_ignore_ascii_case("sum") {
            Some(AggregateFunc::Sum)
        } else if word.eq_ignore_ascii_case("avg") {
            Some(AggregateFunc::Avg)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Max => "MAX",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
        }
    }
}
