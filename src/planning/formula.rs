//! Join-plan preparation and execution
//!
//! `prepare` walks the FROM formula once before execution: it resolves each
//! inner join's ON fields to column positions, checks that the condition
//! spans both sides, and builds the right-hand table's secondary index when
//! the right side is a single leaf whose join column is declared indexable.
//! The index only lets row iteration skip non-matching candidates;
//! `JoinPlan::table` produces exactly what materializing the joins without
//! any index would.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::planning::from_clause::{FieldRef, FormulaAst};
use crate::planning::registry::{lookup_column, BoundTable};
use crate::catalog::KeyKind;
use crate::types::table::Table;
use std::sync::Arc;

/// A prepared join step. Column positions are relative to the step's own
/// joined output.
#[derive(Debug)]
enum Step {
    Scan {
        leaf: usize,
    },
    Cross {
        left: Box<Step>,
        right: Box<Step>,
    },
    Inner {
        left: Box<Step>,
        right: Box<Step>,
        left_column: usize,
        right_column: usize,
    },
}

/// An executable join plan over the statement's materialized tables.
#[derive(Debug)]
pub struct JoinPlan {
    root: Step,
}

impl JoinPlan {
    /// Materializes the single joined table the predicate stage scans.
    pub fn table(&self, tables: &[Arc<Table>]) -> Result<Arc<Table>> {
        exec(&self.root, tables)
    }
}

fn exec(step: &Step, tables: &[Arc<Table>]) -> Result<Arc<Table>> {
    match step {
        Step::Scan { leaf } => tables
            .get(*leaf)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("leaf table {} missing", leaf))),
        Step::Cross { left, right } => {
            let left = exec(left, tables)?;
            let right = exec(right, tables)?;
            left.cross_join(&right).map(Arc::new)
        }
        Step::Inner {
            left,
            right,
            left_column,
            right_column,
        } => {
            let left = exec(left, tables)?;
            let right = exec(right, tables)?;
            left.inner_join(&right, *left_column, *right_column)
                .map(Arc::new)
        }
    }
}

/// Per-subtree spans computed while preparing: which leaves it covers and
/// where its columns start in the full joined row.
struct Span {
    first_leaf: usize,
    last_leaf: usize,
    column_start: usize,
    column_width: usize,
}

/// Prepares the formula for execution against the given FROM tables.
pub fn prepare(
    ast: &FormulaAst,
    bound: &[BoundTable],
    tables: &[Arc<Table>],
    config: &EngineConfig,
) -> Result<JoinPlan> {
    let (root, _) = build(ast, bound, tables, config)?;
    Ok(JoinPlan { root })
}

fn build(
    ast: &FormulaAst,
    bound: &[BoundTable],
    tables: &[Arc<Table>],
    config: &EngineConfig,
) -> Result<(Step, Span)> {
    match ast {
        FormulaAst::Leaf(leaf) => {
            let table = bound
                .get(*leaf)
                .ok_or_else(|| Error::Internal(format!("leaf {} out of range", leaf)))?;
            Ok((
                Step::Scan { leaf: *leaf },
                Span {
                    first_leaf: *leaf,
                    last_leaf: *leaf,
                    column_start: table.offset,
                    column_width: table.def.columns().len(),
                },
            ))
        }
        FormulaAst::Cross(left, right) => {
            let (left_step, left_span) = build(left, bound, tables, config)?;
            let (right_step, right_span) = build(right, bound, tables, config)?;
            let span = Span {
                first_leaf: left_span.first_leaf,
                last_leaf: right_span.last_leaf,
                column_start: left_span.column_start,
                column_width: left_span.column_width + right_span.column_width,
            };
            Ok((
                Step::Cross {
                    left: Box::new(left_step),
                    right: Box::new(right_step),
                },
                span,
            ))
        }
        FormulaAst::Inner {
            left,
            right,
            left_field,
            right_field,
        } => {
            let (left_step, left_span) = build(left, bound, tables, config)?;
            let (right_step, right_span) = build(right, bound, tables, config)?;

            let a = resolve_side(left_field, bound)?;
            let b = resolve_side(right_field, bound)?;
            // The ON fields may name the two sides in either order.
            let (left_col, right_col) = if covers(&left_span, a.0) && covers(&right_span, b.0) {
                (a, b)
            } else if covers(&left_span, b.0) && covers(&right_span, a.0) {
                (b, a)
            } else {
                return Err(Error::Parse(
                    "join condition must reference both joined tables".into(),
                ));
            };

            let left_column = left_col.1 - left_span.column_start;
            let right_column = right_col.1 - right_span.column_start;

            // Wire the join column to an index when the right side is a bare
            // leaf with a declared-indexable column.
            if config.build_join_indexes
                && right_span.first_leaf == right_span.last_leaf
                && right_col.2 != KeyKind::None
            {
                if let Some(table) = tables.get(right_span.first_leaf) {
                    table.build_index(right_column);
                }
            }

            let span = Span {
                first_leaf: left_span.first_leaf,
                last_leaf: right_span.last_leaf,
                column_start: left_span.column_start,
                column_width: left_span.column_width + right_span.column_width,
            };
            Ok((
                Step::Inner {
                    left: Box::new(left_step),
                    right: Box::new(right_step),
                    left_column,
                    right_column,
                },
                span,
            ))
        }
    }
}

/// Resolves an ON field: (owning leaf, absolute position, key kind).
fn resolve_side(field: &FieldRef, bound: &[BoundTable]) -> Result<(usize, usize, KeyKind)> {
    let (table_index, index_in_table, def) =
        lookup_column(field.qualifier.as_deref(), &field.name, bound)?;
    Ok((
        table_index,
        bound[table_index].offset + index_in_table,
        def.key,
    ))
}

fn covers(span: &Span, leaf: usize) -> bool {
    leaf >= span.first_leaf && leaf <= span.last_leaf
}
