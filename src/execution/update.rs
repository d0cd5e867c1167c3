//! UPDATE compilation and execution
//!
//! Parses the `UPDATE table SET col=val[, col=val…] [WHERE …]` shape with an
//! explicit state machine; the `=` of each pair and the commas between pairs
//! arrive through the separator gap, and the WHERE clause reuses the same
//! condition picker as SELECT. Matching rows are rewritten in place: the
//! replacement is a whole shape-checked row swapped at the same position
//! under the writer lock, so append stays the only shape-changing mutation.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::execution::expression::{evaluate, truthy};
use crate::execution::{null_cell, parse_cell};
use crate::parsing::picker::ConditionPicker;
use crate::parsing::tokenizer::{CountingSeparators, Tokenizer};
use crate::planning::registry::{resolve, BoundTable, ColumnRegistry};
use crate::types::row::Row;
use tracing::trace;

/// Separator set for the SET list: `=` binds a value to its column, commas
/// split pairs.
const SET_SEPARATORS: &str = " \t\r\n,=";
/// Separator set for WHERE, matching the SELECT compiler's.
const WHERE_SEPARATORS: &str = " \t\r\n,()=<>!";

enum UpdateState {
    /// Expecting the table name.
    TableName,
    /// Expecting the SET keyword.
    SetKeyword,
    /// Expecting a column name.
    Column,
    /// Column read; the next word is its value, with `=` crossed in between.
    Value(String),
    /// Pair complete; `,` starts the next pair, WHERE ends the list.
    PostValue,
}

pub struct UpdateCompiler<'a> {
    pub catalog: &'a dyn Catalog,
}

impl UpdateCompiler<'_> {
    /// Runs the statement; the tokenizer is positioned just after the leading
    /// UPDATE keyword. Returns the number of rows rewritten. A statement
    /// without a WHERE clause rewrites every row.
    pub fn execute(&self, tok: &mut Tokenizer<'_>) -> Result<usize> {
        let (table, pairs, has_where) = parse_set_clause(tok)?;
        let where_ast = if has_where {
            parse_where_tail(tok)?
        } else {
            None
        };

        let def = self
            .catalog
            .table(&table)
            .ok_or_else(|| Error::TableNotFound(table.clone()))?;

        // Pairs apply positionally as parsed; a repeated column keeps the
        // later pair's value.
        let mut assignments = Vec::with_capacity(pairs.len());
        for (column, text, quoted) in pairs {
            let (position, column_def) = def
                .column(&column)
                .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
            let cell = if !quoted && text.eq_ignore_ascii_case("null") {
                null_cell(column_def)?
            } else {
                parse_cell(column_def, &text)?
            };
            assignments.push((position, cell));
        }

        let bound = vec![BoundTable {
            name: table.clone(),
            alias: None,
            def: def.clone(),
            offset: 0,
        }];
        let mut registry = ColumnRegistry::new();
        let where_expr = where_ast
            .map(|ast| resolve(&ast, &mut registry))
            .transpose()?;
        registry.bind(&bound)?;

        let live = def.snapshot();
        let mut modified = 0;
        for position in 0..live.row_count() {
            let Some(row) = live.get(position) else { break };
            let matches = match &where_expr {
                None => true,
                Some(expr) => truthy(evaluate(expr, &row, &registry)?)?,
            };
            if !matches {
                continue;
            }
            let mut values = row.values().to_vec();
            for (column, cell) in &assignments {
                values[*column] = cell.clone();
            }
            live.replace(position, values.into_iter().collect::<Row>())?;
            modified += 1;
        }
        trace!(table = %table, rows = modified, "applied update");
        Ok(modified)
    }
}

/// Parses `table SET col=val[, col=val…]`, stopping at WHERE or the end.
fn parse_set_clause(
    tok: &mut Tokenizer<'_>,
) -> Result<(String, Vec<(String, String, bool)>, bool)> {
    let mut seps = CountingSeparators::new(SET_SEPARATORS);
    let mut table = String::new();
    let mut pairs: Vec<(String, String, bool)> = Vec::new();
    let mut state = UpdateState::TableName;

    loop {
        let Some(word) = tok.read_word(&mut seps)? else {
            return match state {
                UpdateState::PostValue => Ok((table, pairs, false)),
                UpdateState::TableName => Err(Error::Parse("empty UPDATE statement".into())),
                _ => Err(Error::Parse("incomplete UPDATE statement".into())),
            };
        };
        let gap = seps.last_gap();
        state = match std::mem::replace(&mut state, UpdateState::TableName) {
            UpdateState::TableName => {
                table = word.text.to_string();
                UpdateState::SetKeyword
            }
            UpdateState::SetKeyword => {
                if !word.is_keyword("set") {
                    return Err(Error::Parse(format!(
                        "expected SET after table name, found {}",
                        word.text
                    )));
                }
                UpdateState::Column
            }
            UpdateState::Column => UpdateState::Value(word.text.to_string()),
            UpdateState::Value(column) => {
                if !gap.contains(&'=') {
                    return Err(Error::Parse(format!(
                        "expected = after {}, found {}",
                        column, word.text
                    )));
                }
                pairs.push((column, word.text.to_string(), word.quoted));
                UpdateState::PostValue
            }
            UpdateState::PostValue => {
                if word.is_keyword("where") {
                    return Ok((table, pairs, true));
                }
                if !gap.contains(&',') {
                    return Err(Error::Parse(format!(
                        "expected , or WHERE after value, found {}",
                        word.text
                    )));
                }
                UpdateState::Value(word.text.to_string())
            }
        };
    }
}

/// Parses the WHERE predicate to the end of the statement.
fn parse_where_tail(tok: &mut Tokenizer<'_>) -> Result<Option<crate::parsing::expr::Expr>> {
    let mut seps = CountingSeparators::new(WHERE_SEPARATORS);
    let mut picker = ConditionPicker::new();
    while let Some(word) = tok.read_word(&mut seps)? {
        picker.feed(seps.last_gap(), &word)?;
    }
    let expr = picker.finish(seps.pending())?;
    if expr.is_none() {
        return Err(Error::Parse("empty WHERE clause".into()));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDef, MemoryCatalog};
    use crate::parsing::tokenizer::CharSeparators;
    use crate::types::shape::ShapeInterner;
    use crate::types::table::Table;
    use crate::types::value::{Value, ValueType};
    use std::sync::Arc;

    fn catalog() -> (MemoryCatalog, Arc<Table>) {
        let interner = Arc::new(ShapeInterner::new());
        let live = Arc::new(Table::new(interner));
        for (id, name, status) in [(1u64, "alpha", 0i64), (2, "beta", 0)] {
            live.append(
                [Value::Uint(id), Value::text(name), Value::Int(status)]
                    .into_iter()
                    .collect(),
            )
            .unwrap();
        }
        let catalog = MemoryCatalog::new();
        catalog.register_live(
            "host",
            vec![
                ColumnDef::new("id", ValueType::Uint).primary_key(),
                ColumnDef::new("name", ValueType::Text),
                ColumnDef::new("status", ValueType::Int),
            ],
            live.clone(),
        );
        (catalog, live)
    }

    fn run(catalog: &MemoryCatalog, statement: &str) -> Result<usize> {
        let mut tok = Tokenizer::new(statement);
        let mut seps = CharSeparators::new(" \t\r\n");
        tok.read_word(&mut seps)?; // the UPDATE keyword the engine consumes
        UpdateCompiler { catalog }.execute(&mut tok)
    }

    #[test]
    fn rewrites_only_matching_rows() {
        let (catalog, live) = catalog();
        let count = run(&catalog, "UPDATE host SET name='gamma' WHERE id=2").unwrap();
        assert_eq!(count, 1);
        assert_eq!(live.get(0).unwrap().get(1).unwrap(), &Value::text("alpha"));
        assert_eq!(live.get(1).unwrap().get(1).unwrap(), &Value::text("gamma"));
    }

    #[test]
    fn no_where_touches_every_row() {
        let (catalog, live) = catalog();
        let count = run(&catalog, "UPDATE host SET status=1").unwrap();
        assert_eq!(count, 2);
        for position in 0..2 {
            assert_eq!(
                live.get(position).unwrap().get(2).unwrap(),
                &Value::Int(1)
            );
        }
    }

    #[test]
    fn later_pair_wins_and_positions_are_stable() {
        let (catalog, live) = catalog();
        run(&catalog, "UPDATE host SET status=1, status=2 WHERE id=1").unwrap();
        assert_eq!(live.get(0).unwrap().get(2).unwrap(), &Value::Int(2));
        // Untouched rows keep their positions and values.
        assert_eq!(live.get(1).unwrap().get(0).unwrap(), &Value::Uint(2));
    }

    #[test]
    fn unknown_column_in_set_list() {
        let (catalog, _) = catalog();
        assert_eq!(
            run(&catalog, "UPDATE host SET nosuch=1").unwrap_err(),
            Error::ColumnNotFound("nosuch".into())
        );
    }

    #[test]
    fn missing_equals_is_a_parse_error() {
        let (catalog, _) = catalog();
        assert!(matches!(
            run(&catalog, "UPDATE host SET name 'gamma'"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn bad_value_names_the_declared_type() {
        let (catalog, _) = catalog();
        assert_eq!(
            run(&catalog, "UPDATE host SET id=abc"),
            Err(Error::ValueParse {
                text: "abc".into(),
                datatype: ValueType::Uint
            })
        );
    }
}
