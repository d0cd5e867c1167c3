//! INSERT compilation and execution
//!
//! Parses the `INSERT INTO table (col, …) VALUES (val, …)` shape with an
//! explicit section state machine: parentheses and commas arrive as separator
//! callbacks, values are captured quote-aware. The supplied values become a
//! column-name map; the row is then assembled by walking the schema's full
//! column list in declared order, parsing each supplied value to the declared
//! type or synthesizing the schema default, and appended to the live table
//! obtained from the catalog.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::execution::{null_cell, parse_cell};
use crate::parsing::tokenizer::{CountingSeparators, Tokenizer, Word};
use crate::types::row::Row;
use std::collections::HashMap;
use tracing::trace;

/// Separator set for the whole statement: parentheses open and close the
/// column and value lists, commas split entries.
const INSERT_SEPARATORS: &str = " \t\r\n,()";

enum InsertState {
    /// Expecting the INTO keyword.
    Into,
    /// Expecting the table name.
    TableName,
    /// Table read; `(` opens the column list.
    OpenColumns,
    /// Expecting a column name.
    Column,
    /// Column read; `,` continues the list, `)` closes it.
    AfterColumn,
    /// Expecting the VALUES keyword.
    ValuesKeyword,
    /// VALUES read; `(` opens the value list.
    OpenValues,
    /// Expecting a value.
    ValueItem,
    /// Value read; `,` continues the list, `)` closes it.
    AfterValue,
    /// Closing `)` seen; nothing may follow.
    Done,
}

pub struct InsertCompiler<'a> {
    pub catalog: &'a dyn Catalog,
}

impl InsertCompiler<'_> {
    /// Runs the statement; the tokenizer is positioned just after the leading
    /// INSERT keyword. Returns the number of rows added.
    pub fn execute(&self, tok: &mut Tokenizer<'_>) -> Result<usize> {
        let mut seps = CountingSeparators::new(INSERT_SEPARATORS);
        let mut parser = InsertParser {
            table: String::new(),
            columns: Vec::new(),
            values: Vec::new(),
            state: InsertState::Into,
        };
        while let Some(word) = tok.read_word(&mut seps)? {
            parser.feed(seps.last_gap(), &word)?;
        }
        let (table, columns, values) = parser.finish(seps.pending())?;

        let def = self
            .catalog
            .table(&table)
            .ok_or_else(|| Error::TableNotFound(table.clone()))?;
        if columns.len() != values.len() {
            return Err(Error::CountMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let mut supplied: HashMap<String, (String, bool)> = HashMap::new();
        for (column, value) in columns.into_iter().zip(values) {
            if supplied.insert(column.clone(), value).is_some() {
                return Err(Error::Parse(format!("duplicate column: {}", column)));
            }
        }

        // Assemble in schema-declared order, not statement order.
        let mut row = Row::with_capacity(def.columns().len());
        for column in def.columns() {
            let cell = match supplied.remove(&column.name) {
                Some((text, quoted)) => {
                    if !quoted && text.eq_ignore_ascii_case("null") {
                        null_cell(column)?
                    } else {
                        parse_cell(column, &text)?
                    }
                }
                None => match &column.default {
                    Some(default) => default.clone(),
                    None => null_cell(column)?,
                },
            };
            row.push(cell);
        }
        if let Some(unknown) = supplied.into_keys().next() {
            return Err(Error::ColumnNotFound(unknown));
        }

        trace!(table = %table, "assembled insert row");
        def.snapshot().append(row)?;
        Ok(1)
    }
}

struct InsertParser {
    table: String,
    columns: Vec<String>,
    /// Raw value text with its quoted flag; quoting decides NULL-keyword
    /// handling, the declared column type decides parsing.
    values: Vec<(String, bool)>,
    state: InsertState,
}

impl InsertParser {
    fn feed(&mut self, gap: &[char], word: &Word<'_>) -> Result<()> {
        for &c in gap {
            self.separator(c)?;
        }
        self.word(word)
    }

    fn finish(mut self, trailing_gap: &[char]) -> Result<(String, Vec<String>, Vec<(String, bool)>)> {
        for &c in trailing_gap {
            self.separator(c)?;
        }
        match self.state {
            InsertState::Done => Ok((self.table, self.columns, self.values)),
            InsertState::Into => Err(Error::Parse("empty INSERT statement".into())),
            _ => Err(Error::Parse("incomplete INSERT statement".into())),
        }
    }

    fn separator(&mut self, c: char) -> Result<()> {
        if c.is_whitespace() {
            return Ok(());
        }
        self.state = match (c, std::mem::replace(&mut self.state, InsertState::Into)) {
            ('(', InsertState::OpenColumns) => InsertState::Column,
            (',', InsertState::AfterColumn) => InsertState::Column,
            (')', InsertState::AfterColumn) => InsertState::ValuesKeyword,
            ('(', InsertState::OpenValues) => InsertState::ValueItem,
            (',', InsertState::AfterValue) => InsertState::ValueItem,
            (')', InsertState::AfterValue) => InsertState::Done,
            (c, _) => {
                return Err(Error::UnexpectedToken(format!("{} in INSERT statement", c)));
            }
        };
        Ok(())
    }

    fn word(&mut self, w: &Word<'_>) -> Result<()> {
        self.state = match std::mem::replace(&mut self.state, InsertState::Into) {
            InsertState::Into => {
                if !w.is_keyword("into") {
                    return Err(Error::Parse(format!(
                        "expected INTO after INSERT, found {}",
                        w.text
                    )));
                }
                InsertState::TableName
            }
            InsertState::TableName => {
                self.table = w.text.to_string();
                InsertState::OpenColumns
            }
            InsertState::Column => {
                self.columns.push(w.text.to_string());
                InsertState::AfterColumn
            }
            InsertState::ValuesKeyword => {
                if !w.is_keyword("values") {
                    return Err(Error::Parse(format!(
                        "expected VALUES after column list, found {}",
                        w.text
                    )));
                }
                InsertState::OpenValues
            }
            InsertState::ValueItem => {
                self.values.push((w.text.to_string(), w.quoted));
                InsertState::AfterValue
            }
            _ => {
                return Err(Error::UnexpectedToken(format!(
                    "{} in INSERT statement",
                    w.text
                )));
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDef, MemoryCatalog};
    use crate::types::shape::ShapeInterner;
    use crate::types::table::Table;
    use crate::types::value::{Value, ValueType};
    use std::sync::Arc;

    fn catalog() -> (MemoryCatalog, Arc<Table>) {
        let interner = Arc::new(ShapeInterner::new());
        let live = Arc::new(Table::new(interner));
        let catalog = MemoryCatalog::new();
        catalog.register_live(
            "host",
            vec![
                ColumnDef::new("id", ValueType::Uint).primary_key(),
                ColumnDef::new("name", ValueType::Text),
                ColumnDef::new("status", ValueType::Int).default(Value::Int(0)),
            ],
            live.clone(),
        );
        (catalog, live)
    }

    fn run(catalog: &MemoryCatalog, statement: &str) -> Result<usize> {
        let mut tok = Tokenizer::new(statement);
        let mut seps = crate::parsing::tokenizer::CharSeparators::new(" \t\r\n");
        tok.read_word(&mut seps)?; // the INSERT keyword the engine consumes
        InsertCompiler { catalog }.execute(&mut tok)
    }

    #[test]
    fn values_land_in_schema_order() {
        let (catalog, live) = catalog();
        let count = run(
            &catalog,
            "INSERT INTO host (name, id) VALUES ('gamma', 3)",
        )
        .unwrap();
        assert_eq!(count, 1);
        let row = live.get(0).unwrap();
        assert_eq!(row.get(0).unwrap(), &Value::Uint(3));
        assert_eq!(row.get(1).unwrap(), &Value::text("gamma"));
        // The omitted column took its schema default.
        assert_eq!(row.get(2).unwrap(), &Value::Int(0));
    }

    #[test]
    fn count_mismatch_is_a_schema_error() {
        let (catalog, _) = catalog();
        let err = run(&catalog, "INSERT INTO host (id, name) VALUES (3)").unwrap_err();
        assert_eq!(
            err,
            Error::CountMismatch {
                columns: 2,
                values: 1
            }
        );
    }

    #[test]
    fn malformed_numeral_names_the_column_type() {
        let (catalog, _) = catalog();
        let err = run(&catalog, "INSERT INTO host (id, name) VALUES (abc, 'x')").unwrap_err();
        assert_eq!(
            err,
            Error::ValueParse {
                text: "abc".into(),
                datatype: ValueType::Uint
            }
        );
    }

    #[test]
    fn missing_values_keyword() {
        let (catalog, _) = catalog();
        assert!(matches!(
            run(&catalog, "INSERT INTO host (id, name) (3, 'x')"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn quoted_null_is_text_not_null() {
        let (catalog, live) = catalog();
        run(&catalog, "INSERT INTO host (id, name) VALUES (4, 'NULL')").unwrap();
        assert_eq!(live.get(0).unwrap().get(1).unwrap(), &Value::text("NULL"));

        run(&catalog, "INSERT INTO host (id, name) VALUES (5, NULL)").unwrap();
        assert!(live.get(1).unwrap().get(1).unwrap().is_null());
    }
}
