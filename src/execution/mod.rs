//! Statement execution: the three compilers and their shared pieces.

pub mod aggregate;
pub mod expression;
pub mod insert;
pub mod select;
pub mod update;

use crate::catalog::ColumnDef;
use crate::error::{Error, Result};
use crate::types::value::Value;
use serde::{Deserialize, Serialize};

/// Parses a raw statement word into a cell of the column's declared type.
/// Text values are truncated to the declared length when one is set.
pub(crate) fn parse_cell(def: &ColumnDef, text: &str) -> Result<Value> {
    let value = Value::parse(text, def.datatype).ok_or_else(|| Error::ValueParse {
        text: text.to_string(),
        datatype: def.datatype,
    })?;
    match (&value, def.length) {
        (Value::Text(s), Some(length)) if s.chars().count() > length => {
            Ok(Value::text(s.chars().take(length).collect::<String>()))
        }
        _ => Ok(value),
    }
}

/// The cell written when a statement leaves a column null.
pub(crate) fn null_cell(def: &ColumnDef) -> Result<Value> {
    if !def.nullable {
        return Err(Error::NullConstraintViolation(def.name.clone()));
    }
    Ok(Value::Null(def.datatype))
}

/// Descriptor of one SELECT output column, in output order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    /// The engine's configured schema name.
    pub schema: String,
    /// Owning table name; empty for computed columns.
    pub table: String,
    /// The FROM-clause alias the table was referenced by, if any.
    pub table_alias: Option<String>,
    /// Column name, or a rendered label for computed columns.
    pub name: String,
    /// The `AS` alias, if one was given.
    pub alias: Option<String>,
}

/// A SELECT result: column descriptors plus one text value per output column
/// per emitted row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOutput {
    pub columns: Vec<OutputColumn>,
    pub rows: Vec<Vec<String>>,
}
