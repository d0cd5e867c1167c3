//! Error types for the query engine

use crate::types::value::ValueType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Parse errors
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("unterminated quoted string: {0}")]
    UnterminatedQuote(String),

    // Resolution errors
    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("ambiguous column: {0}")]
    AmbiguousColumn(String),

    // Type errors
    #[error("cannot parse {text:?} as {datatype}")]
    ValueParse { text: String, datatype: ValueType },

    #[error("undefined operation: {left} {op} {right}")]
    UndefinedOperation {
        op: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    // Schema errors
    #[error("column/value count mismatch: {columns} columns, {values} values")]
    CountMismatch { columns: usize, values: usize },

    #[error("NULL constraint violation on column: {0}")]
    NullConstraintViolation(String),

    #[error("row has {found} values, table shape has {expected}")]
    ShapeLenMismatch { expected: usize, found: usize },

    // System errors
    #[error("internal error: {0}")]
    Internal(String),
}
