//! Unresolved expressions, as built by the pickers
//!
//! Column references are still name-based here; binding rewrites them into
//! registry-id form (`types::expression`) once the FROM table list is known.

use crate::parsing::tokenizer::Word;
use crate::types::expression::AggregateFunc;
use crate::types::value::{CmpOp, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// The `*` wildcard.
    All,
    /// The `alias.*` wildcard.
    QualifiedAll(String),
    /// A column reference, optionally qualified with a table name or alias.
    Column(Option<String>, String),
    /// A literal value.
    Literal(Value),
    /// A binary comparison.
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    /// Logical conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Set membership. The list holds operands, usually literals.
    InList { expr: Box<Expr>, list: Vec<Expr> },
    /// An aggregate call; `None` argument is `COUNT(*)`.
    Aggregate(AggregateFunc, Option<Box<Expr>>),
}

/// One entry of a select list.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// Classifies a word as an operand: a text literal when quoted, a numeral
/// when it parses as one (signed first, then unsigned, then double), and a
/// column reference otherwise. `alias.col` qualification splits at the first
/// dot.
pub fn operand(word: &Word<'_>) -> Expr {
    if word.quoted {
        return Expr::Literal(Value::text(word.text));
    }
    if let Ok(i) = word.text.parse::<i64>() {
        return Expr::Literal(Value::Int(i));
    }
    if let Ok(u) = word.text.parse::<u64>() {
        return Expr::Literal(Value::Uint(u));
    }
    if let Ok(d) = word.text.parse::<f64>() {
        return Expr::Literal(Value::Double(d));
    }
    match word.text.split_once('.') {
        Some((qualifier, name)) => Expr::Column(Some(qualifier.to_string()), name.to_string()),
        None => Expr::Column(None, word.text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(text: &str) -> Word<'_> {
        Word {
            text,
            quoted: false,
        }
    }

    #[test]
    fn operand_classification() {
        assert_eq!(operand(&bare("42")), Expr::Literal(Value::Int(42)));
        assert_eq!(
            operand(&bare("18446744073709551615")),
            Expr::Literal(Value::Uint(u64::MAX))
        );
        assert_eq!(operand(&bare("1.5")), Expr::Literal(Value::Double(1.5)));
        assert_eq!(
            operand(&bare("host.id")),
            Expr::Column(Some("host".into()), "id".into())
        );
        assert_eq!(operand(&bare("name")), Expr::Column(None, "name".into()));
        assert_eq!(
            operand(&Word {
                text: "42",
                quoted: true
            }),
            Expr::Literal(Value::text("42"))
        );
    }
}
