//! Expression pickers
//!
//! The statement compilers read words and feed them here one at a time,
//! together with the separator gap crossed before each word. The pickers are
//! explicit state machines: the select-list picker assembles output columns
//! (wildcards, plain columns, aggregate calls, `AS` aliases), the condition
//! picker assembles the WHERE tree (comparisons, `AND` chains, `IN` lists).
//! Comparison operators never arrive as words; their characters are
//! separators and are reconstructed from the gap.

use crate::error::{Error, Result};
use crate::parsing::expr::{operand, Expr, SelectItem};
use crate::parsing::tokenizer::Word;
use crate::types::expression::AggregateFunc;
use crate::types::value::CmpOp;

/// Select-list parser state.
enum ColumnState {
    /// At the start of a list entry.
    Item,
    /// An aggregate function name was read; it is still allowed to turn out
    /// to be a plain column of the same name if no `(` follows.
    AfterFunc(AggregateFunc, String),
    /// Inside the aggregate's parentheses, expecting the argument.
    ArgExpect(AggregateFunc),
    /// Argument captured, expecting `)`.
    AfterArg(AggregateFunc, Option<Box<Expr>>),
    /// Entry complete; `AS` or `,` may follow.
    Complete(Expr, Option<String>),
    /// `AS` was read; the next word is the alias.
    Alias(Expr),
}

/// Builds the select list, fed word-by-word.
pub struct ColumnPicker {
    items: Vec<SelectItem>,
    state: ColumnState,
}

impl ColumnPicker {
    pub fn new() -> Self {
        ColumnPicker {
            items: Vec::new(),
            state: ColumnState::Item,
        }
    }

    pub fn feed(&mut self, gap: &[char], word: &Word<'_>) -> Result<()> {
        for &c in gap {
            self.separator(c)?;
        }
        self.word(word)
    }

    /// Closes the list, processing separators crossed after the last word.
    pub fn finish(mut self, trailing_gap: &[char]) -> Result<Vec<SelectItem>> {
        for &c in trailing_gap {
            self.separator(c)?;
        }
        match std::mem::replace(&mut self.state, ColumnState::Item) {
            ColumnState::Complete(expr, alias) => self.items.push(SelectItem { expr, alias }),
            ColumnState::AfterFunc(_, name) => self.items.push(SelectItem {
                expr: Expr::Column(None, name),
                alias: None,
            }),
            ColumnState::Item if self.items.is_empty() => {
                return Err(Error::Parse("empty select list".into()));
            }
            ColumnState::Item => {
                return Err(Error::Parse("trailing comma in select list".into()));
            }
            _ => return Err(Error::Parse("unexpected end of select list".into())),
        }
        Ok(self.items)
    }

    fn separator(&mut self, c: char) -> Result<()> {
        if c.is_whitespace() {
            return Ok(());
        }
        let state = std::mem::replace(&mut self.state, ColumnState::Item);
        self.state = match (c, state) {
            (',', ColumnState::Complete(expr, alias)) => {
                self.items.push(SelectItem { expr, alias });
                ColumnState::Item
            }
            (',', ColumnState::AfterFunc(_, name)) => {
                self.items.push(SelectItem {
                    expr: Expr::Column(None, name),
                    alias: None,
                });
                ColumnState::Item
            }
            ('(', ColumnState::AfterFunc(func, _)) => ColumnState::ArgExpect(func),
            (')', ColumnState::AfterArg(func, arg)) => {
                ColumnState::Complete(Expr::Aggregate(func, arg), None)
            }
            (c, _) => {
                return Err(Error::UnexpectedToken(format!(
                    "{} in select list",
                    c
                )));
            }
        };
        Ok(())
    }

    fn word(&mut self, w: &Word<'_>) -> Result<()> {
        let state = std::mem::replace(&mut self.state, ColumnState::Item);
        self.state = match state {
            ColumnState::Item => {
                if !w.quoted && w.text == "*" {
                    ColumnState::Complete(Expr::All, None)
                } else if !w.quoted && w.text.len() > 2 && w.text.ends_with(".*") {
                    let qualifier = w.text[..w.text.len() - 2].to_string();
                    ColumnState::Complete(Expr::QualifiedAll(qualifier), None)
                } else if let Some(func) = (!w.quoted)
                    .then(|| AggregateFunc::parse(w.text))
                    .flatten()
                {
                    ColumnState::AfterFunc(func, w.text.to_string())
                } else {
                    ColumnState::Complete(operand(w), None)
                }
            }
            ColumnState::AfterFunc(_, name) if w.is_keyword("as") => {
                ColumnState::Alias(Expr::Column(None, name))
            }
            ColumnState::AfterFunc(..) => {
                return Err(Error::Parse(format!(
                    "expected ( after aggregate, found {}",
                    w.text
                )));
            }
            ColumnState::ArgExpect(func) => {
                if !w.quoted && w.text == "*" {
                    ColumnState::AfterArg(func, None)
                } else {
                    ColumnState::AfterArg(func, Some(Box::new(operand(w))))
                }
            }
            ColumnState::AfterArg(..) => {
                return Err(Error::Parse(format!(
                    "expected ) after aggregate argument, found {}",
                    w.text
                )));
            }
            ColumnState::Complete(expr, None) if w.is_keyword("as") => ColumnState::Alias(expr),
            ColumnState::Complete(..) => {
                return Err(Error::UnexpectedToken(format!("{} in select list", w.text)));
            }
            ColumnState::Alias(expr) => ColumnState::Complete(expr, Some(w.text.to_string())),
        };
        Ok(())
    }
}

impl Default for ColumnPicker {
    fn default() -> Self {
        Self::new()
    }
}

/// WHERE parser state.
enum CondState {
    /// Expecting the left operand of a comparison.
    Left,
    /// Left operand read; operator characters accumulate from the gap.
    AfterLeft(Expr, String),
    /// Operator complete; expecting the right operand.
    Right(Expr, CmpOp),
    /// `IN` read; expecting the opening parenthesis.
    InOpen(Expr),
    /// Inside the `IN` list.
    InItems(Expr, Vec<Expr>),
    /// One comparison complete; `AND` or the end may follow.
    Done(Expr),
}

/// Builds the WHERE predicate tree, fed word-by-word. Shared by SELECT and
/// UPDATE.
pub struct ConditionPicker {
    tree: Option<Expr>,
    state: CondState,
    fed: bool,
}

impl ConditionPicker {
    pub fn new() -> Self {
        ConditionPicker {
            tree: None,
            state: CondState::Left,
            fed: false,
        }
    }

    pub fn feed(&mut self, gap: &[char], word: &Word<'_>) -> Result<()> {
        self.fed = true;
        for &c in gap {
            self.separator(c)?;
        }
        self.take_operator()?;
        self.word(word)
    }

    /// Closes the predicate. `Ok(None)` when nothing was ever fed.
    pub fn finish(mut self, trailing_gap: &[char]) -> Result<Option<Expr>> {
        if !self.fed {
            return Ok(None);
        }
        for &c in trailing_gap {
            self.separator(c)?;
        }
        self.take_operator()?;
        match std::mem::replace(&mut self.state, CondState::Left) {
            CondState::Done(cmp) => {
                merge(&mut self.tree, cmp);
                Ok(self.tree)
            }
            CondState::Left => Err(Error::Parse("dangling AND in WHERE clause".into())),
            _ => Err(Error::Parse("incomplete WHERE clause".into())),
        }
    }

    fn separator(&mut self, c: char) -> Result<()> {
        if c.is_whitespace() {
            return Ok(());
        }
        let state = std::mem::replace(&mut self.state, CondState::Left);
        self.state = match (c, state) {
            ('=' | '<' | '>' | '!', CondState::AfterLeft(expr, mut ops)) => {
                ops.push(c);
                CondState::AfterLeft(expr, ops)
            }
            ('(', CondState::InOpen(expr)) => CondState::InItems(expr, Vec::new()),
            (')', CondState::InItems(expr, list)) => {
                if list.is_empty() {
                    return Err(Error::Parse("empty IN list".into()));
                }
                CondState::Done(Expr::InList {
                    expr: Box::new(expr),
                    list,
                })
            }
            (',', state @ CondState::InItems(..)) => state,
            (c, _) => {
                return Err(Error::UnexpectedToken(format!("{} in WHERE clause", c)));
            }
        };
        Ok(())
    }

    /// Converts accumulated operator characters once the gap is processed.
    fn take_operator(&mut self) -> Result<()> {
        if let CondState::AfterLeft(_, ops) = &self.state {
            if ops.is_empty() {
                return Ok(());
            }
            let op = CmpOp::parse(ops)
                .ok_or_else(|| Error::Parse(format!("unknown operator: {}", ops)))?;
            let state = std::mem::replace(&mut self.state, CondState::Left);
            if let CondState::AfterLeft(expr, _) = state {
                self.state = CondState::Right(expr, op);
            }
        }
        Ok(())
    }

    fn word(&mut self, w: &Word<'_>) -> Result<()> {
        let state = std::mem::replace(&mut self.state, CondState::Left);
        self.state = match state {
            CondState::Left => {
                if w.is_keyword("and") || w.is_keyword("in") {
                    return Err(Error::UnexpectedToken(format!("{} in WHERE clause", w.text)));
                }
                CondState::AfterLeft(operand(w), String::new())
            }
            CondState::AfterLeft(expr, _) if w.is_keyword("in") => CondState::InOpen(expr),
            CondState::AfterLeft(..) => {
                return Err(Error::Parse(format!(
                    "expected operator before {}",
                    w.text
                )));
            }
            CondState::Right(expr, op) => {
                CondState::Done(Expr::Compare(op, Box::new(expr), Box::new(operand(w))))
            }
            CondState::InOpen(_) => {
                return Err(Error::Parse(format!(
                    "expected ( after IN, found {}",
                    w.text
                )));
            }
            CondState::InItems(expr, mut list) => {
                list.push(operand(w));
                CondState::InItems(expr, list)
            }
            CondState::Done(cmp) => {
                if !w.is_keyword("and") {
                    return Err(Error::Parse(format!("expected AND, found {}", w.text)));
                }
                merge(&mut self.tree, cmp);
                CondState::Left
            }
        };
        Ok(())
    }
}

impl Default for ConditionPicker {
    fn default() -> Self {
        Self::new()
    }
}

fn merge(tree: &mut Option<Expr>, cmp: Expr) {
    *tree = Some(match tree.take() {
        None => cmp,
        Some(existing) => Expr::And(Box::new(existing), Box::new(cmp)),
    });
}
