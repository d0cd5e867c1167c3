//! FROM-clause parsing
//!
//! A state machine over the word stream: a table name, then optionally an
//! alias, a comma (pending cross join), or `INNER JOIN ... ON l = r`
//! (pending inner join). Each table reference becomes a leaf of the
//! [`FormulaAst`]; join operators fold the formula built so far with the
//! next leaf, left-associatively, so N tables produce a left-leaning binary
//! tree of depth N-1.
//!
//! The counting separator set is what tells `host h` (alias: only spaces
//! crossed) apart from `host, hostgroup` (next table: a comma crossed),
//! with no token look-ahead.

use crate::error::{Error, Result};
use crate::parsing::tokenizer::{CountingSeparators, Tokenizer, Word};

/// The statement section that terminated the FROM clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Where,
    GroupBy,
    OrderBy,
    Limit,
    End,
}

/// One parsed table reference.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// A join-condition field, still name-based.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl FieldRef {
    fn from_word(word: &Word<'_>) -> FieldRef {
        match word.text.split_once('.') {
            Some((qualifier, name)) => FieldRef {
                qualifier: Some(qualifier.to_string()),
                name: name.to_string(),
            },
            None => FieldRef {
                qualifier: None,
                name: word.text.to_string(),
            },
        }
    }
}

/// The parsed FROM clause: a binary tree over leaf indices into `tables`.
#[derive(Clone, Debug, PartialEq)]
pub enum FormulaAst {
    Leaf(usize),
    Cross(Box<FormulaAst>, Box<FormulaAst>),
    Inner {
        left: Box<FormulaAst>,
        right: Box<FormulaAst>,
        left_field: FieldRef,
        right_field: FieldRef,
    },
}

#[derive(Debug)]
pub struct FromClause {
    pub tables: Vec<TableRef>,
    pub formula: FormulaAst,
    pub section: Section,
}

enum FromState {
    /// Expecting a table name (start of clause, or after a comma).
    ExpectTable,
    /// A leaf is complete; alias, comma, join or section end may follow.
    PostTable,
    /// `INNER` read, `JOIN` must follow.
    ExpectJoinKeyword,
    /// Expecting the right-hand table of an inner join.
    ExpectJoinTable,
    /// Join table read; alias or `ON` may follow.
    ExpectOn,
    /// Expecting the left join field.
    ExpectLeftField,
    /// Left field read; `=` must be crossed before the right field.
    ExpectRightField(FieldRef),
}

/// Parses the FROM clause from the current tokenizer position, returning the
/// table list, the join formula and the section keyword that ended it.
pub fn parse_from<'t>(tok: &mut Tokenizer<'t>) -> Result<FromClause> {
    let mut seps = CountingSeparators::new(" \t\r\n,=");
    let mut parser = FromParser {
        tables: Vec::new(),
        formula: None,
        pending_right: None,
        state: FromState::ExpectTable,
    };
    // A word put back by the GROUP/ORDER look-ahead; it goes through the
    // full keyword handling on the next pass.
    let mut queued: Option<(Vec<char>, Word<'t>)> = None;

    loop {
        let (gap, word) = match queued.take() {
            Some(pending) => pending,
            None => match tok.read_word(&mut seps)? {
                Some(word) => (seps.last_gap().to_vec(), word),
                None => return parser.finish(Section::End),
            },
        };

        if matches!(parser.state, FromState::PostTable) {
            if word.is_keyword("where") {
                return parser.finish(Section::Where);
            }
            if word.is_keyword("limit") {
                return parser.finish(Section::Limit);
            }
            if word.is_keyword("inner") {
                parser.state = FromState::ExpectJoinKeyword;
                continue;
            }
            if word.is_keyword("group") || word.is_keyword("order") {
                // These end the clause only when BY follows; otherwise they
                // are ordinary identifiers (an alias here).
                let section = if word.is_keyword("group") {
                    Section::GroupBy
                } else {
                    Section::OrderBy
                };
                match tok.read_word(&mut seps)? {
                    Some(by) if by.is_keyword("by") => return parser.finish(section),
                    Some(next) => {
                        parser.word(&gap, &word)?;
                        queued = Some((seps.last_gap().to_vec(), next));
                        continue;
                    }
                    None => {
                        parser.word(&gap, &word)?;
                        return parser.finish(Section::End);
                    }
                }
            }
        }
        parser.word(&gap, &word)?;
    }
}

struct FromParser {
    tables: Vec<TableRef>,
    formula: Option<FormulaAst>,
    /// Leaf index of an inner join's right table, held until both ON fields
    /// are captured.
    pending_right: Option<usize>,
    state: FromState,
}

impl FromParser {
    fn word(&mut self, gap: &[char], word: &Word<'_>) -> Result<()> {
        match std::mem::replace(&mut self.state, FromState::ExpectTable) {
            FromState::ExpectTable => {
                self.push_cross_leaf(word);
                self.state = FromState::PostTable;
            }
            FromState::PostTable => {
                if gap.contains(&',') {
                    self.push_cross_leaf(word);
                    self.state = FromState::PostTable;
                } else {
                    self.attach_alias(word)?;
                    self.state = FromState::PostTable;
                }
            }
            FromState::ExpectJoinKeyword => {
                if !word.is_keyword("join") {
                    return Err(Error::Parse(format!(
                        "expected JOIN after INNER, found {}",
                        word.text
                    )));
                }
                self.state = FromState::ExpectJoinTable;
            }
            FromState::ExpectJoinTable => {
                let index = self.tables.len();
                self.tables.push(TableRef {
                    name: word.text.to_string(),
                    alias: None,
                });
                self.pending_right = Some(index);
                self.state = FromState::ExpectOn;
            }
            FromState::ExpectOn => {
                if word.is_keyword("on") {
                    self.state = FromState::ExpectLeftField;
                } else {
                    self.attach_alias(word)?;
                    self.state = FromState::ExpectOn;
                }
            }
            FromState::ExpectLeftField => {
                self.state = FromState::ExpectRightField(FieldRef::from_word(word));
            }
            FromState::ExpectRightField(left_field) => {
                if !gap.contains(&'=') {
                    return Err(Error::Parse(format!(
                        "expected = in join condition before {}",
                        word.text
                    )));
                }
                let right = self
                    .pending_right
                    .take()
                    .ok_or_else(|| Error::Internal("join without right table".into()))?;
                let left = self
                    .formula
                    .take()
                    .ok_or_else(|| Error::Internal("join without left formula".into()))?;
                self.formula = Some(FormulaAst::Inner {
                    left: Box::new(left),
                    right: Box::new(FormulaAst::Leaf(right)),
                    left_field,
                    right_field: FieldRef::from_word(word),
                });
                self.state = FromState::PostTable;
            }
        }
        Ok(())
    }

    /// Adds a leaf, pending-cross-joined with everything parsed so far.
    fn push_cross_leaf(&mut self, word: &Word<'_>) {
        let index = self.tables.len();
        self.tables.push(TableRef {
            name: word.text.to_string(),
            alias: None,
        });
        let leaf = FormulaAst::Leaf(index);
        self.formula = Some(match self.formula.take() {
            None => leaf,
            Some(existing) => FormulaAst::Cross(Box::new(existing), Box::new(leaf)),
        });
    }

    fn attach_alias(&mut self, word: &Word<'_>) -> Result<()> {
        let table = self
            .tables
            .last_mut()
            .ok_or_else(|| Error::Internal("alias without table".into()))?;
        if table.alias.is_some() {
            return Err(Error::UnexpectedToken(format!(
                "{} in FROM clause",
                word.text
            )));
        }
        table.alias = Some(word.text.to_string());
        Ok(())
    }

    fn finish(self, section: Section) -> Result<FromClause> {
        match self.state {
            FromState::PostTable => {}
            FromState::ExpectTable => {
                return Err(Error::Parse("expected table name in FROM clause".into()));
            }
            _ => return Err(Error::Parse("incomplete join clause".into())),
        }
        let formula = self
            .formula
            .ok_or_else(|| Error::Parse("expected table name in FROM clause".into()))?;
        Ok(FromClause {
            tables: self.tables,
            formula,
            section,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> FromClause {
        let mut tok = Tokenizer::new(input);
        parse_from(&mut tok).unwrap()
    }

    #[test]
    fn single_table_with_alias() {
        let from = parse("host h WHERE");
        assert_eq!(
            from.tables,
            vec![TableRef {
                name: "host".into(),
                alias: Some("h".into())
            }]
        );
        assert_eq!(from.formula, FormulaAst::Leaf(0));
        assert_eq!(from.section, Section::Where);
    }

    #[test]
    fn comma_list_builds_left_leaning_cross_joins() {
        let from = parse("host h, item, trigger t");
        assert_eq!(from.tables.len(), 3);
        assert_eq!(from.tables[0].alias.as_deref(), Some("h"));
        assert_eq!(from.tables[1].alias, None);
        assert_eq!(from.tables[2].alias.as_deref(), Some("t"));
        assert_eq!(
            from.formula,
            FormulaAst::Cross(
                Box::new(FormulaAst::Cross(
                    Box::new(FormulaAst::Leaf(0)),
                    Box::new(FormulaAst::Leaf(1))
                )),
                Box::new(FormulaAst::Leaf(2))
            )
        );
        assert_eq!(from.section, Section::End);
    }

    #[test]
    fn inner_join_with_on_condition() {
        let from = parse("host INNER JOIN hostgroup ON host.id=hostgroup.host_id");
        assert_eq!(from.tables.len(), 2);
        let FormulaAst::Inner {
            left,
            right,
            left_field,
            right_field,
        } = from.formula
        else {
            panic!("expected inner join");
        };
        assert_eq!(*left, FormulaAst::Leaf(0));
        assert_eq!(*right, FormulaAst::Leaf(1));
        assert_eq!(left_field.qualifier.as_deref(), Some("host"));
        assert_eq!(left_field.name, "id");
        assert_eq!(right_field.qualifier.as_deref(), Some("hostgroup"));
        assert_eq!(right_field.name, "host_id");
    }

    #[test]
    fn join_table_alias_before_on() {
        let from = parse("host h INNER JOIN hostgroup hg ON h.id = hg.host_id WHERE");
        assert_eq!(from.tables[1].alias.as_deref(), Some("hg"));
        assert_eq!(from.section, Section::Where);
    }

    #[test]
    fn group_requires_by() {
        let from = parse("host GROUP BY name");
        assert_eq!(from.section, Section::GroupBy);

        // Without BY, the word is an ordinary identifier: an alias here.
        let from = parse("host group WHERE");
        assert_eq!(from.tables[0].alias.as_deref(), Some("group"));
    }

    #[test]
    fn missing_equals_in_join_condition() {
        let mut tok = Tokenizer::new("host INNER JOIN hostgroup ON host.id hostgroup.host_id");
        assert!(parse_from(&mut tok).is_err());
    }

    #[test]
    fn incomplete_join_clause() {
        let mut tok = Tokenizer::new("host INNER JOIN hostgroup ON host.id");
        assert!(matches!(parse_from(&mut tok), Err(Error::Parse(_))));
    }
}
