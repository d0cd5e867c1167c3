//! SELECT compilation and execution
//!
//! One compiler instance handles one statement start to finish: section
//! dispatch over the word stream (SELECT list / FROM / WHERE / GROUP BY /
//! ORDER BY / LIMIT), name resolution through the shared column registry,
//! table materialization from the catalog, join execution, per-row predicate
//! evaluation, single-column GROUP BY bucketing, and text rendering.
//!
//! Rendering reproduces the aggregate masking counter: when the column list
//! contains an aggregate, a countdown starting at `row_count - 1` lets every
//! row drive the running state but only the bucket's last row emit text.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::execution::aggregate::{accumulator_for, Accumulator};
use crate::execution::expression::{evaluate, truthy};
use crate::execution::{OutputColumn, SelectOutput};
use crate::parsing::expr::{Expr, SelectItem};
use crate::parsing::picker::{ColumnPicker, ConditionPicker};
use crate::parsing::tokenizer::{CountingSeparators, Tokenizer, Word};
use crate::planning::formula::prepare;
use crate::planning::from_clause::{parse_from, Section};
use crate::planning::registry::{resolve, BoundTable, ColumnRegistry};
use crate::types::expression::{ColumnId, Expression};
use crate::types::row::RowRef;
use crate::types::shape::ShapeInterner;
use crate::types::table::Table;
use crate::types::value::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Separator set for the select list: commas split entries, parentheses
/// bound aggregate arguments.
const LIST_SEPARATORS: &str = " \t\r\n,()";
/// Separator set for WHERE: comparison operator characters are separators
/// and are reconstructed from the gap.
const CONDITION_SEPARATORS: &str = " \t\r\n,()=<>!";
/// Separator set for the trailing GROUP BY / ORDER BY / LIMIT words.
const TAIL_SEPARATORS: &str = " \t\r\n,";

/// One output column, lowered: either a plain table column or a computed
/// formula (aggregate or literal).
enum OutputExpr {
    Plain(ColumnId),
    Computed(Expression),
}

struct OutputSpec {
    expr: OutputExpr,
    alias: Option<String>,
    /// Rendered label for computed columns, e.g. `MAX(clock)`.
    label: String,
}

pub struct SelectCompiler<'a> {
    pub catalog: &'a dyn Catalog,
    pub interner: &'a Arc<ShapeInterner>,
    pub config: &'a EngineConfig,
}

impl SelectCompiler<'_> {
    /// Runs the statement; the tokenizer is positioned just after the
    /// leading SELECT keyword.
    pub fn execute(&self, tok: &mut Tokenizer<'_>) -> Result<SelectOutput> {
        // Select list, up to FROM.
        let mut seps = CountingSeparators::new(LIST_SEPARATORS);
        let mut picker = ColumnPicker::new();
        let items = loop {
            match tok.read_word(&mut seps)? {
                None => return Err(Error::Parse("missing FROM clause".into())),
                Some(word) if word.is_keyword("from") => break picker.finish(seps.last_gap())?,
                Some(word) => picker.feed(seps.last_gap(), &word)?,
            }
        };

        // FROM clause; the parser hands back the section that ended it.
        let from = parse_from(tok)?;
        trace!(tables = from.tables.len(), "parsed FROM clause");

        let mut where_ast = None;
        let mut group_field: Option<(Option<String>, String)> = None;
        let mut order_field: Option<(Option<String>, String)> = None;
        let mut order_desc = false;
        let mut limit: Option<usize> = None;

        let mut section = from.section;
        while section != Section::End {
            section = match section {
                Section::Where => {
                    let (expr, next) = parse_where(tok)?;
                    where_ast = Some(expr);
                    next
                }
                Section::GroupBy => {
                    let (field, next) = parse_tail_field(tok, "GROUP BY")?;
                    group_field = Some(field);
                    next
                }
                Section::OrderBy => {
                    let (field, desc, next) = parse_order(tok)?;
                    order_field = Some(field);
                    order_desc = desc;
                    next
                }
                Section::Limit => {
                    let (count, next) = parse_limit(tok)?;
                    limit = Some(count);
                    next
                }
                Section::End => unreachable!(),
            };
        }

        // Resolve the table list against the catalog and lay out offsets.
        let mut bound = Vec::with_capacity(from.tables.len());
        let mut offset = 0;
        for table_ref in &from.tables {
            let def = self
                .catalog
                .table(&table_ref.name)
                .ok_or_else(|| Error::TableNotFound(table_ref.name.clone()))?;
            let width = def.columns().len();
            bound.push(BoundTable {
                name: table_ref.name.clone(),
                alias: table_ref.alias.clone(),
                def,
                offset,
            });
            offset += width;
        }

        // Lower the select list (expanding wildcards in schema order) and the
        // remaining clauses into the shared registry, then bind everything.
        let mut registry = ColumnRegistry::new();
        let specs = lower_items(&items, &bound, &mut registry)?;
        let where_expr = where_ast
            .map(|ast| resolve(&ast, &mut registry))
            .transpose()?;
        let group_id = group_field
            .map(|(qualifier, name)| registry.intern(qualifier.as_deref(), &name));
        let order_id = order_field
            .map(|(qualifier, name)| registry.intern(qualifier.as_deref(), &name));
        registry.bind(&bound)?;

        // Materialize the source tables and run the join plan.
        let tables: Vec<Arc<Table>> = bound.iter().map(|t| t.def.snapshot()).collect();
        let plan = prepare(&from.formula, &bound, &tables, self.config)?;
        let joined = plan.table(&tables)?;
        trace!(rows = joined.row_count(), "materialized join");

        // Evaluate the predicate once per candidate row.
        let mut kept: Vec<RowRef> = Vec::new();
        for row in joined.rows() {
            let keep = match &where_expr {
                None => true,
                Some(expr) => truthy(evaluate(expr, &row, &registry)?)?,
            };
            if keep {
                kept.push(row);
            }
        }
        let result = Table::from_parts(self.interner.clone(), joined.shape(), kept);

        // Partition into per-key sub-tables under value equality, keeping
        // first-seen key order so identical statements render identically.
        let mut buckets: Vec<(Option<Value>, Table)> = Vec::new();
        match group_id {
            Some(id) => {
                let position = registry.position(id)?;
                let mut by_key: HashMap<Value, usize> = HashMap::new();
                for row in result.rows() {
                    let key = row.get(position).cloned().ok_or_else(|| {
                        Error::Internal(format!("group position {} out of range", position))
                    })?;
                    let slot = match by_key.get(&key) {
                        Some(&slot) => slot,
                        None => {
                            by_key.insert(key.clone(), buckets.len());
                            buckets.push((
                                Some(key),
                                Table::from_parts(
                                    self.interner.clone(),
                                    result.shape(),
                                    Vec::new(),
                                ),
                            ));
                            buckets.len() - 1
                        }
                    };
                    buckets[slot].1.append(Arc::unwrap_or_clone(row))?;
                }
            }
            None => buckets.push((None, result)),
        }

        // ORDER BY: sort rows of an ungrouped result; sort buckets by key
        // when the order column is the group column.
        if let Some(id) = order_id {
            let position = registry.position(id)?;
            let group_position = group_id.map(|g| registry.position(g)).transpose()?;
            if let Some(group_position) = group_position {
                if group_position == position {
                    buckets.sort_by(|(a, _), (b, _)| match (a, b) {
                        (Some(a), Some(b)) => a.total_order(b),
                        _ => std::cmp::Ordering::Equal,
                    });
                    if order_desc {
                        buckets.reverse();
                    }
                }
            } else {
                let (_, table) = buckets.pop().expect("ungrouped result bucket");
                let mut rows = table.rows();
                rows.sort_by(|a, b| {
                    let a = a.get(position);
                    let b = b.get(position);
                    match (a, b) {
                        (Some(a), Some(b)) => a.total_order(b),
                        _ => std::cmp::Ordering::Equal,
                    }
                });
                if order_desc {
                    rows.reverse();
                }
                buckets.push((
                    None,
                    Table::from_parts(self.interner.clone(), table.shape(), rows),
                ));
            }
        }

        self.render(&specs, &buckets, limit, &registry)
    }

    /// Renders each bucket: every row drives aggregate accumulators, and the
    /// masking countdown decides which rows emit text.
    fn render(
        &self,
        specs: &[OutputSpec],
        buckets: &[(Option<Value>, Table)],
        limit: Option<usize>,
        registry: &ColumnRegistry,
    ) -> Result<SelectOutput> {
        let columns = specs
            .iter()
            .map(|spec| self.describe(spec, registry))
            .collect();

        let has_aggregate = specs.iter().any(|spec| {
            matches!(&spec.expr, OutputExpr::Computed(e) if e.has_aggregate())
        });

        let mut out_rows: Vec<Vec<String>> = Vec::new();
        'buckets: for (_, bucket) in buckets {
            let rows = bucket.rows();
            if rows.is_empty() {
                continue;
            }
            let mut accumulators: Vec<Option<Box<dyn Accumulator>>> = specs
                .iter()
                .map(|spec| match &spec.expr {
                    OutputExpr::Computed(Expression::Aggregate(func, _)) => {
                        Some(accumulator_for(*func))
                    }
                    _ => None,
                })
                .collect();

            let mut mask = rows.len() - 1;
            for row in &rows {
                for (spec, accumulator) in specs.iter().zip(accumulators.iter_mut()) {
                    if let (
                        OutputExpr::Computed(Expression::Aggregate(_, argument)),
                        Some(accumulator),
                    ) = (&spec.expr, accumulator)
                    {
                        let value = argument
                            .as_ref()
                            .map(|a| evaluate(a, row, registry))
                            .transpose()?;
                        accumulator.add(value.as_ref())?;
                    }
                }

                if !has_aggregate || mask == 0 {
                    if limit.is_some_and(|l| out_rows.len() >= l) {
                        break 'buckets;
                    }
                    let mut cells = Vec::with_capacity(specs.len());
                    for (spec, accumulator) in specs.iter().zip(accumulators.iter()) {
                        let value = match (&spec.expr, accumulator) {
                            (OutputExpr::Plain(id), _) => {
                                let position = registry.position(*id)?;
                                row.get(position).cloned().ok_or_else(|| {
                                    Error::Internal(format!(
                                        "output position {} out of range",
                                        position
                                    ))
                                })?
                            }
                            (
                                OutputExpr::Computed(Expression::Aggregate(..)),
                                Some(accumulator),
                            ) => accumulator.finish()?,
                            (OutputExpr::Computed(expr), _) => evaluate(expr, row, registry)?,
                        };
                        cells.push(value.to_string());
                    }
                    out_rows.push(cells);
                }
                mask = mask.saturating_sub(1);
            }
        }

        Ok(SelectOutput {
            columns,
            rows: out_rows,
        })
    }

    fn describe(&self, spec: &OutputSpec, registry: &ColumnRegistry) -> OutputColumn {
        match &spec.expr {
            OutputExpr::Plain(id) => {
                let entry = registry.entry(*id);
                OutputColumn {
                    schema: self.config.schema_name.clone(),
                    table: entry.table_name.clone().unwrap_or_default(),
                    table_alias: entry.table_alias.clone(),
                    name: entry.name.clone(),
                    alias: spec.alias.clone(),
                }
            }
            OutputExpr::Computed(_) => OutputColumn {
                schema: self.config.schema_name.clone(),
                table: String::new(),
                table_alias: None,
                name: spec.label.clone(),
                alias: spec.alias.clone(),
            },
        }
    }
}

/// Expands wildcards in schema-declared order and lowers every select-list
/// entry into the shared registry.
fn lower_items(
    items: &[SelectItem],
    bound: &[BoundTable],
    registry: &mut ColumnRegistry,
) -> Result<Vec<OutputSpec>> {
    let mut specs = Vec::new();
    for item in items {
        match &item.expr {
            Expr::All => {
                for table in bound {
                    expand_table(table, registry, &mut specs);
                }
            }
            Expr::QualifiedAll(qualifier) => {
                let table = bound
                    .iter()
                    .find(|t| t.answers_to(qualifier))
                    .ok_or_else(|| Error::TableNotFound(qualifier.clone()))?;
                expand_table(table, registry, &mut specs);
            }
            expr => {
                let lowered = resolve(expr, registry)?;
                let spec = match lowered {
                    Expression::Column(id) => OutputSpec {
                        expr: OutputExpr::Plain(id),
                        alias: item.alias.clone(),
                        label: String::new(),
                    },
                    computed => OutputSpec {
                        label: item_label(expr),
                        expr: OutputExpr::Computed(computed),
                        alias: item.alias.clone(),
                    },
                };
                specs.push(spec);
            }
        }
    }
    Ok(specs)
}

fn expand_table(table: &BoundTable, registry: &mut ColumnRegistry, specs: &mut Vec<OutputSpec>) {
    for column in table.def.columns() {
        let id = registry.intern(Some(table.qualifier()), &column.name);
        specs.push(OutputSpec {
            expr: OutputExpr::Plain(id),
            alias: None,
            label: String::new(),
        });
    }
}

/// The display label of a computed select-list entry.
fn item_label(expr: &Expr) -> String {
    fn leaf(expr: &Expr) -> String {
        match expr {
            Expr::Column(Some(qualifier), name) => format!("{}.{}", qualifier, name),
            Expr::Column(None, name) => name.clone(),
            Expr::Literal(value) => value.to_string(),
            _ => "expr".to_string(),
        }
    }
    match expr {
        Expr::Aggregate(func, None) => format!("{}(*)", func.name()),
        Expr::Aggregate(func, Some(argument)) => {
            format!("{}({})", func.name(), leaf(argument))
        }
        other => leaf(other),
    }
}

/// Parses the WHERE clause up to the next section keyword, feeding the
/// condition picker word by word.
fn parse_where(tok: &mut Tokenizer<'_>) -> Result<(Expr, Section)> {
    let mut seps = CountingSeparators::new(CONDITION_SEPARATORS);
    let mut picker = ConditionPicker::new();
    let (expr, section) = loop {
        let Some(word) = tok.read_word(&mut seps)? else {
            break (picker.finish(seps.pending())?, Section::End);
        };
        let gap = seps.last_gap().to_vec();
        if word.is_keyword("limit") {
            break (picker.finish(&gap)?, Section::Limit);
        }
        if word.is_keyword("group") || word.is_keyword("order") {
            let section = if word.is_keyword("group") {
                Section::GroupBy
            } else {
                Section::OrderBy
            };
            match tok.read_word(&mut seps)? {
                Some(by) if by.is_keyword("by") => break (picker.finish(&gap)?, section),
                Some(next) => {
                    // Ordinary identifiers after all.
                    picker.feed(&gap, &word)?;
                    let next_gap = seps.last_gap().to_vec();
                    picker.feed(&next_gap, &next)?;
                    continue;
                }
                None => {
                    picker.feed(&gap, &word)?;
                    break (picker.finish(seps.pending())?, Section::End);
                }
            }
        }
        picker.feed(&gap, &word)?;
    };
    let expr = expr.ok_or_else(|| Error::Parse("empty WHERE clause".into()))?;
    Ok((expr, section))
}

fn split_field(word: &Word<'_>) -> (Option<String>, String) {
    match word.text.split_once('.') {
        Some((qualifier, name)) => (Some(qualifier.to_string()), name.to_string()),
        None => (None, word.text.to_string()),
    }
}

/// Parses the single GROUP BY column and the following section keyword.
fn parse_tail_field(
    tok: &mut Tokenizer<'_>,
    clause: &str,
) -> Result<((Option<String>, String), Section)> {
    let mut seps = CountingSeparators::new(TAIL_SEPARATORS);
    let field = tok
        .read_word(&mut seps)?
        .ok_or_else(|| Error::Parse(format!("missing column after {}", clause)))?;
    let field = split_field(&field);
    let section = parse_tail_section(tok, &mut seps)?;
    Ok((field, section))
}

/// Parses ORDER BY: a column, an optional ASC/DESC, the next section.
fn parse_order(
    tok: &mut Tokenizer<'_>,
) -> Result<((Option<String>, String), bool, Section)> {
    let mut seps = CountingSeparators::new(TAIL_SEPARATORS);
    let field = tok
        .read_word(&mut seps)?
        .ok_or_else(|| Error::Parse("missing column after ORDER BY".into()))?;
    let field = split_field(&field);

    let Some(word) = tok.read_word(&mut seps)? else {
        return Ok((field, false, Section::End));
    };
    if word.is_keyword("asc") {
        return Ok((field, false, parse_tail_section(tok, &mut seps)?));
    }
    if word.is_keyword("desc") {
        return Ok((field, true, parse_tail_section(tok, &mut seps)?));
    }
    if word.is_keyword("limit") {
        return Ok((field, false, Section::Limit));
    }
    Err(Error::UnexpectedToken(format!(
        "{} after ORDER BY",
        word.text
    )))
}

/// After a tail clause: LIMIT, ORDER BY or the end of the statement.
fn parse_tail_section(
    tok: &mut Tokenizer<'_>,
    seps: &mut CountingSeparators,
) -> Result<Section> {
    let Some(word) = tok.read_word(seps)? else {
        return Ok(Section::End);
    };
    if word.is_keyword("limit") {
        return Ok(Section::Limit);
    }
    if word.is_keyword("order") {
        match tok.read_word(seps)? {
            Some(by) if by.is_keyword("by") => return Ok(Section::OrderBy),
            _ => return Err(Error::Parse("expected BY after ORDER".into())),
        }
    }
    Err(Error::UnexpectedToken(word.text.to_string()))
}

/// Parses the LIMIT row count; nothing may follow it.
fn parse_limit(tok: &mut Tokenizer<'_>) -> Result<(usize, Section)> {
    let mut seps = CountingSeparators::new(TAIL_SEPARATORS);
    let word = tok
        .read_word(&mut seps)?
        .ok_or_else(|| Error::Parse("missing row count after LIMIT".into()))?;
    let count = word
        .text
        .parse::<usize>()
        .map_err(|_| Error::Parse(format!("invalid LIMIT: {}", word.text)))?;
    if let Some(extra) = tok.read_word(&mut seps)? {
        return Err(Error::UnexpectedToken(extra.text.to_string()));
    }
    Ok((count, Section::End))
}
