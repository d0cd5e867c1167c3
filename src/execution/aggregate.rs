//! Aggregate accumulators
//!
//! One accumulator instance lives per aggregate output column per result
//! bucket. Every row of the bucket drives the running state; the render loop
//! asks for the final value only at the bucket's last row.

use crate::error::Result;
use crate::types::expression::AggregateFunc;
use crate::types::value::{CmpOp, Value, ValueType};

pub trait Accumulator {
    /// Feeds one row's argument value. `None` means the call has no argument
    /// (`COUNT(*)`).
    fn add(&mut self, value: Option<&Value>) -> Result<()>;

    /// The aggregate's value for the bucket so far.
    fn finish(&self) -> Result<Value>;
}

pub fn accumulator_for(func: AggregateFunc) -> Box<dyn Accumulator> {
    match func {
        AggregateFunc::Count => Box::new(Count { count: 0 }),
        AggregateFunc::Max => Box::new(Extremum {
            keep: CmpOp::Gt,
            best: None,
        }),
        AggregateFunc::Min => Box::new(Extremum {
            keep: CmpOp::Lt,
            best: None,
        }),
        AggregateFunc::Sum => Box::new(Sum { total: None }),
        AggregateFunc::Avg => Box::new(Avg { total: 0.0, count: 0 }),
    }
}

/// COUNT: rows for `COUNT(*)`, non-null argument values otherwise.
struct Count {
    count: u64,
}

impl Accumulator for Count {
    fn add(&mut self, value: Option<&Value>) -> Result<()> {
        match value {
            None => self.count += 1,
            Some(v) if !v.is_null() => self.count += 1,
            Some(_) => {}
        }
        Ok(())
    }

    fn finish(&self) -> Result<Value> {
        Ok(Value::Uint(self.count))
    }
}

/// Running MAX/MIN, keeping whichever value wins the comparison.
struct Extremum {
    keep: CmpOp,
    best: Option<Value>,
}

impl Accumulator for Extremum {
    fn add(&mut self, value: Option<&Value>) -> Result<()> {
        let Some(value) = value else { return Ok(()) };
        if value.is_null() {
            return Ok(());
        }
        match &self.best {
            None => self.best = Some(value.clone()),
            Some(best) => {
                if value.compare(self.keep, best)? == Value::Bool(true) {
                    self.best = Some(value.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Result<Value> {
        Ok(self
            .best
            .clone()
            .unwrap_or(Value::Null(ValueType::Int)))
    }
}

struct Sum {
    total: Option<Value>,
}

impl Accumulator for Sum {
    fn add(&mut self, value: Option<&Value>) -> Result<()> {
        let Some(value) = value else { return Ok(()) };
        if value.is_null() {
            return Ok(());
        }
        self.total = Some(match &self.total {
            None => value.clone(),
            Some(total) => total.checked_add(value)?,
        });
        Ok(())
    }

    fn finish(&self) -> Result<Value> {
        Ok(self
            .total
            .clone()
            .unwrap_or(Value::Null(ValueType::Int)))
    }
}

struct Avg {
    total: f64,
    count: u64,
}

impl Accumulator for Avg {
    fn add(&mut self, value: Option<&Value>) -> Result<()> {
        let Some(value) = value else { return Ok(()) };
        if value.is_null() {
            return Ok(());
        }
        self.total += value.to_double()?;
        self.count += 1;
        Ok(())
    }

    fn finish(&self) -> Result<Value> {
        if self.count == 0 {
            return Ok(Value::Null(ValueType::Double));
        }
        Ok(Value::Double(self.total / self.count as f64))
    }
}
