//! Engine entry point
//!
//! A [`QueryEngine`] owns the catalog handle, the shape interner and the
//! configuration; front ends hand it one statement string at a time.
//! Statement kind dispatch is an explicit match on the leading keyword.
//! Execution is single-threaded per statement; separate statements may run
//! concurrently on different threads against their own snapshots.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::execution::insert::InsertCompiler;
use crate::execution::select::SelectCompiler;
use crate::execution::update::UpdateCompiler;
use crate::execution::SelectOutput;
use crate::parsing::tokenizer::{CharSeparators, Tokenizer};
use crate::types::shape::ShapeInterner;
use std::sync::Arc;
use tracing::debug;

/// What a statement produced.
#[derive(Debug)]
pub enum StatementOutput {
    /// A SELECT result set.
    Rows(SelectOutput),
    /// The row count an INSERT or UPDATE touched.
    Modified(usize),
}

impl StatementOutput {
    pub fn into_rows(self) -> Option<SelectOutput> {
        match self {
            StatementOutput::Rows(output) => Some(output),
            StatementOutput::Modified(_) => None,
        }
    }

    pub fn modified(&self) -> Option<usize> {
        match self {
            StatementOutput::Rows(_) => None,
            StatementOutput::Modified(count) => Some(*count),
        }
    }
}

pub struct QueryEngine {
    catalog: Arc<dyn Catalog>,
    interner: Arc<ShapeInterner>,
    config: EngineConfig,
}

impl QueryEngine {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    pub fn with_config(catalog: Arc<dyn Catalog>, config: EngineConfig) -> Self {
        QueryEngine {
            catalog,
            interner: Arc::new(ShapeInterner::new()),
            config,
        }
    }

    /// The interner result tables are shaped against.
    pub fn interner(&self) -> &Arc<ShapeInterner> {
        &self.interner
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compiles and runs one statement start to finish.
    pub fn execute(&self, statement: &str) -> Result<StatementOutput> {
        let mut tok = Tokenizer::new(statement);
        let mut seps = CharSeparators::new(" \t\r\n");
        let word = tok
            .read_word(&mut seps)?
            .ok_or_else(|| Error::Parse("empty statement".into()))?;
        debug!(kind = %word.text, "executing statement");

        if word.is_keyword("select") {
            SelectCompiler {
                catalog: self.catalog.as_ref(),
                interner: &self.interner,
                config: &self.config,
            }
            .execute(&mut tok)
            .map(StatementOutput::Rows)
        } else if word.is_keyword("insert") {
            InsertCompiler {
                catalog: self.catalog.as_ref(),
            }
            .execute(&mut tok)
            .map(StatementOutput::Modified)
        } else if word.is_keyword("update") {
            UpdateCompiler {
                catalog: self.catalog.as_ref(),
            }
            .execute(&mut tok)
            .map(StatementOutput::Modified)
        } else {
            Err(Error::UnexpectedToken(word.text.to_string()))
        }
    }
}
