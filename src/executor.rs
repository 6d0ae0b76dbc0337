//! Execution seam.
//!
//! Talking to a database happens behind the `QueryRunner` trait. Drivers and
//! test doubles implement it; this crate carries no transport dependency.

use std::collections::HashMap;

use thiserror::Error;

use crate::binder::{bind, BindError};
use crate::registry::Registry;
use crate::value::Value;
use crate::writer::CompiledQuery;

/// One result record, keyed by output column name.
pub type Row = HashMap<String, Value>;

/// Transport-level failure reported by a runner.
#[derive(Debug, Error)]
#[error("query runner failed: {message}")]
pub struct RunnerError {
    pub message: String,
}

impl RunnerError {
    pub fn new(message: impl Into<String>) -> Self {
        RunnerError {
            message: message.into(),
        }
    }
}

/// Anything that can take compiled text plus parameters and produce rows.
pub trait QueryRunner {
    fn run(
        &mut self,
        text: &str,
        parameters: &HashMap<String, Value>,
    ) -> Result<Vec<Row>, RunnerError>;
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("row {row}: {source}")]
    Bind {
        row: usize,
        #[source]
        source: BindError,
    },
}

/// Run a compiled query and bind every row into the query's targets.
///
/// Single-value targets end up holding the last row; list targets accumulate
/// across rows. A column the runner did not return is a binding error.
pub fn execute(
    registry: &Registry,
    runner: &mut dyn QueryRunner,
    query: &CompiledQuery,
) -> Result<Vec<Row>, ExecuteError> {
    let rows = runner.run(&query.text, &query.parameters)?;
    log::debug!(
        "executor: {} rows for {} bound columns",
        rows.len(),
        query.bindings.len()
    );
    for (i, row) in rows.iter().enumerate() {
        for (column, target) in &query.bindings {
            let value = row
                .get(column)
                .ok_or_else(|| ExecuteError::Bind {
                    row: i,
                    source: BindError::MissingKey(column.clone()),
                })?;
            bind(registry, value, target).map_err(|e| ExecuteError::Bind {
                row: i,
                source: e.for_key(column),
            })?;
        }
    }
    Ok(rows)
}
