//! Schema checks and row filtering.
//!
//! The validator is the first pipeline stage in both contexts. It fails hard
//! on missing columns (a caller/config defect) but only *drops* individual
//! rows that lack a mandatory value; the drop count is reported for
//! observability and never affects correctness.

use crate::domain::{ColumnRoles, Dataset, Value};
use crate::error::{PipelineError, PipelineResult};

/// Which context the pipeline runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Training: the target column is required and rows without it are dropped.
    Fit,
    /// Inference: the target is neither expected nor used.
    Serve,
}

/// Outcome of validation (besides the filtered dataset).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub rows_in: usize,
    pub rows_dropped: usize,
    /// Input positions of the dropped rows, ascending.
    pub dropped_rows: Vec<usize>,
}

impl ValidationReport {
    pub fn rows_kept(&self) -> usize {
        self.rows_in - self.rows_dropped
    }
}

/// Check the schema and drop rows missing a mandatory value.
pub fn validate(dataset: &Dataset, roles: &ColumnRoles, mode: Mode) -> PipelineResult<(Dataset, ValidationReport)> {
    let mut mandatory: Vec<usize> = Vec::with_capacity(roles.required.len() + 1);
    for name in &roles.required {
        mandatory.push(dataset.require_column(name)?);
    }
    if mode == Mode::Fit {
        let idx = dataset.column_index(&roles.target).ok_or_else(|| {
            PipelineError::schema(format!("Missing target column: `{}`", roles.target))
        })?;
        mandatory.push(idx);
    }

    // Columns later stages depend on must exist even when they have no
    // mandatory values; catching them here gives one clear error.
    for name in roles.impute.iter().chain(&roles.categorical) {
        dataset.require_column(name)?;
    }

    let complete = |row: &[Value]| mandatory.iter().all(|&i| !row[i].is_null());
    let dropped_rows: Vec<usize> = dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| !complete(row.as_slice()))
        .map(|(i, _)| i)
        .collect();
    let validated = dataset.filter_rows(|row| complete(row));
    let report = ValidationReport {
        rows_in: dataset.len(),
        rows_dropped: dropped_rows.len(),
        dropped_rows,
    };

    if report.rows_dropped > 0 {
        tracing::info!(
            dropped = report.rows_dropped,
            kept = report.rows_kept(),
            ?mode,
            "dropped rows with missing mandatory values"
        );
    }

    Ok((validated, report))
}
