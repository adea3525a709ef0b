//! Scalar imputation for numeric columns.
//!
//! `fit` computes one fill value per column from training data; `apply` only
//! ever reads those values. Serving therefore reuses training-time statistics
//! even if live traffic has drifted since.

use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, Value};
use crate::error::{PipelineError, PipelineResult};

/// How the fill value is computed from the non-null training values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImputeStrategy {
    #[default]
    Mean,
    Median,
}

/// Fill value for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFill {
    pub column: String,
    pub value: f64,
}

/// Fitted imputer state. Immutable after `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedImputer {
    strategy: ImputeStrategy,
    fills: Vec<ColumnFill>,
}

impl FittedImputer {
    /// Compute fill values for `columns` from `dataset`.
    pub fn fit(dataset: &Dataset, columns: &[String], strategy: ImputeStrategy) -> PipelineResult<Self> {
        let mut fills = Vec::with_capacity(columns.len());
        for column in columns {
            let values = numeric_values(dataset, column)?;
            if values.is_empty() {
                return Err(PipelineError::InsufficientData(format!(
                    "Column `{column}` has no non-null values to impute from"
                )));
            }
            let value = match strategy {
                ImputeStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
                ImputeStrategy::Median => median(values),
            };
            tracing::debug!(column = %column, fill = value, ?strategy, "imputer fitted");
            fills.push(ColumnFill {
                column: column.clone(),
                value,
            });
        }
        Ok(Self { strategy, fills })
    }

    /// Replace nulls in every imputed column with its fill value.
    pub fn apply(&self, dataset: &Dataset) -> PipelineResult<Dataset> {
        let mut out = dataset.clone();
        for fill in &self.fills {
            let idx = out.require_column(&fill.column)?;
            out = out.map_column(idx, |v| match v {
                Value::Null => Value::Number(fill.value),
                other => other.clone(),
            });
        }
        Ok(out)
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    pub fn fills(&self) -> &[ColumnFill] {
        &self.fills
    }

    pub fn fill_for(&self, column: &str) -> Option<f64> {
        self.fills.iter().find(|f| f.column == column).map(|f| f.value)
    }
}

fn numeric_values(dataset: &Dataset, column: &str) -> PipelineResult<Vec<f64>> {
    let mut out = Vec::new();
    for (row, value) in dataset.column(column)?.into_iter().enumerate() {
        match value {
            Value::Null => {}
            Value::Number(v) => out.push(*v),
            Value::Text(s) => {
                return Err(PipelineError::validation(format!(
                    "Column `{column}` row {row}: expected a number, got \"{s}\""
                )));
            }
        }
    }
    Ok(out)
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
