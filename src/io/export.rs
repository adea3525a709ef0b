//! File exports: synthetic datasets as CSV and training run reports as JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, Value};
use crate::error::AppError;
use crate::features::ImputeStrategy;
use crate::models::ModelKind;
use crate::training::TrainMetrics;

/// Summary of one `whcap train` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub data: PathBuf,
    pub artifact: PathBuf,
    pub created_at: DateTime<Utc>,
    pub rows_read: usize,
    pub rows_rejected_at_ingest: usize,
    pub rows_dropped_by_validation: usize,
    pub rows_used: usize,
    pub model: ModelKind,
    pub impute_strategy: ImputeStrategy,
    pub features: Vec<String>,
    pub metrics: TrainMetrics,
}

/// Write a dataset as CSV (nulls become empty cells).
pub fn write_dataset_csv(path: &Path, dataset: &Dataset) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer
        .write_record(dataset.columns())
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for row in dataset.rows() {
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

/// Write the run report as pretty JSON.
pub fn write_run_report(path: &Path, report: &RunReport) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| AppError::new(4, format!("Failed to serialize run report: {e}")))?;
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report '{}': {e}", path.display())))?;
    writeln!(file, "{json}")
        .map_err(|e| AppError::new(2, format!("Failed to write report '{}': {e}", path.display())))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(v) => format!("{v}"),
        Value::Text(s) => s.clone(),
    }
}
