//! CSV ingest and normalization.
//!
//! This module turns a supply-chain CSV into a typed `Dataset`:
//!
//! - headers are normalized (trimmed, BOM stripped, lowercased)
//! - categorical columns keep their text; every other column must be numeric
//! - empty / `NA` / `NaN` / `null` cells become `Value::Null`
//! - rows that fail to parse are skipped and reported, not fatal
//!
//! No pipeline logic lives here: dropping rows with missing required values is
//! the validator's job, so the same rules apply to CSV and JSON inputs.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{ColumnRole, ColumnRoles, Dataset, Value, normalize_column_name};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the typed dataset plus bookkeeping for the run report.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a CSV file into a `Dataset`, typing columns by their role.
pub fn load_dataset(path: &Path, roles: &ColumnRoles) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_dataset(file, roles)
}

/// Read CSV from any reader (used by `load_dataset` and by tests).
pub fn read_dataset<R: Read>(reader: R, roles: &ColumnRoles) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let columns = normalize_headers(&headers)?;
    let column_roles: Vec<ColumnRole> = columns.iter().map(|c| roles.role_of(c)).collect();

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &columns, &column_roles) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(
            skipped = row_errors.len(),
            first_line = row_errors[0].line,
            first_error = %row_errors[0].message,
            "skipped unparsable CSV rows"
        );
    }

    let dataset = Dataset::new(columns, rows).map_err(AppError::from)?;
    tracing::info!(rows_read, rows_parsed = dataset.len(), columns = dataset.columns().len(), "CSV loaded");

    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
    })
}

fn normalize_headers(headers: &StringRecord) -> Result<Vec<String>, AppError> {
    let mut columns: Vec<String> = Vec::with_capacity(headers.len());
    for raw in headers.iter() {
        let name = normalize_column_name(raw);
        if name.is_empty() {
            return Err(AppError::new(2, "CSV header contains an empty column name."));
        }
        if columns.contains(&name) {
            return Err(AppError::new(2, format!("Duplicate CSV column: `{name}`")));
        }
        columns.push(name);
    }
    Ok(columns)
}

fn parse_row(record: &StringRecord, columns: &[String], roles: &[ColumnRole]) -> Result<Vec<Value>, String> {
    if record.len() > columns.len() {
        return Err(format!(
            "Row has {} fields but the header has {}.",
            record.len(),
            columns.len()
        ));
    }

    let mut row = Vec::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        // Short rows are padded with nulls (`flexible` reader).
        let raw = record.get(idx).unwrap_or("");
        row.push(parse_cell(raw, roles[idx]).map_err(|e| format!("Column `{name}`: {e}"))?);
    }
    Ok(row)
}

fn parse_cell(raw: &str, role: ColumnRole) -> Result<Value, String> {
    let s = raw.trim();
    if is_missing(s) {
        return Ok(Value::Null);
    }

    match role {
        ColumnRole::Categorical | ColumnRole::Ignore => Ok(Value::Text(s.to_string())),
        ColumnRole::Target | ColumnRole::Impute | ColumnRole::Passthrough => {
            let v = s
                .parse::<f64>()
                .map_err(|_| format!("invalid number '{s}'"))?;
            if v.is_finite() {
                Ok(Value::Number(v))
            } else {
                Err(format!("non-finite number '{s}'"))
            }
        }
    }
}

/// Missing-value markers shared by CSV cells and JSON string fields.
pub(crate) fn is_missing(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> ColumnRoles {
        ColumnRoles {
            target: "y".into(),
            required: vec![],
            impute: vec!["workers".into()],
            categorical: vec!["zone".into()],
            ignore: vec!["id".into()],
        }
    }

    #[test]
    fn types_cells_by_role() {
        let csv = "\u{feff}ID,Zone,Workers,Y\nW1,North,12,100\nW2,South,,200\n";
        let ingest = read_dataset(csv.as_bytes(), &roles()).unwrap();
        let ds = &ingest.dataset;

        assert_eq!(ds.columns(), &["id", "zone", "workers", "y"]);
        assert_eq!(ds.rows()[0][0], Value::Text("W1".into()));
        assert_eq!(ds.rows()[0][1], Value::Text("North".into()));
        assert_eq!(ds.rows()[0][2], Value::Number(12.0));
        assert_eq!(ds.rows()[1][2], Value::Null);
        assert_eq!(ingest.rows_read, 2);
        assert!(ingest.row_errors.is_empty());
    }

    #[test]
    fn numeric_looking_categories_stay_text() {
        let csv = "zone,workers,y\n3,1,1\n";
        let ingest = read_dataset(csv.as_bytes(), &roles()).unwrap();
        assert_eq!(ingest.dataset.rows()[0][0], Value::Text("3".into()));
    }

    #[test]
    fn bad_numbers_skip_the_row_and_are_reported() {
        let csv = "zone,workers,y\nNorth,abc,1\nSouth,NA,2\n";
        let ingest = read_dataset(csv.as_bytes(), &roles()).unwrap();

        assert_eq!(ingest.dataset.len(), 1);
        assert_eq!(ingest.row_errors.len(), 1);
        assert_eq!(ingest.row_errors[0].line, 2);
        assert!(ingest.row_errors[0].message.contains("workers"));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        let csv = "zone,Zone,y\n";
        let err = read_dataset(csv.as_bytes(), &roles()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
