//! Shared tabular types.
//!
//! These types are intentionally small and owned so that every pipeline stage
//! can take a `&Dataset` and hand back a fresh one:
//!
//! - `Value` is a single scalar cell (null, number, or categorical text)
//! - `Dataset` is an ordered column list plus rows aligned to it
//! - `FeatureMatrix` is the dense numeric output the model consumes

use nalgebra::DMatrix;

use crate::error::{PipelineError, PipelineResult};

/// A single scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Key used to look the value up in a categorical vocabulary.
    ///
    /// Numbers, and text that parses as a finite number, are rendered with
    /// `Display`, so `3`, `3.0` and `"3.0"` all map to the category `"3"`
    /// whether they came from CSV text or a JSON number. Nulls have no key.
    pub fn category_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Number(v) => Some(format!("{v}")),
            Value::Text(s) => {
                let s = s.trim();
                match s.parse::<f64>() {
                    Ok(v) if v.is_finite() => Some(format!("{v}")),
                    _ => Some(s.to_string()),
                }
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An ordered set of records sharing one column list.
///
/// Rows are stored positionally (aligned with `columns`) but are always
/// addressed by column *name* from the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, checking that column names are unique and that every
    /// row has one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> PipelineResult<Self> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(PipelineError::schema(format!("Duplicate column `{name}`")));
            }
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PipelineError::validation(format!(
                "Row {idx} has {} values but the dataset has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Build a dataset from name/value records. The column list is the union
    /// of all names in first-seen order; names a record lacks become nulls.
    pub fn from_records(records: Vec<Vec<(String, Value)>>) -> PipelineResult<Self> {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for (name, _) in record {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for (idx, record) in records.into_iter().enumerate() {
            let mut row = vec![Value::Null; columns.len()];
            let mut seen = vec![false; columns.len()];
            for (name, value) in record {
                let Some(pos) = columns.iter().position(|c| *c == name) else {
                    continue;
                };
                if seen[pos] {
                    return Err(PipelineError::validation(format!(
                        "Record {idx} sets `{name}` more than once"
                    )));
                }
                seen[pos] = true;
                row[pos] = value;
            }
            rows.push(row);
        }

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column that must exist (`SchemaError` otherwise).
    pub fn require_column(&self, name: &str) -> PipelineResult<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::schema(format!("Missing required column: `{name}`")))
    }

    /// All values of one column, in row order.
    pub fn column(&self, name: &str) -> PipelineResult<Vec<&Value>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// A new dataset containing only the rows for which `keep` returns true.
    pub fn filter_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&[Value]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// A new dataset where column `idx` is rewritten by `f`.
    pub fn map_column<F>(&self, idx: usize, mut f: F) -> Dataset
    where
        F: FnMut(&Value) -> Value,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = row.clone();
                out[idx] = f(&row[idx]);
                out
            })
            .collect();
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }
}

/// Dense numeric features with their names, row-major as produced by the
/// encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: DMatrix<f64>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, values: DMatrix<f64>) -> PipelineResult<Self> {
        if names.len() != values.ncols() {
            return Err(PipelineError::internal(format!(
                "Feature matrix has {} columns but {} names",
                values.ncols(),
                names.len()
            )));
        }
        Ok(Self { names, values })
    }

    /// Build from row vectors (each of length `names.len()`).
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> PipelineResult<Self> {
        let ncols = names.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(PipelineError::internal(format!(
                "Feature row has {} values, expected {ncols}",
                bad.len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(names, DMatrix::from_row_slice(rows.len(), ncols, &flat))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        self.values.row(i).iter().copied().collect()
    }

    /// A new matrix with the given rows (in the given order).
    pub fn select_rows(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            names: self.names.clone(),
            values: self.values.select_rows(indices.iter()),
        }
    }
}
