//! One-hot encoding over named categorical columns.
//!
//! Output schema (fixed at fit time):
//!
//! 1. one slot per `(column, value)` pair, in categorical column order and
//!    then sorted vocabulary order, named `column=value`
//! 2. every passthrough column, in the training dataset's column order
//!
//! At apply time the same schema is emitted regardless of which categories a
//! batch contains. Values never seen at fit time (and nulls) produce an
//! all-zero expansion for that column rather than an error.

use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, FeatureMatrix, Value};
use crate::error::{PipelineError, PipelineResult};

/// Sorted set of categories observed for one column at fit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub column: String,
    pub values: Vec<String>,
}

impl Vocabulary {
    fn slot(&self, value: &Value) -> Option<usize> {
        let key = value.category_key()?;
        self.values.binary_search(&key).ok()
    }
}

/// Fitted encoder state. Immutable after `fit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FittedEncoder {
    vocabularies: Vec<Vocabulary>,
    passthrough: Vec<String>,
    feature_names: Vec<String>,
}

impl FittedEncoder {
    /// Learn vocabularies for `categorical` and resolve passthrough columns.
    ///
    /// Every dataset column that is neither categorical nor listed in
    /// `excluded` (target, ignored columns) becomes a passthrough feature.
    pub fn fit(dataset: &Dataset, categorical: &[String], excluded: &[String]) -> PipelineResult<Self> {
        let mut vocabularies = Vec::with_capacity(categorical.len());
        for column in categorical {
            let mut values: Vec<String> = dataset
                .column(column)?
                .into_iter()
                .filter_map(Value::category_key)
                .collect();
            values.sort();
            values.dedup();
            if values.is_empty() {
                tracing::warn!(column = %column, "categorical column has no observed values; it will contribute no features");
            }
            vocabularies.push(Vocabulary {
                column: column.clone(),
                values,
            });
        }

        let passthrough: Vec<String> = dataset
            .columns()
            .iter()
            .filter(|c| !categorical.contains(c) && !excluded.contains(c))
            .cloned()
            .collect();

        let feature_names = output_names(&vocabularies, &passthrough);
        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(PipelineError::schema(format!(
                    "Encoded feature name `{name}` is produced twice; rename the clashing column"
                )));
            }
        }

        tracing::debug!(
            categorical = vocabularies.len(),
            passthrough = passthrough.len(),
            features = feature_names.len(),
            "encoder fitted"
        );

        Ok(Self {
            vocabularies,
            passthrough,
            feature_names,
        })
    }

    /// Encode `dataset` into the fitted output schema.
    pub fn apply(&self, dataset: &Dataset) -> PipelineResult<FeatureMatrix> {
        let cat_idx: Vec<usize> = self
            .vocabularies
            .iter()
            .map(|v| dataset.require_column(&v.column))
            .collect::<PipelineResult<_>>()?;
        let pass_idx: Vec<usize> = self
            .passthrough
            .iter()
            .map(|c| dataset.require_column(c))
            .collect::<PipelineResult<_>>()?;

        let width = self.feature_names.len();
        let mut rows = Vec::with_capacity(dataset.len());

        for (row_no, row) in dataset.rows().iter().enumerate() {
            let mut out = vec![0.0; width];
            let mut offset = 0;

            for (vocab, &idx) in self.vocabularies.iter().zip(&cat_idx) {
                if let Some(slot) = vocab.slot(&row[idx]) {
                    out[offset + slot] = 1.0;
                }
                offset += vocab.values.len();
            }

            for (name, &idx) in self.passthrough.iter().zip(&pass_idx) {
                out[offset] = match &row[idx] {
                    Value::Number(v) => *v,
                    Value::Null => {
                        return Err(PipelineError::validation(format!(
                            "Row {row_no}: missing value for numeric column `{name}`"
                        )));
                    }
                    Value::Text(s) => {
                        return Err(PipelineError::validation(format!(
                            "Row {row_no}: expected a number for `{name}`, got \"{s}\""
                        )));
                    }
                };
                offset += 1;
            }

            rows.push(out);
        }

        FeatureMatrix::from_rows(self.feature_names.clone(), &rows)
    }

    /// Ordered output feature names.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn vocabularies(&self) -> &[Vocabulary] {
        &self.vocabularies
    }

    pub fn passthrough(&self) -> &[String] {
        &self.passthrough
    }

    /// Whether deserialized state is self-consistent: sorted, deduplicated
    /// vocabularies and a feature-name list derivable from them.
    pub(crate) fn is_consistent(&self) -> bool {
        self.vocabularies
            .iter()
            .all(|v| v.values.windows(2).all(|w| w[0] < w[1]))
            && self.feature_names == output_names(&self.vocabularies, &self.passthrough)
    }
}

fn output_names(vocabularies: &[Vocabulary], passthrough: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for vocab in vocabularies {
        for value in &vocab.values {
            names.push(format!("{}={}", vocab.column, value));
        }
    }
    names.extend(passthrough.iter().cloned());
    names
}
