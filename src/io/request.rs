//! JSON request payloads.
//!
//! The inference boundary accepts either one JSON object (a single record) or
//! an array of objects (a batch). Keys are normalized exactly like CSV headers
//! and cells are typed by column role, so a record means the same thing
//! whether it arrived as a CSV row at training time or as JSON at serving time.

use serde_json::Value as Json;

use crate::domain::{ColumnRole, ColumnRoles, Dataset, Value, normalize_column_name};
use crate::error::{PipelineError, PipelineResult};
use crate::io::ingest::is_missing;

/// Convert a JSON payload (object or array of objects) into a `Dataset`.
pub fn dataset_from_json(payload: &Json, roles: &ColumnRoles) -> PipelineResult<Dataset> {
    let objects: Vec<&serde_json::Map<String, Json>> = match payload {
        Json::Object(map) => vec![map],
        Json::Array(items) => {
            if items.is_empty() {
                return Err(PipelineError::validation("Request contains no records"));
            }
            items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    item.as_object().ok_or_else(|| {
                        PipelineError::validation(format!("Record {idx} is not a JSON object"))
                    })
                })
                .collect::<PipelineResult<_>>()?
        }
        _ => {
            return Err(PipelineError::validation(
                "Request body must be a JSON object or an array of objects",
            ));
        }
    };

    let mut records = Vec::with_capacity(objects.len());
    for (idx, object) in objects.into_iter().enumerate() {
        let mut record = Vec::with_capacity(object.len());
        for (key, raw) in object {
            let name = normalize_column_name(key);
            let value = json_cell(raw, roles.role_of(&name))
                .map_err(|e| PipelineError::validation(format!("Record {idx}, field `{key}`: {e}")))?;
            record.push((name, value));
        }
        records.push(record);
    }

    Dataset::from_records(records)
}

fn json_cell(raw: &Json, role: ColumnRole) -> Result<Value, String> {
    match raw {
        Json::Null => Ok(Value::Null),
        Json::Number(n) => {
            let v = n.as_f64().ok_or_else(|| format!("number {n} is out of range"))?;
            match role {
                ColumnRole::Categorical | ColumnRole::Ignore => Ok(Value::Text(format!("{v}"))),
                _ => Ok(Value::Number(v)),
            }
        }
        // Same missing markers as CSV cells, whatever the role.
        Json::String(s) if is_missing(s.trim()) => Ok(Value::Null),
        Json::String(s) => match role {
            ColumnRole::Categorical | ColumnRole::Ignore => Ok(Value::Text(s.trim().to_string())),
            _ => {
                let s = s.trim();
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(Value::Number)
                    .ok_or_else(|| format!("expected a number, got \"{s}\""))
            }
        },
        Json::Bool(_) => Err("booleans are not supported".to_string()),
        Json::Array(_) | Json::Object(_) => Err("nested values are not supported".to_string()),
    }
}
