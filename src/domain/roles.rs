//! Named column roles.
//!
//! Columns are tagged by *name*, never by position, so a reordered CSV or a
//! JSON request with keys in any order produces the same features. The role
//! mapping is validated once at startup and then stored inside the artifact
//! bundle, which makes the serving-time tagging identical to training.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// The role a single column plays in the feature pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    /// Regression target (training only).
    Target,
    /// Numeric column whose nulls are filled by the imputer.
    Impute,
    /// Column expanded by the one-hot encoder.
    Categorical,
    /// Excluded from features entirely (identifiers and the like).
    Ignore,
    /// Numeric column copied to the output unchanged.
    Passthrough,
}

/// Role configuration for a dataset.
///
/// Every column not named here is a passthrough feature. `required` is an
/// attribute rather than a role: rows missing a value in any required column
/// are dropped before fitting and before prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub target: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub impute: Vec<String>,
    #[serde(default)]
    pub categorical: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl Default for ColumnRoles {
    /// Roles for the FMCG warehouse dataset this tool was built around.
    fn default() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            target: "product_wg_ton".to_string(),
            required: names(&["wh_est_year", "approved_wh_govt_certificate"]),
            impute: names(&["workers_num"]),
            categorical: names(&[
                "location_type",
                "wh_capacity_size",
                "zone",
                "wh_regional_zone",
                "wh_owner_type",
                "approved_wh_govt_certificate",
            ]),
            ignore: names(&["ware_house_id", "wh_manager_id"]),
        }
    }
}

impl ColumnRoles {
    /// Lowercase and trim every name, matching how ingest normalizes headers.
    pub fn normalized(&self) -> Self {
        fn norm(list: &[String]) -> Vec<String> {
            list.iter().map(|s| normalize_column_name(s)).collect()
        }

        Self {
            target: normalize_column_name(&self.target),
            required: norm(&self.required),
            impute: norm(&self.impute),
            categorical: norm(&self.categorical),
            ignore: norm(&self.ignore),
        }
    }

    /// Check that every column is tagged at most once.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.target.trim().is_empty() {
            return Err(PipelineError::schema("Target column name is empty"));
        }

        let lists: [(&str, &[String]); 4] = [
            ("required", &self.required),
            ("impute", &self.impute),
            ("categorical", &self.categorical),
            ("ignore", &self.ignore),
        ];
        for (label, list) in lists {
            for (i, name) in list.iter().enumerate() {
                if name.trim().is_empty() {
                    return Err(PipelineError::schema(format!("Empty column name in `{label}`")));
                }
                if list[..i].contains(name) {
                    return Err(PipelineError::schema(format!(
                        "Column `{name}` is listed twice in `{label}`"
                    )));
                }
            }
        }

        if self.required.contains(&self.target) {
            return Err(PipelineError::schema(format!(
                "Target `{}` must not be listed as required (requests never carry it)",
                self.target
            )));
        }

        // Feature roles are mutually exclusive.
        let exclusive: [(&str, &[String]); 3] = [
            ("impute", &self.impute),
            ("categorical", &self.categorical),
            ("ignore", &self.ignore),
        ];
        for (label, list) in exclusive {
            if list.contains(&self.target) {
                return Err(PipelineError::schema(format!(
                    "Target `{}` is also tagged `{label}`",
                    self.target
                )));
            }
        }
        for (i, (label_a, list_a)) in exclusive.iter().enumerate() {
            for (label_b, list_b) in &exclusive[i + 1..] {
                if let Some(name) = list_a.iter().find(|n| list_b.contains(n)) {
                    return Err(PipelineError::schema(format!(
                        "Column `{name}` is tagged both `{label_a}` and `{label_b}`"
                    )));
                }
            }
        }

        if let Some(name) = self.required.iter().find(|n| self.ignore.contains(n)) {
            return Err(PipelineError::schema(format!(
                "Column `{name}` is both required and ignored"
            )));
        }

        Ok(())
    }

    /// Resolve the role of a column by name.
    pub fn role_of(&self, name: &str) -> ColumnRole {
        if self.target == name {
            ColumnRole::Target
        } else if self.impute.iter().any(|c| c == name) {
            ColumnRole::Impute
        } else if self.categorical.iter().any(|c| c == name) {
            ColumnRole::Categorical
        } else if self.ignore.iter().any(|c| c == name) {
            ColumnRole::Ignore
        } else {
            ColumnRole::Passthrough
        }
    }
}

/// Canonical form of a column name: trimmed, BOM-stripped, lowercase.
pub fn normalize_column_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roles_are_valid() {
        ColumnRoles::default().validate().unwrap();
    }

    #[test]
    fn a_column_cannot_have_two_feature_roles() {
        let roles = ColumnRoles {
            target: "y".into(),
            required: vec![],
            impute: vec!["a".into()],
            categorical: vec!["a".into()],
            ignore: vec![],
        };
        let err = roles.validate().unwrap_err();
        assert!(err.to_string().contains("`a`"), "{err}");
    }

    #[test]
    fn target_cannot_be_required() {
        let roles = ColumnRoles {
            target: "y".into(),
            required: vec!["y".into()],
            impute: vec![],
            categorical: vec![],
            ignore: vec![],
        };
        assert!(matches!(roles.validate(), Err(PipelineError::Schema(_))));
    }

    #[test]
    fn required_may_overlap_a_feature_role() {
        let roles = ColumnRoles::default();
        assert!(roles.required.contains(&"approved_wh_govt_certificate".to_string()));
        assert_eq!(roles.role_of("approved_wh_govt_certificate"), ColumnRole::Categorical);
        assert_eq!(roles.role_of("wh_est_year"), ColumnRole::Passthrough);
        assert_eq!(roles.role_of("product_wg_ton"), ColumnRole::Target);
    }

    #[test]
    fn normalization_lowercases_and_strips_bom() {
        assert_eq!(normalize_column_name("\u{feff}Ware_house_ID "), "ware_house_id");
        let roles = ColumnRoles {
            target: "Product_WG_Ton".into(),
            ..ColumnRoles::default()
        }
        .normalized();
        assert_eq!(roles.target, "product_wg_ton");
    }
}
