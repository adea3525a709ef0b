//! Top-level application orchestration.
//!
//! `src/main.rs` only sets up logging and the exit code; this module is the
//! "real main" that:
//! - parses CLI arguments
//! - resolves column roles
//! - runs training, one-shot prediction, the line-oriented server or the
//!   sample generator

use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use clap::Parser;
use serde_json::{Value as Json, json};

use crate::cli::{Command, GenerateArgs, PredictArgs, RoleArgs, ServeArgs, TrainArgs};
use crate::data::{SampleConfig, generate_sample};
use crate::domain::ColumnRoles;
use crate::error::AppError;
use crate::models::{EstimatorConfig, ForestParams};
use crate::serve::{InferenceService, Response, Status};
use crate::training::TrainerConfig;

pub mod pipeline;

/// Entry point for the `whcap` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Predict(args) => handle_predict(args),
        Command::Serve(args) => handle_serve(args),
        Command::Generate(args) => handle_generate(args),
    }
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = training_config_from_args(&args)?;
    let run = pipeline::run_training(&config)?;

    let metrics = &run.bundle.metrics;
    println!("model      {}", run.bundle.model.kind().display_name());
    println!(
        "rows       {} read, {} rejected, {} dropped, {} used",
        run.report.rows_read,
        run.report.rows_rejected_at_ingest,
        run.report.rows_dropped_by_validation,
        run.report.rows_used
    );
    println!("features   {}", run.bundle.schema_fingerprint.len());
    println!("split      {} train / {} test", metrics.n_train, metrics.n_test);
    println!("MAPE       {:.4} ({:.2}%)", metrics.mape, metrics.mape * 100.0);
    println!("artifact   {}", config.artifact.display());
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let service = InferenceService::load(&args.artifact)?;

    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", path.display())))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| AppError::new(2, format!("Failed to read stdin: {e}")))?;
            buf
        }
    };

    let response = respond(&service, &raw);
    println!("{}", response.body);

    match response.status {
        Status::Ok => Ok(()),
        Status::ClientError => Err(AppError::new(2, "Request rejected.")),
        Status::ServerError => Err(AppError::new(4, "Prediction failed.")),
    }
}

fn handle_serve(args: ServeArgs) -> Result<(), AppError> {
    let service = InferenceService::load(&args.artifact)?;
    let health = service.health();
    tracing::info!(
        model = health.model.display_name(),
        features = health.features,
        created_at = %health.created_at,
        "serving; one JSON request per line"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| AppError::new(4, format!("Failed to read stdin: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(&service, &line);
        writeln!(stdout, "{}", response.body)
            .and_then(|()| stdout.flush())
            .map_err(|e| AppError::new(4, format!("Failed to write response: {e}")))?;
    }
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        rows: args.rows,
        seed: args.seed,
        ..SampleConfig::default()
    };
    let dataset = generate_sample(&config)?;
    crate::io::write_dataset_csv(&args.out, &dataset)?;
    println!("wrote {} rows to {}", dataset.len(), args.out.display());
    Ok(())
}

/// Parse one request body and hand it to the service.
fn respond(service: &InferenceService, raw: &str) -> Response {
    match serde_json::from_str::<Json>(raw) {
        Ok(payload) => service.handle(&payload),
        Err(e) => Response {
            status: Status::ClientError,
            body: json!({ "error": format!("invalid JSON: {e}") }),
        },
    }
}

pub fn training_config_from_args(args: &TrainArgs) -> Result<pipeline::TrainingConfig, AppError> {
    Ok(pipeline::TrainingConfig {
        data: args.data.clone(),
        artifact: args.artifact.clone(),
        report: args.report.clone(),
        roles: resolve_roles(&args.roles)?,
        impute_strategy: args.impute_strategy,
        trainer: TrainerConfig {
            test_fraction: args.test_fraction,
            split_seed: args.split_seed,
            estimator: EstimatorConfig {
                kind: args.model,
                forest: ForestParams {
                    n_trees: args.trees,
                    seed: args.seed,
                    max_depth: args.max_depth,
                    min_samples_split: args.min_samples_split,
                    min_samples_leaf: args.min_samples_leaf,
                },
            },
        },
    })
}

/// Roles file (or the built-in roles), then per-list flag overrides.
pub fn resolve_roles(args: &RoleArgs) -> Result<ColumnRoles, AppError> {
    let mut roles = match &args.roles {
        Some(path) => read_roles_file(path)?,
        None => ColumnRoles::default(),
    };

    if let Some(target) = &args.target {
        roles.target = target.clone();
    }
    if let Some(list) = &args.required {
        roles.required = list.clone();
    }
    if let Some(list) = &args.impute {
        roles.impute = list.clone();
    }
    if let Some(list) = &args.categorical {
        roles.categorical = list.clone();
    }
    if let Some(list) = &args.ignore {
        roles.ignore = list.clone();
    }

    let roles = roles.normalized();
    roles.validate()?;
    Ok(roles)
}

fn read_roles_file(path: &Path) -> Result<ColumnRoles, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read roles file '{}': {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::new(2, format!("Invalid roles file '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_the_default_roles() {
        let args = RoleArgs {
            target: Some(" Capacity ".into()),
            categorical: Some(vec!["Zone".into()]),
            ..RoleArgs::default()
        };
        let roles = resolve_roles(&args).unwrap();
        assert_eq!(roles.target, "capacity");
        assert_eq!(roles.categorical, vec!["zone"]);
        assert_eq!(roles.impute, ColumnRoles::default().impute);
    }

    #[test]
    fn conflicting_roles_exit_with_code_2() {
        let args = RoleArgs {
            impute: Some(vec!["zone".into()]),
            ..RoleArgs::default()
        };
        assert_eq!(resolve_roles(&args).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn roles_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.json");
        std::fs::write(&path, r#"{"target": "y", "categorical": ["zone"]}"#).unwrap();

        let roles = resolve_roles(&RoleArgs {
            roles: Some(path),
            ..RoleArgs::default()
        })
        .unwrap();
        assert_eq!(roles.target, "y");
        assert!(roles.required.is_empty());
    }

    #[test]
    fn invalid_json_is_a_client_error_response() {
        let service = InferenceService::new(crate::testutil::bundle());
        let response = respond(&service, "{not json");
        assert_eq!(response.status, Status::ClientError);
        assert!(response.body["error"].as_str().unwrap().starts_with("invalid JSON"));
    }
}
