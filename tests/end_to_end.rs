use std::fmt::Write as _;

use serde_json::json;
use wh_capacity::app::pipeline::{TrainingConfig, run_training};
use wh_capacity::artifact;
use wh_capacity::domain::ColumnRoles;
use wh_capacity::error::PipelineError;
use wh_capacity::features::{ImputeStrategy, Mode};
use wh_capacity::io::{load_dataset, read_dataset};
use wh_capacity::serve::{InferenceService, Status};
use wh_capacity::training::TrainerConfig;

fn roles() -> ColumnRoles {
    ColumnRoles {
        target: "capacity".into(),
        required: vec!["year".into()],
        impute: vec!["workers".into()],
        categorical: vec!["zone".into()],
        ignore: vec!["id".into()],
    }
}

/// 100 rows, 3 zones, 5 missing `workers` cells.
fn csv_text() -> String {
    let zones = ["A", "B", "C"];
    let mut out = String::from("ID,Zone,Workers,Year,Capacity\n");
    for i in 0..100 {
        let zone = zones[i % 3];
        let workers = 20 + (i * 7) % 40;
        let cell = if i % 20 == 3 { String::new() } else { workers.to_string() };
        let capacity = 5000 + 1500 * (i % 3) + 40 * workers + 3 * i;
        writeln!(out, "wh{i},{zone},{cell},{},{capacity}", 1995 + i % 25).unwrap();
    }
    out
}

fn train_to(dir: &std::path::Path) -> TrainingConfig {
    let data = dir.join("train.csv");
    std::fs::write(&data, csv_text()).unwrap();
    let config = TrainingConfig {
        data,
        artifact: dir.join("model.whcap"),
        report: Some(dir.join("report.json")),
        roles: roles(),
        impute_strategy: ImputeStrategy::Mean,
        trainer: TrainerConfig::default(),
    };
    run_training(&config).unwrap();
    config
}

#[test]
fn train_save_load_and_serve() {
    let dir = tempfile::tempdir().unwrap();
    let config = train_to(dir.path());

    let service = InferenceService::load(&config.artifact).unwrap();
    let bundle = service.bundle();
    assert_eq!(
        bundle.schema_fingerprint,
        vec!["zone=A", "zone=B", "zone=C", "workers", "year"]
    );
    assert_eq!(bundle.metrics.n_test, 20);
    assert!(bundle.metrics.mape.is_finite());

    // A fourth, never-seen zone still yields a numeric prediction.
    let response = service.handle(&json!({"id": "new", "zone": "D", "workers": 31, "year": 2010}));
    assert_eq!(response.status, Status::Ok);
    assert!(response.body["prediction"][0].as_f64().unwrap().is_finite());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.report.unwrap()).unwrap()).unwrap();
    assert_eq!(report["rows_read"], 100);
    assert_eq!(report["rows_used"], 100);
    assert_eq!(report["features"].as_array().unwrap().len(), 5);
}

#[test]
fn training_and_serving_transforms_agree() {
    let dir = tempfile::tempdir().unwrap();
    let config = train_to(dir.path());
    let service = InferenceService::load(&config.artifact).unwrap();
    let pipeline = &service.bundle().pipeline;

    // The same raw rows, once from CSV and once as JSON requests, must encode
    // to identical feature rows.
    let ingest = load_dataset(&config.data, &roles()).unwrap();
    let offline = pipeline.transform(&ingest.dataset, Mode::Fit).unwrap();

    let request = json!([
        {"id": "wh0", "zone": "A", "workers": 20, "year": 1995},
        {"id": "wh3", "zone": "A", "workers": null, "year": 1998},
    ]);
    let online = service.predict(&request).unwrap();
    let expected: Vec<f64> = [0, 3]
        .iter()
        .map(|&i| service.bundle().model.predict_row(&offline.features.row(i)))
        .collect();
    assert_eq!(online, expected);
}

#[test]
fn reloaded_bundle_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let config = train_to(dir.path());

    let first = InferenceService::load(&config.artifact).unwrap();
    let copy = dir.path().join("copy.whcap");
    artifact::save(first.bundle(), &copy).unwrap();
    let second = InferenceService::load(&copy).unwrap();

    let request = json!([
        {"zone": "B", "workers": 44, "year": 2001},
        {"zone": "C", "workers": null, "year": 2015},
    ]);
    assert_eq!(first.predict(&request).unwrap(), second.predict(&request).unwrap());
}

#[test]
fn fingerprint_is_stable_across_category_mixes() {
    let dir = tempfile::tempdir().unwrap();
    let config = train_to(dir.path());
    let pipeline = InferenceService::load(&config.artifact).unwrap().bundle().pipeline.clone();

    let only_a = "zone,workers,year\nA,10,2000\nA,12,2001\n";
    let unseen = "zone,workers,year\nQ,10,2000\n";
    for csv in [only_a, unseen] {
        let data = read_dataset(csv.as_bytes(), &roles()).unwrap().dataset;
        let out = pipeline.transform(&data, Mode::Serve).unwrap();
        assert_eq!(out.features.names(), pipeline.feature_names());
    }
}

#[test]
fn missing_artifact_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let err = InferenceService::load(&dir.path().join("nope.whcap")).unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactNotFound(_)));
}
