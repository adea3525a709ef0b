//! Shared fixtures for unit tests.

use crate::artifact::ArtifactBundle;
use crate::domain::{ColumnRoles, Dataset, Value};
use crate::features::{FeaturePipeline, ImputeStrategy, Mode};
use crate::training::{TrainerConfig, train};

pub(crate) fn roles() -> ColumnRoles {
    ColumnRoles {
        target: "y".into(),
        required: vec!["year".into()],
        impute: vec!["workers".into()],
        categorical: vec!["zone".into()],
        ignore: vec!["id".into()],
    }
}

/// 40 rows; `y` depends on zone and workers, a few `workers` are null.
pub(crate) fn training_set() -> Dataset {
    let zones = ["N", "S", "E"];
    let rows = (0..40)
        .map(|i| {
            let zone = zones[i % 3];
            let workers = if i % 9 == 4 { None } else { Some(10.0 + (i % 7) as f64) };
            let y = 1000.0 * (1 + i % 3) as f64 + 50.0 * workers.unwrap_or(13.0) + i as f64;
            vec![
                Value::Text(format!("wh_{i}")),
                Value::Number(1990.0 + (i % 20) as f64),
                Value::from(zone),
                Value::from(workers),
                Value::Number(y),
            ]
        })
        .collect();
    Dataset::new(
        vec!["id".into(), "year".into(), "zone".into(), "workers".into(), "y".into()],
        rows,
    )
    .unwrap()
}

pub(crate) fn bundle() -> ArtifactBundle {
    let data = training_set();
    let pipeline = FeaturePipeline::new(roles(), ImputeStrategy::Mean).unwrap().fit(&data).unwrap();
    let transformed = pipeline.transform(&data, Mode::Fit).unwrap();
    let outcome = train(
        &transformed.features,
        &transformed.target.unwrap(),
        &TrainerConfig::default(),
    )
    .unwrap();
    ArtifactBundle::new(pipeline, outcome.model, outcome.metrics).unwrap()
}
