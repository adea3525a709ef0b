//! Synthetic FMCG warehouse records in the default column layout.
//!
//! The generated table mirrors the public supply-chain dataset the default
//! roles describe: identifiers, six categorical attributes, a block of
//! numeric operational counters and the `product_wg_ton` target. A share of
//! `workers_num`, `wh_est_year` and `approved_wh_govt_certificate` cells is
//! left empty so the validator and imputer have real work to do.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Dataset, Value};
use crate::error::AppError;

/// Generation settings. Missing rates are per-cell probabilities.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub rows: usize,
    pub seed: u64,
    pub missing_workers: f64,
    pub missing_est_year: f64,
    pub missing_certificate: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            rows: 1000,
            seed: 42,
            missing_workers: 0.04,
            missing_est_year: 0.10,
            missing_certificate: 0.03,
        }
    }
}

pub const SAMPLE_COLUMNS: [&str; 24] = [
    "ware_house_id",
    "wh_manager_id",
    "location_type",
    "wh_capacity_size",
    "zone",
    "wh_regional_zone",
    "num_refill_req_l3m",
    "transport_issue_l1y",
    "competitor_in_mkt",
    "retail_shop_num",
    "wh_owner_type",
    "distributor_num",
    "flood_impacted",
    "flood_proof",
    "electric_supply",
    "dist_from_hub",
    "workers_num",
    "wh_est_year",
    "storage_issue_reported_l3m",
    "temp_reg_mach",
    "approved_wh_govt_certificate",
    "wh_breakdown_l3m",
    "govt_check_l3m",
    "product_wg_ton",
];

const LOCATION: [&str; 2] = ["Urban", "Rural"];
const CAPACITY: [&str; 3] = ["Small", "Mid", "Large"];
const ZONE: [&str; 4] = ["North", "South", "East", "West"];
const REGION: [&str; 6] = ["Zone 1", "Zone 2", "Zone 3", "Zone 4", "Zone 5", "Zone 6"];
const OWNER: [&str; 2] = ["Company Owned", "Rented"];
const CERTIFICATE: [&str; 5] = ["A+", "A", "B+", "B", "C"];

pub fn generate_sample(config: &SampleConfig) -> Result<Dataset, AppError> {
    if config.rows == 0 {
        return Err(AppError::new(2, "Row count must be > 0."));
    }
    let rates = [config.missing_workers, config.missing_est_year, config.missing_certificate];
    if rates.iter().any(|p| !(0.0..1.0).contains(p)) {
        return Err(AppError::new(2, "Missing-value rates must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 1200.0).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut rows = Vec::with_capacity(config.rows);
    for i in 0..config.rows {
        let capacity = rng.gen_range(0..CAPACITY.len());
        let location = rng.gen_range(0..LOCATION.len());
        let certificate = rng.gen_range(0..CERTIFICATE.len());

        let refills = rng.gen_range(0..=8) as f64;
        let transport_issues = rng.gen_range(0..=5) as f64;
        let storage_issues = rng.gen_range(0..=39) as f64;
        let breakdowns = rng.gen_range(0..=6) as f64;
        let govt_checks = rng.gen_range(1..=32) as f64;
        let workers = rng.gen_range(10..=98) as f64;
        let est_year = rng.gen_range(1996..=2023) as f64;
        let temp_reg = f64::from(u8::from(rng.gen_bool(0.3)));

        // Storage issues dominate, as in the real data; capacity, refills and
        // certificate grade add smaller effects.
        let target = 2000.0
            + 1350.0 * storage_issues
            + 700.0 * capacity as f64
            + 150.0 * refills
            - 180.0 * transport_issues
            + 250.0 * (CERTIFICATE.len() - certificate) as f64
            + 900.0 * temp_reg
            + noise.sample(&mut rng);

        rows.push(vec![
            Value::Text(format!("WH_{:06}", 100_000 + i)),
            Value::Text(format!("EID_{:06}", 500_000 + i)),
            Value::from(LOCATION[location]),
            Value::from(CAPACITY[capacity]),
            Value::from(ZONE[rng.gen_range(0..ZONE.len())]),
            Value::from(REGION[rng.gen_range(0..REGION.len())]),
            Value::Number(refills),
            Value::Number(transport_issues),
            Value::Number(rng.gen_range(0..=12) as f64),
            Value::Number(rng.gen_range(1800..=11000) as f64),
            Value::from(OWNER[rng.gen_range(0..OWNER.len())]),
            Value::Number(rng.gen_range(15..=70) as f64),
            Value::Number(f64::from(u8::from(rng.gen_bool(0.1)))),
            Value::Number(f64::from(u8::from(rng.gen_bool(0.05)))),
            Value::Number(f64::from(u8::from(rng.gen_bool(0.65)))),
            Value::Number(rng.gen_range(55..=271) as f64),
            maybe_missing(&mut rng, config.missing_workers, Value::Number(workers)),
            maybe_missing(&mut rng, config.missing_est_year, Value::Number(est_year)),
            Value::Number(storage_issues),
            Value::Number(temp_reg),
            maybe_missing(&mut rng, config.missing_certificate, Value::from(CERTIFICATE[certificate])),
            Value::Number(breakdowns),
            Value::Number(govt_checks),
            Value::Number(target.max(1000.0).round()),
        ]);
    }

    let columns = SAMPLE_COLUMNS.iter().map(|c| c.to_string()).collect();
    Dataset::new(columns, rows).map_err(|e| AppError::new(4, format!("Sample generation failed: {e}")))
}

fn maybe_missing(rng: &mut StdRng, rate: f64, value: Value) -> Value {
    if rate > 0.0 && rng.gen_bool(rate) { Value::Null } else { value }
}
