//! Shared fixtures for integration tests.
//!
//! A synthetic well table with a known NPV relationship, written into a
//! temporary directory, plus a config whose every path points inside it.

#![allow(dead_code)]

use npv_predictor::config::PipelineConfig;
use npv_predictor::types::WellInput;
use std::fmt::Write as _;
use std::path::Path;

pub const TRAJECTORIES: [&str; 3] = ["S-TYPE", "U-TYPE", "VGS"];

/// Build a deterministic raw CSV with `rows` wells.
pub fn synthetic_csv(rows: usize) -> String {
    let mut csv = String::from(
        "Heff,Perm,Sg,L_hor,GS,temp,C5,GRP,nGS,cond rate,gas rate,sum cond,sum gas,NPV\n",
    );
    for i in 0..rows {
        let heff = 5.0 + (i % 10) as f64;
        let perm = 50.0 + 10.0 * (i % 7) as f64;
        let sg = 0.5 + 0.05 * (i % 8) as f64;
        let l_hor = 300.0 + 50.0 * (i % 9) as f64;
        let gs = TRAJECTORIES[i % 3];
        let temp = 10.0 + (i % 5) as f64;
        let c5 = 0.2 + 0.1 * (i % 6) as f64;
        let grp = (i % 4) as i64;
        let n_gs = 1 + (i % 3) as i64;
        let bonus = match gs {
            "U-TYPE" => 20.0,
            "VGS" => -10.0,
            _ => 0.0,
        };
        let npv = 3.0 * heff + 0.2 * perm + 40.0 * sg + 0.05 * l_hor - temp + 15.0 * c5
            + 5.0 * grp as f64
            + 8.0 * n_gs as f64
            + bonus;
        let _ = writeln!(
            csv,
            "{heff},{perm},{sg},{l_hor},{gs},{temp},{c5},{grp},{n_gs},{},{},{},{},{npv}",
            i,
            i * 2,
            i * 10,
            i * 20
        );
    }
    csv
}

/// Write the same table as `synthetic_csv(rows)` to an xlsx workbook.
/// Numeric cells are stored as numbers.
pub fn write_synthetic_xlsx(path: &Path, rows: usize) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, line) in synthetic_csv(rows).lines().enumerate() {
        for (c, cell) in line.split(',').enumerate() {
            match cell.parse::<f64>() {
                Ok(v) if r > 0 => sheet.write_number(r as u32, c as u16, v).unwrap(),
                _ => sheet.write_string(r as u32, c as u16, cell).unwrap(),
            };
        }
    }
    workbook.save(path).unwrap();
}

/// Config rooted at `dir` with the raw table already written.
pub fn fixture_config(dir: &Path, rows: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.data.raw_path = dir.join("data/raw/wells.csv");
    config.data.processed_path = dir.join("data/processed/split.json");

    let a = &mut config.artifacts;
    a.model_path = dir.join("models/model.json");
    a.encoder_path = dir.join("models/encoder.json");
    a.feature_columns_path = dir.join("models/feature_columns.json");
    a.metrics_path = dir.join("models/metrics.json");
    a.evaluation_path = dir.join("models/evaluation.json");
    a.report_path = dir.join("reports/model_report.json");
    a.registry_status_path = dir.join("reports/registry_status.json");

    config.model.hyperparameters.n_estimators = 60;
    config.model.hyperparameters.max_depth = 3;
    config.training.cv_folds = 3;
    config.tracking.enabled = false;

    std::fs::create_dir_all(dir.join("data/raw")).unwrap();
    std::fs::write(&config.data.raw_path, synthetic_csv(rows)).unwrap();
    config
}

/// Well used for end-to-end prediction checks.
pub fn reference_well() -> WellInput {
    WellInput {
        heff: 15.0,
        perm: 150.0,
        sg: 0.75,
        l_hor: 600.0,
        gs: "S-TYPE".to_string(),
        temp: 25.0,
        c5: 0.6,
        grp: 2,
        n_gs: 3,
    }
}
