use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use abtest::{ArmRole, Evaluation, evaluate_arms};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cli::BatchArgs;
use crate::manifest::{
    BatchManifest, BatchReport, ExperimentEntry, ExperimentOutcome, OutcomeStatus, REPORT_VERSION,
};
use crate::util::{now_utc_string, sha256_hex, write_json_pretty};

pub fn run(args: BatchArgs) -> Result<()> {
    let report = build_report(&args.input)?;

    let report_path = args
        .report_path
        .unwrap_or_else(|| default_report_path(&args.input));

    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), "wrote batch report");
    info!(
        experiments = report.experiment_count,
        failed = report.failed_count,
        "batch completed"
    );

    Ok(())
}

pub fn build_report(input: &Path) -> Result<BatchReport> {
    let raw = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let manifest: BatchManifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", input.display()))?;

    ensure_unique_names(&manifest.experiments)?;

    let mut results = Vec::with_capacity(manifest.experiments.len());
    for (index, row) in manifest.experiments.iter().enumerate() {
        let name = row_name(row, index);
        let outcome = match evaluate_row(row) {
            Ok(evaluation) => ExperimentOutcome {
                name,
                status: OutcomeStatus::Ok,
                evaluation: Some(evaluation),
                error: None,
            },
            Err(err) => {
                let message = format!("{err:#}");
                warn!(experiment = %name, error = %message, "experiment evaluation failed");
                ExperimentOutcome {
                    name,
                    status: OutcomeStatus::Error,
                    evaluation: None,
                    error: Some(message),
                }
            }
        };
        results.push(outcome);
    }

    let failed_count = results
        .iter()
        .filter(|outcome| outcome.status == OutcomeStatus::Error)
        .count();

    Ok(BatchReport {
        report_version: REPORT_VERSION,
        generated_at: now_utc_string(),
        input_path: input.display().to_string(),
        input_sha256: sha256_hex(&raw),
        experiment_count: results.len(),
        failed_count,
        results,
    })
}

fn evaluate_row(row: &Value) -> Result<Evaluation> {
    let entry: ExperimentEntry =
        serde_json::from_value(row.clone()).context("malformed experiment entry")?;

    let level = entry.confidence()?;
    debug!(experiment = %entry.name, level = %level, "evaluating experiment");
    let control = entry.control.to_arm(ArmRole::Control)?;
    let treatment = entry.treatment.to_arm(ArmRole::Treatment)?;

    Ok(evaluate_arms(&control, &treatment, level)?)
}

fn row_name(row: &Value, index: usize) -> String {
    row.get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("experiment-{}", index + 1))
}

fn ensure_unique_names(rows: &[Value]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in rows
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str))
    {
        let name = name.trim();
        if name.is_empty() {
            bail!("experiment names must not be empty");
        }
        if !seen.insert(name) {
            bail!("duplicate experiment name in manifest: {name}");
        }
    }
    Ok(())
}

fn default_report_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("batch");
    input.with_file_name(format!("{stem}.report.json"))
}
