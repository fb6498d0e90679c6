//! Local run tracking
//!
//! Every pipeline run records its parameters, metrics, stage timings and
//! artifact paths as one JSON file under `<dir>/<experiment>/<run_id>.json`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TrackingConfig;
use crate::error::Result;

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A single tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    /// Seconds spent in each pipeline stage
    pub stage_secs: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
    pub status: RunStatus,
    pub error: Option<String>,
}

impl Run {
    pub fn new(run_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: now.format("%Y%m%dT%H%M%S%.3fZ").to_string(),
            run_name: run_name.into(),
            started_at: now.to_rfc3339(),
            ended_at: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            stage_secs: BTreeMap::new(),
            artifacts: Vec::new(),
            status: RunStatus::Running,
            error: None,
        }
    }
}

/// Writes runs of one experiment to the local filesystem
#[derive(Debug, Clone)]
pub struct LocalTracker {
    experiment_dir: PathBuf,
    enabled: bool,
    run: Run,
}

impl LocalTracker {
    pub fn new(config: &TrackingConfig, run_name: impl Into<String>) -> Self {
        Self {
            experiment_dir: config.dir.join(&config.experiment),
            enabled: config.enabled,
            run: Run::new(run_name),
        }
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) {
        self.run.params.insert(key.into(), value.to_string());
    }

    pub fn log_params<K: Into<String>, V: ToString>(&mut self, params: impl IntoIterator<Item = (K, V)>) {
        for (k, v) in params {
            self.log_param(k, v);
        }
    }

    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        debug!(metric = %name, value, "Metric logged");
        self.run.metrics.insert(name, value);
    }

    pub fn log_stage(&mut self, stage: impl Into<String>, secs: f64) {
        self.run.stage_secs.insert(stage.into(), secs);
    }

    pub fn log_artifact(&mut self, path: impl AsRef<Path>) {
        self.run.artifacts.push(path.as_ref().display().to_string());
    }

    /// Close the run and write it; returns the file written, if any
    pub fn finish(&mut self, outcome: std::result::Result<(), String>) -> Result<Option<PathBuf>> {
        self.run.ended_at = Some(Utc::now().to_rfc3339());
        match outcome {
            Ok(()) => self.run.status = RunStatus::Finished,
            Err(reason) => {
                self.run.status = RunStatus::Failed;
                self.run.error = Some(reason);
            }
        }

        if !self.enabled {
            return Ok(None);
        }
        fs::create_dir_all(&self.experiment_dir)?;
        let path = self.experiment_dir.join(format!("{}.json", self.run.run_id));
        fs::write(&path, serde_json::to_string_pretty(&self.run)?)?;
        info!(path = %path.display(), status = ?self.run.status, "Run recorded");
        Ok(Some(path))
    }

    /// All runs recorded for an experiment, oldest first
    pub fn list_runs(config: &TrackingConfig) -> Result<Vec<Run>> {
        let dir = config.dir.join(&config.experiment);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|p| Ok(serde_json::from_str(&fs::read_to_string(p)?)?))
            .collect()
    }

    /// Finished run with the highest value of `metric`
    pub fn best_run(config: &TrackingConfig, metric: &str) -> Result<Option<Run>> {
        Ok(Self::list_runs(config)?
            .into_iter()
            .filter(|r| r.status == RunStatus::Finished)
            .filter_map(|r| r.metrics.get(metric).copied().map(|v| (v, r)))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, r)| r))
    }
}
