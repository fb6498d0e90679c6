//! Provider Fraud CLI Module
//!
//! Command-line interface for building the feature table, tuning and
//! training the model, validating inputs and scoring a single provider.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{DataPaths, PipelineConfig, UnmatchedPolicy};
use crate::inference::{FraudModel, Verdict};
use crate::runner::{PipelineRunner, RunSummary};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_fail(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<22} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "provider-fraud")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Provider-level healthcare fraud features and classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// JSON configuration file; missing fields take defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the four raw input tables under their default names
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Directory for the processed training table and top-code set
    #[arg(long, global = true)]
    pub processed_dir: Option<PathBuf>,

    /// Directory for the model artifact and tuning outputs
    #[arg(long, global = true)]
    pub artifacts_dir: Option<PathBuf>,

    /// Number of tuning trials
    #[arg(long, global = true)]
    pub n_trials: Option<usize>,

    /// Cross-validation folds per trial
    #[arg(long, global = true)]
    pub cv_folds: Option<usize>,

    /// Policy for claims without a beneficiary (fail, keep_missing, drop)
    #[arg(long, global = true)]
    pub unmatched_beneficiary: Option<String>,

    /// Do not write a run record
    #[arg(long, global = true)]
    pub no_tracking: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline: raw tables to a persisted model
    Run,

    /// Build the provider feature table from the raw tables
    Features,

    /// Tune and train from a processed feature table
    Train {
        /// Feature table (defaults to the configured training table)
        #[arg(short, long)]
        table: Option<PathBuf>,
    },

    /// Score one provider from a JSON object of feature name -> value
    Predict {
        /// JSON file holding the feature mapping
        #[arg(short, long)]
        features: PathBuf,

        /// Model artifact (defaults to the configured search locations)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Also print the fraud probability
        #[arg(long)]
        proba: bool,
    },

    /// Check the raw input tables and report every failed check
    Validate,
}

fn parse_policy(raw: &str) -> anyhow::Result<UnmatchedPolicy> {
    match raw {
        "fail" => Ok(UnmatchedPolicy::Fail),
        "keep_missing" | "keep-missing" => Ok(UnmatchedPolicy::KeepMissing),
        "drop" => Ok(UnmatchedPolicy::Drop),
        _ => anyhow::bail!("Invalid unmatched policy: {} (expected fail, keep_missing or drop)", raw),
    }
}

/// Configuration file plus command-line overrides
pub fn build_config(options: &GlobalOptions) -> anyhow::Result<PipelineConfig> {
    let mut config = match &options.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &options.data_dir {
        config = config.with_data(DataPaths::in_dir(dir));
    }
    if let Some(dir) = &options.processed_dir {
        config.output.processed_dir = dir.clone();
    }
    if let Some(dir) = &options.artifacts_dir {
        config.output.artifacts_dir = dir.clone();
    }
    if let Some(n) = options.n_trials {
        config = config.with_n_trials(n);
    }
    if let Some(n) = options.cv_folds {
        config = config.with_cv_folds(n);
    }
    if let Some(policy) = &options.unmatched_beneficiary {
        config = config.with_beneficiary_policy(parse_policy(policy)?);
    }
    if options.no_tracking {
        config = config.with_tracking(false);
    }

    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn print_summary(summary: &RunSummary) {
    section("Result");
    kv("Providers", &format!("{} ({} flagged)", summary.n_providers, summary.n_fraudulent));
    kv(
        "Trials",
        &format!("{} ({} failed)", summary.n_trials, summary.n_failed_trials),
    );
    kv("Best CV ROC AUC", &format!("{:.4}", summary.best_cv_score));
    kv("Test ROC AUC", &format!("{:.4}", summary.metrics.roc_auc));
    kv("Test recall", &format!("{:.4}", summary.metrics.recall));
    kv("Test F1", &format!("{:.4}", summary.metrics.f1_score));
    kv("scale_pos_weight", &format!("{}", summary.best_params.scale_pos_weight));
    kv("Artifact", &summary.artifact.display().to_string());

    if !summary.top_features.is_empty() {
        section("Top features");
        for (name, importance) in summary.top_features.iter().take(5) {
            println!("  {:<42} {:>10.1}", name, importance);
        }
    }

    section("Stages");
    for (stage, secs) in &summary.stages {
        println!("  {:<22} {:>8.2}s", muted(stage.name()), secs);
    }
    println!();
}

pub fn cmd_run(config: PipelineConfig) -> anyhow::Result<()> {
    section("Run");
    let start = Instant::now();
    let summary = PipelineRunner::new(config)?.run_all()?;
    step_ok(&format!("pipeline finished in {:.1?}", start.elapsed()));
    print_summary(&summary);
    Ok(())
}

pub fn cmd_features(config: PipelineConfig) -> anyhow::Result<()> {
    section("Features");
    step_run("Building provider feature table");
    let start = Instant::now();
    let features = PipelineRunner::new(config)?.run_features()?;
    step_done(&format!("{:.1?}", start.elapsed()));

    kv("Providers", &features.table.len().to_string());
    kv("Flagged", &features.table.positives().to_string());
    kv("Table", &features.table_path.display().to_string());
    kv("Top codes", &features.top_codes_path.display().to_string());
    println!();
    Ok(())
}

pub fn cmd_train(config: PipelineConfig, table: Option<&Path>) -> anyhow::Result<()> {
    section("Train");
    let start = Instant::now();
    let summary = PipelineRunner::new(config)?.run_training(table)?;
    step_ok(&format!("training finished in {:.1?}", start.elapsed()));
    print_summary(&summary);
    Ok(())
}

pub fn cmd_predict(
    config: PipelineConfig,
    features_path: &Path,
    model_path: Option<&Path>,
    show_proba: bool,
) -> anyhow::Result<()> {
    section("Predict");

    let locator = match model_path {
        Some(path) => config.model.clone().prefer(path),
        None => config.model.clone().prefer(config.output.model_artifact()),
    };
    step_run("Loading model");
    let model = FraudModel::load(&locator)?;
    step_done(&model.path().display().to_string());

    let json = std::fs::read_to_string(features_path)
        .with_context(|| format!("cannot read {}", features_path.display()))?;
    let features: HashMap<String, f64> =
        serde_json::from_str(&json).context("features must be a JSON object of name -> number")?;

    let verdict: Verdict = model.predict_verdict(&features)?;
    let label = match verdict {
        Verdict::Fraudulent => verdict.to_string().red().bold(),
        Verdict::Legitimate => verdict.to_string().green().bold(),
    };
    println!();
    println!("  {:<22} {} {}", muted("Prediction"), verdict.label(), label);
    if show_proba {
        kv("Fraud probability", &format!("{:.4}", model.predict_proba(&features)?));
    }
    println!();
    Ok(())
}

pub fn cmd_validate(config: PipelineConfig) -> anyhow::Result<()> {
    section("Validate");
    let reports = PipelineRunner::new(config)?.validate_inputs()?;

    let mut failed_tables = 0;
    for report in &reports {
        let detail = format!(
            "{} ({} rows, {}/{} checks passed)",
            report.dataset, report.row_count, report.passed, report.total_checks
        );
        if report.success {
            step_ok(&detail);
        } else {
            failed_tables += 1;
            step_fail(&detail);
            for message in report.failure_messages() {
                println!("      {}", dim(&message));
            }
        }
    }
    println!();

    if failed_tables > 0 {
        anyhow::bail!("{} of {} tables failed validation", failed_tables, reports.len());
    }
    Ok(())
}

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli.options)?;
    match cli.command {
        Commands::Run => cmd_run(config),
        Commands::Features => cmd_features(config),
        Commands::Train { table } => cmd_train(config, table.as_deref()),
        Commands::Predict { features, model, proba } => {
            cmd_predict(config, &features, model.as_deref(), proba)
        }
        Commands::Validate => cmd_validate(config),
    }
}
