//! Pipeline runner
//!
//! Drives one batch run through its stages in a fixed order:
//!
//! `Load -> Validate -> Process -> EngineerFeatures -> Aggregate -> MergeLabels -> Tune -> Train -> Persist`
//!
//! There are no checkpoints. The first failing stage aborts the run and the
//! returned error names it. `run_features` and `run_training` execute the
//! front and back halves of the same sequence on their own.

use polars::prelude::DataFrame;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::data::{BeneficiaryRecord, ClaimRecord, ClaimSource, ProviderLabel};
use crate::error::{FraudError, Result};
use crate::export::{save_model, ModelMetadata};
use crate::features::{
    Aggregator, ClaimFeatureBuilder, LabelMerger, LabeledFeatureTable, Merger, TopCodeExtractor, TopCodeSet,
};
use crate::optimizer::{HyperparameterSet, HyperparameterTuner, SearchSpace, TuningOutcome};
use crate::processing::{BeneficiaryProcessor, ClaimsProcessor};
use crate::tracking::LocalTracker;
use crate::training::{ClassificationMetrics, ModelTrainer, TrainingOutcome};
use crate::utils::{DataLoader, Timer};
use crate::validation::{TableRole, ValidationReport, Validator};

/// Stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Validate,
    Process,
    EngineerFeatures,
    Aggregate,
    MergeLabels,
    Tune,
    Train,
    Persist,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Load,
        Stage::Validate,
        Stage::Process,
        Stage::EngineerFeatures,
        Stage::Aggregate,
        Stage::MergeLabels,
        Stage::Tune,
        Stage::Train,
        Stage::Persist,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Validate => "validate",
            Stage::Process => "process",
            Stage::EngineerFeatures => "engineer_features",
            Stage::Aggregate => "aggregate",
            Stage::MergeLabels => "merge_labels",
            Stage::Tune => "tune",
            Stage::Train => "train",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timings of the stages executed so far
#[derive(Debug, Clone, Default)]
pub struct StageLog {
    timings: Vec<(Stage, f64)>,
}

impl StageLog {
    pub fn timings(&self) -> &[(Stage, f64)] {
        &self.timings
    }

    pub fn completed(&self) -> Vec<Stage> {
        self.timings.iter().map(|(s, _)| *s).collect()
    }

    /// Execute one stage, timing it and naming it in any error
    fn run<T>(&mut self, stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
        info!(stage = %stage, "Stage started");
        let timer = Timer::new(stage.name());
        let result = f();
        let secs = timer.elapsed_secs();

        match result {
            Ok(value) => {
                self.timings.push((stage, secs));
                info!(stage = %stage, elapsed_secs = secs, "Stage finished");
                Ok(value)
            }
            Err(err) => {
                error!(stage = %stage, error = %err, "Stage failed");
                Err(FraudError::StageFailed {
                    stage: stage.name().to_string(),
                    source: Box::new(err),
                })
            }
        }
    }
}

/// The four raw input tables
#[derive(Debug, Clone)]
pub struct RawTables {
    pub inpatient: DataFrame,
    pub outpatient: DataFrame,
    pub beneficiary: DataFrame,
    pub labels: DataFrame,
}

impl RawTables {
    fn with_roles(&self) -> [(&DataFrame, TableRole); 4] {
        [
            (&self.inpatient, TableRole::Inpatient),
            (&self.outpatient, TableRole::Outpatient),
            (&self.beneficiary, TableRole::Beneficiary),
            (&self.labels, TableRole::Labels),
        ]
    }
}

/// Output of the feature half of the pipeline
#[derive(Debug, Clone)]
pub struct FeatureRun {
    pub table: LabeledFeatureTable,
    pub top_codes: TopCodeSet,
    pub table_path: PathBuf,
    pub top_codes_path: PathBuf,
}

/// Output of the training half of the pipeline
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub n_providers: usize,
    pub n_fraudulent: usize,
    /// Mean CV ROC AUC of the best trial
    pub best_cv_score: f64,
    pub n_trials: usize,
    pub n_failed_trials: usize,
    pub best_params: HyperparameterSet,
    pub metrics: ClassificationMetrics,
    pub top_features: Vec<(String, f64)>,
    pub artifact: PathBuf,
    pub stages: Vec<(Stage, f64)>,
    /// Run record written by the tracker
    pub run_record: Option<PathBuf>,
}

/// Runs the pipeline described by a [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    config: PipelineConfig,
    search_space: Option<SearchSpace>,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            search_space: None,
        })
    }

    /// Tune over a custom space instead of the default booster space
    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.search_space = Some(space);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Raw tables to a fitted, persisted model
    pub fn run_all(&self) -> Result<RunSummary> {
        let mut log = StageLog::default();
        let mut tracker = LocalTracker::new(&self.config.tracking, "run_all");
        self.log_config(&mut tracker);

        let result = self
            .feature_stages(&mut log)
            .and_then(|features| self.training_stages(features.table, &mut log, &mut tracker));
        self.close_run(result, &log, tracker)
    }

    /// Raw tables to the processed training table and top-code set
    pub fn run_features(&self) -> Result<FeatureRun> {
        let mut log = StageLog::default();
        let features = self.feature_stages(&mut log)?;
        info!(
            providers = features.table.len(),
            fraudulent = features.table.positives(),
            table = %features.table_path.display(),
            "Feature table ready"
        );
        Ok(features)
    }

    /// Processed training table to a fitted, persisted model
    ///
    /// `table_path` defaults to the configured training table location.
    pub fn run_training(&self, table_path: Option<&Path>) -> Result<RunSummary> {
        let path = table_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output.training_table());
        let mut log = StageLog::default();
        let mut tracker = LocalTracker::new(&self.config.tracking, "run_training");
        self.log_config(&mut tracker);
        tracker.log_param("training_table", path.display());

        let result = log
            .run(Stage::Load, || LabeledFeatureTable::load_csv(&path))
            .and_then(|table| {
                log.run(Stage::Validate, || self.validate_feature_table(&table))?;
                self.training_stages(table, &mut log, &mut tracker)
            });
        self.close_run(result, &log, tracker)
    }

    /// Check every raw table and return all reports without raising
    pub fn validate_inputs(&self) -> Result<Vec<ValidationReport>> {
        let tables = self.load_tables()?;
        let validator = Validator::new();
        tables
            .with_roles()
            .iter()
            .map(|(df, role)| validator.validate(df, *role))
            .collect()
    }

    fn feature_stages(&self, log: &mut StageLog) -> Result<FeatureRun> {
        let tables = log.run(Stage::Load, || self.load_tables())?;
        log.run(Stage::Validate, || self.validate_tables(&tables))?;

        let (claims, beneficiaries, labels) = log.run(Stage::Process, || {
            let inpatient = ClaimRecord::from_dataframe(&tables.inpatient, ClaimSource::Inpatient)?;
            let outpatient = ClaimRecord::from_dataframe(&tables.outpatient, ClaimSource::Outpatient)?;
            let beneficiaries = BeneficiaryRecord::from_dataframe(&tables.beneficiary)?;
            let labels = ProviderLabel::from_dataframe(&tables.labels)?;
            Ok((
                ClaimsProcessor::new().process(inpatient, outpatient),
                BeneficiaryProcessor::new().process(&beneficiaries),
                labels,
            ))
        })?;
        drop(tables);

        let (featured, top_codes) = log.run(Stage::EngineerFeatures, || {
            let top_codes = TopCodeExtractor::new().extract(&claims);
            let featured = ClaimFeatureBuilder::new(&top_codes).build(claims);
            Ok((featured, top_codes))
        })?;

        let aggregates = log.run(Stage::Aggregate, || {
            let merged = Merger::new(self.config.joins.beneficiary).merge(featured, beneficiaries)?;
            Aggregator::new().aggregate(&merged)
        })?;

        let table = log.run(Stage::MergeLabels, || {
            let table = LabelMerger::new(self.config.joins.labels).merge(aggregates, &labels)?;
            self.validate_feature_table(&table)?;
            Ok(table)
        })?;

        let output = &self.config.output;
        log.run(Stage::Persist, || {
            table.save_csv(output.training_table())?;
            top_codes.save(output.top_codes())
        })?;

        Ok(FeatureRun {
            table,
            top_codes,
            table_path: output.training_table(),
            top_codes_path: output.top_codes(),
        })
    }

    fn training_stages(
        &self,
        table: LabeledFeatureTable,
        log: &mut StageLog,
        tracker: &mut LocalTracker,
    ) -> Result<RunSummary> {
        tracker.log_param("n_providers", table.len());
        tracker.log_param("n_fraudulent", table.positives());

        let tuning = log.run(Stage::Tune, || self.tuner().tune(&table))?;
        let trained = log.run(Stage::Train, || {
            ModelTrainer::new(self.config.split.clone()).train(&table, &tuning.best_params)
        })?;
        let artifact = log.run(Stage::Persist, || self.persist(&tuning, &trained))?;

        tracker.log_params(trained.params.to_map());
        tracker.log_metric("best_cv_roc_auc", tuning.best_score);
        tracker.log_metric("roc_auc", trained.metrics.roc_auc);
        tracker.log_metric("recall", trained.metrics.recall);
        tracker.log_metric("f1_score", trained.metrics.f1_score);
        tracker.log_artifact(&artifact);

        Ok(RunSummary {
            n_providers: table.len(),
            n_fraudulent: table.positives(),
            best_cv_score: tuning.best_score,
            n_trials: tuning.study.trials.len(),
            n_failed_trials: tuning.study.n_failed(),
            best_params: trained.params.clone(),
            metrics: trained.metrics,
            top_features: trained.top_features,
            artifact,
            stages: Vec::new(),
            run_record: None,
        })
    }

    fn tuner(&self) -> HyperparameterTuner {
        let tuner = HyperparameterTuner::new(self.config.tuning.clone(), self.config.split.clone());
        match &self.search_space {
            Some(space) => tuner.with_search_space(space.clone()),
            None => tuner,
        }
    }

    fn persist(&self, tuning: &TuningOutcome, trained: &TrainingOutcome) -> Result<PathBuf> {
        let output = &self.config.output;
        let metadata = ModelMetadata::default()
            .trained_now()
            .with_hyperparameters(&trained.params)
            .with_summary(&trained.summary())
            .add_extra("best_cv_roc_auc", tuning.best_score.to_string());

        let artifact = output.model_artifact();
        save_model(&trained.pipeline, metadata, &artifact)?;
        trained.params.save(output.best_params())?;
        tuning.study.save(output.study())?;
        Ok(artifact)
    }

    fn load_tables(&self) -> Result<RawTables> {
        let loader = DataLoader::new();
        let paths = &self.config.data;
        let tables = RawTables {
            inpatient: loader.load_auto(&paths.inpatient)?,
            outpatient: loader.load_auto(&paths.outpatient)?,
            beneficiary: loader.load_auto(&paths.beneficiary)?,
            labels: loader.load_auto(&paths.labels)?,
        };
        info!(
            inpatient = tables.inpatient.height(),
            outpatient = tables.outpatient.height(),
            beneficiary = tables.beneficiary.height(),
            labels = tables.labels.height(),
            "Loaded raw tables"
        );
        Ok(tables)
    }

    /// Validate every raw table; any failure is fatal
    ///
    /// All tables are checked before raising so that one error carries every
    /// failed check, each prefixed with its table name.
    fn validate_tables(&self, tables: &RawTables) -> Result<()> {
        let validator = Validator::new();
        let reports = tables
            .with_roles()
            .iter()
            .map(|(df, role)| validator.validate(df, *role))
            .collect::<Result<Vec<_>>>()?;
        combine_reports(&reports).map_or(Ok(()), Err)
    }

    fn validate_feature_table(&self, table: &LabeledFeatureTable) -> Result<()> {
        if table.is_empty() {
            return Err(FraudError::DataQualityError {
                table: TableRole::FeatureVector.name().to_string(),
                failures: vec!["Row count: 0".to_string()],
            });
        }
        Validator::new()
            .with_fail_fast(true)
            .validate(&table.to_dataframe()?, TableRole::FeatureVector)?;
        Ok(())
    }

    fn log_config(&self, tracker: &mut LocalTracker) {
        tracker.log_param("n_trials", self.config.tuning.n_trials);
        tracker.log_param("cv_folds", self.config.tuning.cv_folds);
        tracker.log_param("test_size", self.config.split.test_size);
        tracker.log_param("random_state", self.config.split.random_state);
    }

    fn close_run(&self, result: Result<RunSummary>, log: &StageLog, mut tracker: LocalTracker) -> Result<RunSummary> {
        for (stage, secs) in log.timings() {
            tracker.log_stage(stage.name(), *secs);
        }
        let outcome = result.as_ref().map(|_| ()).map_err(|e| e.to_string());
        let run_record = match tracker.finish(outcome) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Failed to write run record");
                None
            }
        };

        let mut summary = result?;
        summary.stages = log.timings().to_vec();
        summary.run_record = run_record;
        info!(
            roc_auc = summary.metrics.roc_auc,
            recall = summary.metrics.recall,
            f1 = summary.metrics.f1_score,
            artifact = %summary.artifact.display(),
            "Run complete"
        );
        Ok(summary)
    }
}

/// One error for all failing reports, schema failures taking precedence
fn combine_reports(reports: &[ValidationReport]) -> Option<FraudError> {
    let failing: Vec<&ValidationReport> = reports.iter().filter(|r| !r.success).collect();
    if failing.is_empty() {
        return None;
    }

    let table = failing
        .iter()
        .map(|r| r.dataset.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let failures = failing
        .iter()
        .flat_map(|r| r.failure_messages().into_iter().map(move |m| format!("{}: {}", r.dataset, m)))
        .collect();
    Some(if failing.iter().any(|r| r.has_schema_failure()) {
        FraudError::SchemaError { table, failures }
    } else {
        FraudError::DataQualityError { table, failures }
    })
}
