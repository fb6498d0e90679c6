//! Integration test: raw tables -> features -> tuning -> model -> serving

mod common;

use common::{small_space, test_config, write_dataset};
use provider_fraud::config::{ModelLocator, PipelineConfig};
use provider_fraud::error::FraudError;
use provider_fraud::features::LabeledFeatureTable;
use provider_fraud::inference::FraudModel;
use provider_fraud::optimizer::{HyperparameterSet, Study};
use provider_fraud::runner::{PipelineRunner, Stage};
use provider_fraud::tracking::{LocalTracker, RunStatus};

#[test]
fn test_run_all() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 40);
    let config = test_config(dir.path(), data).with_tracking(true);

    let summary = PipelineRunner::new(config.clone())
        .unwrap()
        .with_search_space(small_space())
        .run_all()
        .unwrap();

    assert_eq!(summary.n_providers, 40);
    assert_eq!(summary.n_fraudulent, 10);
    assert_eq!(summary.n_trials, 3);
    assert_eq!(summary.n_failed_trials, 0);
    for v in [
        summary.best_cv_score,
        summary.metrics.roc_auc,
        summary.metrics.recall,
        summary.metrics.f1_score,
    ] {
        assert!((0.0..=1.0).contains(&v));
    }

    let stages: Vec<Stage> = summary.stages.iter().map(|(s, _)| *s).collect();
    assert_eq!(stages.first(), Some(&Stage::Load));
    assert!(stages.contains(&Stage::Tune));
    assert!(stages.contains(&Stage::Train));
    assert_eq!(stages.last(), Some(&Stage::Persist));

    let output = &config.output;
    assert_eq!(summary.artifact, output.model_artifact());
    assert!(output.training_table().exists());
    assert!(output.top_codes().exists());
    assert_eq!(HyperparameterSet::load(output.best_params()).unwrap(), summary.best_params);
    assert_eq!(Study::load(output.study()).unwrap().trials.len(), 3);

    let record = summary.run_record.clone().unwrap();
    assert!(record.exists());
    let runs = LocalTracker::list_runs(&config.tracking).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Finished);
    assert_eq!(runs[0].metrics["roc_auc"], summary.metrics.roc_auc);
    assert!(runs[0].stage_secs.contains_key("tune"));

    let model = FraudModel::load(&ModelLocator::single(&summary.artifact)).unwrap();
    let table = LabeledFeatureTable::load_csv(output.training_table()).unwrap();
    for features in table.features.iter().take(5) {
        assert!(model.predict(&features.to_map()).unwrap() <= 1);
    }
}

#[test]
fn test_training_from_saved_table() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 24);
    let config = test_config(dir.path(), data).with_n_trials(2);
    let runner = PipelineRunner::new(config.clone()).unwrap().with_search_space(small_space());

    let features = runner.run_features().unwrap();
    let summary = runner.run_training(None).unwrap();
    assert_eq!(summary.n_providers, features.table.len());
    assert_eq!(summary.n_trials, 2);
    assert!(config.output.model_artifact().exists());
    assert!(summary.run_record.is_none());

    let moved = dir.path().join("table_copy.csv");
    std::fs::copy(&features.table_path, &moved).unwrap();
    let summary = runner.run_training(Some(&moved)).unwrap();
    assert_eq!(summary.n_providers, features.table.len());
}

#[test]
fn test_failed_run_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 8);
    std::fs::remove_file(&data.outpatient).unwrap();
    let config = test_config(dir.path(), data).with_tracking(true);

    let err = PipelineRunner::new(config.clone())
        .unwrap()
        .with_search_space(small_space())
        .run_all()
        .unwrap_err();
    assert!(matches!(err, FraudError::StageFailed { ref stage, .. } if stage == "load"));

    let runs = LocalTracker::list_runs(&config.tracking).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error.as_deref().unwrap_or("").contains("load"));
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_dataset(dir.path(), 4);
    let config = test_config(dir.path(), data);
    let path = dir.path().join("config.json");
    config.save(&path).unwrap();

    let loaded = PipelineConfig::load(&path).unwrap();
    assert_eq!(loaded.tuning.n_trials, 3);
    assert_eq!(loaded.data.labels, config.data.labels);
    assert!(PipelineRunner::new(loaded).is_ok());
}
