//! Cross-validation controller.
//!
//! Runs K strictly sequential folds, each with a fresh split and a freshly
//! initialised classifier, then aggregates accuracy and false-positive rate
//! across folds.

use crate::config::RunConfig;
use crate::eval::evaluate;
use crate::metrics::{aggregate, AggregateReport, ConfusionMatrix, FoldOutcome};
use crate::split::{split, Split};
use crate::training::trainer::{train, TrainSummary};
use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracedist_core::{Result, SampleStore, TracedistError};
use tracedist_model::{select_device, TraceClassifier, NUM_CLASSES};

/// Everything recorded for one fold.
#[derive(Debug, Clone)]
pub struct FoldReport {
    pub fold: usize,
    pub train_size: usize,
    pub validation_size: usize,
    pub test_size: usize,
    pub matrix: ConfusionMatrix,
    pub training: TrainSummary,
}

/// Result of a full cross-validation run.
#[derive(Debug, Clone)]
pub struct CrossValidationReport {
    pub baseline_accuracy: f64,
    pub folds: Vec<FoldReport>,
    pub aggregate: AggregateReport,
}

/// Run K-fold cross-validation over the store.
///
/// The store is shared read-only across folds; each fold owns a fresh
/// split and a fresh model, and nothing survives a fold except the
/// recorded (accuracy, fpr) pair.
pub fn run(store: &SampleStore, config: &RunConfig) -> Result<CrossValidationReport> {
    config.validate()?;
    if store.is_empty() {
        return Err(TracedistError::Dataset("no samples to evaluate".into()));
    }
    if store.trace_len() != config.trace_len {
        return Err(TracedistError::Config(format!(
            "store trace length {} does not match configured length {}",
            store.trace_len(),
            config.trace_len
        )));
    }

    let device = select_device();

    let baseline_accuracy = store.baseline_accuracy();
    let counts = store.class_counts();
    println!(
        "{} samples ({}), baseline accuracy {:.4}",
        store.len(),
        counts
            .iter()
            .map(|(label, n)| format!("{n} with label {label}"))
            .collect::<Vec<_>>()
            .join(", "),
        baseline_accuracy,
    );
    println!("classifier over {} cells", config.trace_len);
    if config.is_open_world() {
        println!(
            "open world mode: splitting by tag, training probability {}",
            config.open_world,
        );
    }
    println!(
        "training with {} epochs, batch size {}, patience {}, seed {}",
        config.max_epochs, config.batch_size, config.patience, config.seed,
    );
    println!("{}-fold cross validation with a 8:1:1 split", config.folds);

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut folds: Vec<FoldReport> = Vec::with_capacity(config.folds);
    let mut outcomes: Vec<FoldOutcome> = Vec::with_capacity(config.folds);

    for fold in 0..config.folds {
        println!("running fold {fold}...");
        let Split {
            train: train_set,
            validation,
            test,
        } = split(store, config.open_world, &mut rng);
        println!(
            "  train {}, valid {}, test {}",
            train_set.len(),
            validation.len(),
            test.len(),
        );

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = TraceClassifier::new(NUM_CLASSES, config.trace_len, vb)?;

        // Distinct reshuffle seeds per (fold, epoch); a single fold is
        // replayable from (seed, fold) alone.
        let shuffle_seed = config
            .seed
            .wrapping_add((fold * config.max_epochs) as u64);
        let training = train(&model, &varmap, store, &train_set, config, &device, shuffle_seed)?;

        let matrix = evaluate(&model, store, &test, config.batch_size, &device)?;
        println!("fold {fold}: {matrix}");

        outcomes.push(FoldOutcome {
            accuracy: matrix.accuracy(),
            fpr: matrix.fpr(),
        });
        folds.push(FoldReport {
            fold,
            train_size: train_set.len(),
            validation_size: validation.len(),
            test_size: test.len(),
            matrix,
            training,
        });
    }

    let aggregate = aggregate(&outcomes);
    println!("done, {}-fold cross validation results", aggregate.folds);
    println!(
        "accuracy mean: {:.4}, std: {:.4}",
        aggregate.accuracy_mean, aggregate.accuracy_std,
    );
    println!("fpr mean: {:.4}, std: {:.4}", aggregate.fpr_mean, aggregate.fpr_std);

    Ok(CrossValidationReport {
        baseline_accuracy,
        folds,
        aggregate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE_LEN: usize = 512;

    fn tiny_store() -> SampleStore {
        let mut store = SampleStore::new(TRACE_LEN);
        for i in 0..20 {
            let label = (i % 2) as u32;
            // Give the two classes visibly different signals.
            let fill = if label == 0 { -1.0 } else { 1.0 };
            store
                .push(
                    format!("s{i}"),
                    format!("tag{}", i / 4),
                    label,
                    vec![fill; TRACE_LEN],
                )
                .unwrap();
        }
        store
    }

    fn tiny_config() -> RunConfig {
        RunConfig {
            trace_len: TRACE_LEN,
            batch_size: 4,
            max_epochs: 2,
            folds: 1,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_single_fold_smoke_run() {
        let store = tiny_store();
        let config = tiny_config();
        let report = run(&store, &config).unwrap();

        assert_eq!(report.folds.len(), 1);
        let fold = &report.folds[0];
        // 10 per label: 8 train / 1 valid / 1 test each.
        assert_eq!(fold.train_size, 16);
        assert_eq!(fold.validation_size, 2);
        assert_eq!(fold.test_size, 2);
        assert!(fold.training.epochs_run <= config.max_epochs);
        // test size 2 < batch 4: the whole test set sits in a dropped
        // partial batch.
        assert_eq!(fold.matrix.total(), 0);
        assert!((report.baseline_accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fold_counts_respect_batch_truncation() {
        let store = tiny_store();
        let config = RunConfig {
            batch_size: 2,
            ..tiny_config()
        };
        let report = run(&store, &config).unwrap();
        let fold = &report.folds[0];
        assert_eq!(fold.test_size, 2);
        assert_eq!(fold.matrix.total(), 2);
        assert!(report.aggregate.accuracy_mean >= 0.0 && report.aggregate.accuracy_mean <= 1.0);
    }

    #[test]
    fn test_rejects_empty_store() {
        let store = SampleStore::new(TRACE_LEN);
        let err = run(&store, &tiny_config()).unwrap_err();
        assert!(err.to_string().contains("no samples"));
    }

    #[test]
    fn test_rejects_mismatched_trace_length() {
        let store = tiny_store();
        let config = RunConfig {
            trace_len: 5000,
            ..tiny_config()
        };
        let err = run(&store, &config).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
