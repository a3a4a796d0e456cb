//! tracedist evaluation harness
//!
//! Answers one question: can a binary classifier tell two collections of
//! traffic traces apart? The harness merges two trace archives, runs K-fold
//! cross-validation (stratified splitting, per-fold training with early
//! stopping, confusion-matrix evaluation), and reports mean ± std of
//! accuracy and false-positive rate across folds, next to the majority-class
//! baseline.
//!
//! # Modules
//!
//! - [`config`] — the immutable run configuration
//! - [`datasets`] — trace archive loading and merging
//! - [`split`] — closed-world and open-world stratified splitting
//! - [`training`] — batch iteration and the training loop
//! - [`eval`] — held-out scoring into confusion counts
//! - [`metrics`] — confusion matrix, derived rates, fold aggregation
//! - [`controller`] — the K-fold orchestrator

pub mod config;
pub mod controller;
pub mod datasets;
pub mod eval;
pub mod metrics;
pub mod split;
pub mod training;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::RunConfig;
    pub use crate::controller::{run, CrossValidationReport, FoldReport};
    pub use crate::datasets::{load_store, save_archive, ArchiveSample};
    pub use crate::eval::evaluate;
    pub use crate::metrics::{aggregate, AggregateReport, ConfusionMatrix, FoldOutcome};
    pub use crate::split::{split, Split};
    pub use crate::training::data::BatchIterator;
    pub use crate::training::trainer::{train, TrainSummary};
}
