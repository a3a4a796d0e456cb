//! Run configuration.
//!
//! One immutable [`RunConfig`] value is constructed by the caller and passed
//! by reference into the controller, training loop, and evaluator.

use tracedist_core::{Result, TracedistError};

/// Configuration for a cross-validation run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Fixed trace length L; archives are padded/truncated to this.
    pub trace_len: usize,
    /// Open-world train-split probability. 0.0 disables open-world mode
    /// and splits closed-world, stratified by label.
    pub open_world: f64,
    /// Mini-batch size; the trailing partial batch is dropped.
    pub batch_size: usize,
    /// Epoch cap per fold.
    pub max_epochs: usize,
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Consecutive non-improving epochs tolerated before stopping.
    pub patience: usize,
    /// Optimizer learning rate.
    pub lr: f64,
    /// Optimizer weight decay.
    pub weight_decay: f64,
    /// Seed for all run randomness (splits and batch shuffles).
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trace_len: 5000,
            open_world: 0.0,
            batch_size: 128,
            max_epochs: 200,
            folds: 10,
            patience: 10,
            lr: 1e-3,
            weight_decay: 1e-4,
            seed: 42,
        }
    }
}

impl RunConfig {
    /// Validate the configuration before any processing starts.
    pub fn validate(&self) -> Result<()> {
        if !self.open_world.is_finite() || !(0.0..=1.0).contains(&self.open_world) {
            return Err(TracedistError::Config(format!(
                "invalid train split probability {}",
                self.open_world
            )));
        }
        if self.batch_size == 0 {
            return Err(TracedistError::Config("batch size must be at least 1".into()));
        }
        if self.max_epochs == 0 {
            return Err(TracedistError::Config("epoch cap must be at least 1".into()));
        }
        if self.folds == 0 {
            return Err(TracedistError::Config("fold count must be at least 1".into()));
        }
        if self.patience == 0 {
            return Err(TracedistError::Config("patience must be at least 1".into()));
        }
        if tracedist_model::feature_len(self.trace_len).is_none() {
            return Err(TracedistError::Config(format!(
                "trace length {} is too short for the classifier",
                self.trace_len
            )));
        }
        Ok(())
    }

    /// Whether tag-level open-world splitting is active.
    pub fn is_open_world(&self) -> bool {
        self.open_world > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.trace_len, 5000);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.max_epochs, 200);
        assert_eq!(cfg.folds, 10);
        assert_eq!(cfg.patience, 10);
        assert_eq!(cfg.seed, 42);
        assert!(!cfg.is_open_world());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_probability_above_one() {
        let cfg = RunConfig {
            open_world: 1.5,
            ..RunConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("train split probability"));
    }

    #[test]
    fn test_rejects_negative_and_non_finite_probability() {
        for p in [-0.1, f64::NAN, f64::INFINITY] {
            let cfg = RunConfig {
                open_world: p,
                ..RunConfig::default()
            };
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn test_rejects_degenerate_values() {
        for cfg in [
            RunConfig { batch_size: 0, ..RunConfig::default() },
            RunConfig { max_epochs: 0, ..RunConfig::default() },
            RunConfig { folds: 0, ..RunConfig::default() },
            RunConfig { patience: 0, ..RunConfig::default() },
            RunConfig { trace_len: 64, ..RunConfig::default() },
        ] {
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn test_boundary_probabilities_accepted() {
        for p in [0.0, 0.5, 1.0] {
            let cfg = RunConfig { open_world: p, ..RunConfig::default() };
            assert!(cfg.validate().is_ok());
        }
        assert!(RunConfig { open_world: 1.0, ..RunConfig::default() }.is_open_world());
    }
}
