//! Confusion counts and derived rates.
//!
//! Class 1 (the second archive) is the positive class. All rates are pure
//! functions of the four counts and can be recomputed from them alone.

/// Confusion matrix for the binary label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Label-1 samples predicted 1.
    pub tp: usize,
    /// Label-0 samples predicted 0.
    pub tn: usize,
    /// Label-0 samples predicted 1.
    pub fp: usize,
    /// Label-1 samples predicted 0.
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction. Returns `false` without counting when either
    /// value falls outside the binary label domain; the caller decides how
    /// to report the anomaly.
    pub fn record(&mut self, predicted: u32, actual: u32) -> bool {
        match (predicted, actual) {
            (1, 1) => self.tp += 1,
            (0, 0) => self.tn += 1,
            (1, 0) => self.fp += 1,
            (0, 1) => self.fn_ += 1,
            _ => return false,
        }
        true
    }

    /// Number of evaluated samples: tp + tn + fp + fn.
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// (tp + tn) / total; 0.0 when nothing was evaluated.
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// fp / (fp + tn); 0.0 when no negatives were evaluated.
    pub fn fpr(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }

    /// tp / (tp + fn); 0.0 when no positives were evaluated.
    pub fn tpr(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// fn / (fn + tp); 0.0 when no positives were evaluated.
    pub fn fnr(&self) -> f64 {
        ratio(self.fn_, self.fn_ + self.tp)
    }

    /// tn / (tn + fp); 0.0 when no negatives were evaluated.
    pub fn tnr(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }
}

/// Zero-denominator policy for every derived rate: report 0.0.
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fpr {:.4}, tpr {:.4}, fnr {:.4}, tnr {:.4} (tp={} tn={} fp={} fn={})",
            self.fpr(),
            self.tpr(),
            self.fnr(),
            self.tnr(),
            self.tp,
            self.tn,
            self.fp,
            self.fn_,
        )
    }
}

/// The two scalars recorded per fold.
#[derive(Debug, Clone, Copy)]
pub struct FoldOutcome {
    pub accuracy: f64,
    pub fpr: f64,
}

/// Mean and standard deviation of accuracy and fpr across folds.
#[derive(Debug, Clone, Copy)]
pub struct AggregateReport {
    pub folds: usize,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub fpr_mean: f64,
    pub fpr_std: f64,
}

/// Aggregate fold outcomes. Standard deviation is the population form.
pub fn aggregate(outcomes: &[FoldOutcome]) -> AggregateReport {
    let (accuracy_mean, accuracy_std) = mean_std(outcomes.iter().map(|o| o.accuracy));
    let (fpr_mean, fpr_std) = mean_std(outcomes.iter().map(|o| o.fpr));
    AggregateReport {
        folds: outcomes.len(),
        accuracy_mean,
        accuracy_std,
        fpr_mean,
        fpr_std,
    }
}

fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
