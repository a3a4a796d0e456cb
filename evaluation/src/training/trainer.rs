//! Per-fold training loop with early stopping.

use crate::config::RunConfig;
use crate::training::data::BatchIterator;
use candle_core::Device;
use candle_nn::{Optimizer, VarMap};
use tracedist_core::{Result, SampleStore, TracedistError};
use tracedist_model::TraceClassifier;

/// What a training run did.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    /// Epochs actually executed (≤ the epoch cap).
    pub epochs_run: usize,
    /// Lowest epoch total loss observed.
    pub best_loss: f64,
    /// Whether patience ran out before the epoch cap.
    pub stopped_early: bool,
}

/// Patience-based stopping rule over epoch losses.
///
/// A strictly lower loss than the best seen records a new best and resets
/// the counter; anything else decrements it. Stopping is a loop-exit
/// decision only; the epoch's parameter updates stay applied.
#[derive(Debug)]
struct EarlyStopping {
    patience: usize,
    remaining: usize,
    best: f64,
}

impl EarlyStopping {
    fn new(patience: usize) -> Self {
        Self {
            patience,
            remaining: patience,
            best: f64::INFINITY,
        }
    }

    /// Feed one epoch's total loss; returns `true` when training must stop.
    fn observe(&mut self, loss: f64) -> bool {
        if loss < self.best {
            self.best = loss;
            self.remaining = self.patience;
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }
}

/// Train `model` on `train_indices`, mutating the parameters owned by
/// `varmap`. No best-weights checkpoint is restored: the model keeps
/// whatever parameters exist when the loop stops.
///
/// `shuffle_seed` is the base seed for per-epoch batch reshuffles; the
/// controller derives it from the run seed and fold number so any fold is
/// replayable in isolation.
pub fn train(
    model: &TraceClassifier,
    varmap: &VarMap,
    store: &SampleStore,
    train_indices: &[usize],
    config: &RunConfig,
    device: &Device,
    shuffle_seed: u64,
) -> Result<TrainSummary> {
    let mut optimizer = candle_nn::AdamW::new(
        varmap.all_vars(),
        candle_nn::ParamsAdamW {
            lr: config.lr,
            weight_decay: config.weight_decay,
            ..Default::default()
        },
    )
    .map_err(|e| TracedistError::Model(format!("Failed to create optimizer: {e}")))?;

    let mut batches = BatchIterator::new(store, train_indices.to_vec(), config.batch_size, device);
    let mut stopping = EarlyStopping::new(config.patience);
    let mut epochs_run = 0;
    let mut stopped_early = false;

    for epoch in 0..config.max_epochs {
        batches.reshuffle(shuffle_seed, epoch);

        let mut epoch_loss = 0.0;
        let mut batch_count = 0;
        while let Some((inputs, labels)) = batches.next_batch() {
            let logits = model.forward_t(&inputs, true)?;
            let loss = candle_nn::loss::cross_entropy(&logits, &labels)
                .map_err(|e| TracedistError::Model(format!("Loss computation failed: {e}")))?;
            optimizer
                .backward_step(&loss)
                .map_err(|e| TracedistError::Model(format!("Backward step failed: {e}")))?;
            epoch_loss += loss
                .to_scalar::<f32>()
                .map_err(|e| TracedistError::Model(format!("Loss scalar failed: {e}")))?
                as f64;
            batch_count += 1;
        }

        epochs_run = epoch + 1;
        let improved = epoch_loss < stopping.best;
        let marker = if improved { " *" } else { "" };
        println!(
            "  epoch {:3} | {} batches | loss={:.4}{}",
            epochs_run, batch_count, epoch_loss, marker,
        );

        if stopping.observe(epoch_loss) {
            println!("  early stopping, patience {} reached", config.patience);
            stopped_early = true;
            break;
        }
    }

    Ok(TrainSummary {
        epochs_run,
        best_loss: stopping.best,
        stopped_early,
    })
}
