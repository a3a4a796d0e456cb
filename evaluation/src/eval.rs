//! Scoring a trained model on held-out samples.

use crate::metrics::ConfusionMatrix;
use crate::training::data::BatchIterator;
use candle_core::{Device, D};
use tracedist_core::{Result, SampleStore, TracedistError};
use tracedist_model::TraceClassifier;

/// Evaluate `model` on the `test` indices and return the confusion counts.
///
/// Inference runs in full batches; the trailing partial batch is dropped,
/// so up to `batch_size - 1` held-out samples are excluded from the counts
/// (documented contract, reproducible from batch size and test-set size).
/// Predictions are softmax-argmax over the class scores. A (prediction,
/// label) pair outside the binary domain is logged and excluded, never
/// fatal.
pub fn evaluate(
    model: &TraceClassifier,
    store: &SampleStore,
    test: &[usize],
    batch_size: usize,
    device: &Device,
) -> Result<ConfusionMatrix> {
    let mut matrix = ConfusionMatrix::new();
    let mut batches = BatchIterator::new(store, test.to_vec(), batch_size, device);

    while let Some((inputs, labels)) = batches.next_batch() {
        let probabilities = model.probabilities(&inputs)?;
        let predictions = probabilities
            .argmax(D::Minus1)
            .map_err(|e| TracedistError::Model(format!("Argmax failed: {e}")))?;
        let predictions: Vec<u32> = predictions
            .to_vec1()
            .map_err(|e| TracedistError::Model(format!("Predictions to vec failed: {e}")))?;
        let labels: Vec<u32> = labels
            .to_vec1()
            .map_err(|e| TracedistError::Model(format!("Labels to vec failed: {e}")))?;

        for (&predicted, &actual) in predictions.iter().zip(labels.iter()) {
            if !matrix.record(predicted, actual) {
                tracing::warn!("unexpected prediction {predicted} for label {actual}");
            }
        }
    }

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::{VarBuilder, VarMap};
    use tracedist_model::NUM_CLASSES;

    const TRACE_LEN: usize = 512;

    fn store_of(n: usize) -> SampleStore {
        let mut store = SampleStore::new(TRACE_LEN);
        for i in 0..n {
            store
                .push(
                    format!("s{i}"),
                    "t".to_string(),
                    (i % 2) as u32,
                    vec![0.5; TRACE_LEN],
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_counts_match_evaluated_sample_count() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = TraceClassifier::new(NUM_CLASSES, TRACE_LEN, vb).unwrap();

        // 10 held-out samples, batch 4: one trailing pair is dropped.
        let store = store_of(10);
        let matrix = evaluate(&model, &store, &(0..10).collect::<Vec<_>>(), 4, &device).unwrap();
        assert_eq!(matrix.total(), 8);
    }

    #[test]
    fn test_empty_test_set_yields_empty_matrix() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = TraceClassifier::new(NUM_CLASSES, TRACE_LEN, vb).unwrap();

        let store = store_of(4);
        let matrix = evaluate(&model, &store, &[], 4, &device).unwrap();
        assert_eq!(matrix.total(), 0);
        assert_eq!(matrix.accuracy(), 0.0);
    }
}
