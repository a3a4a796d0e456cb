//! Mini-batch iteration over store indices.

use candle_core::{Device, Tensor};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracedist_core::SampleStore;

/// Fixed-size mini-batch iterator over a subset of a [`SampleStore`].
///
/// Batches are `([batch, 1, trace_len]` f32, `[batch]` u32) tensor pairs on
/// the target device. The trailing partial batch is always dropped, for
/// training and evaluation alike: up to `batch_size - 1` trailing samples
/// are silently excluded, reproducibly for a given batch size and index
/// count.
pub struct BatchIterator<'a> {
    store: &'a SampleStore,
    device: Device,
    indices: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl<'a> BatchIterator<'a> {
    /// Iterate `indices` in their current order. Call
    /// [`BatchIterator::reshuffle`] before each training epoch; evaluation
    /// consumes the indices as given.
    pub fn new(
        store: &'a SampleStore,
        indices: Vec<usize>,
        batch_size: usize,
        device: &Device,
    ) -> Self {
        Self {
            store,
            device: device.clone(),
            indices,
            batch_size,
            pos: 0,
        }
    }

    /// Reshuffle for a new epoch using a seeded RNG derived from base seed
    /// + epoch, and rewind.
    pub fn reshuffle(&mut self, seed: u64, epoch: usize) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64));
        self.indices.shuffle(&mut rng);
        self.pos = 0;
    }

    /// Number of full batches one pass yields.
    pub fn num_batches(&self) -> usize {
        self.indices.len() / self.batch_size
    }

    /// Returns the next full mini-batch, or `None` once fewer than
    /// `batch_size` indices remain.
    pub fn next_batch(&mut self) -> Option<(Tensor, Tensor)> {
        if self.pos + self.batch_size > self.indices.len() {
            return None;
        }

        let batch = &self.indices[self.pos..self.pos + self.batch_size];
        self.pos += self.batch_size;

        let trace_len = self.store.trace_len();
        let mut traces: Vec<f32> = Vec::with_capacity(self.batch_size * trace_len);
        let mut labels: Vec<u32> = Vec::with_capacity(self.batch_size);
        for &i in batch {
            traces.extend_from_slice(self.store.trace_of(i));
            labels.push(self.store.label_of(i));
        }

        let inputs =
            Tensor::from_vec(traces, (self.batch_size, 1, trace_len), &self.device).ok()?;
        let labels = Tensor::from_vec(labels, self.batch_size, &self.device).ok()?;
        Some((inputs, labels))
    }
}
