//! Stratified train/validation/test splitting.
//!
//! Two policies:
//!
//! - **Closed world** — stratified by label: each label's indices are
//!   shuffled independently and cut at 80%/90%, so every label is
//!   proportionally represented in all three sets (up to integer slicing).
//! - **Open world** — stratified by tag: one Bernoulli draw per tag sends
//!   every sample sharing that tag entirely to train or entirely to test,
//!   so no tag can leak across the boundary. Validation stays empty.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracedist_core::SampleStore;

const TRAIN_CUT: f64 = 0.8;
const VALIDATION_CUT: f64 = 0.9;

/// Disjoint index sets over a [`SampleStore`].
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl Split {
    /// Total number of indices across all three sets.
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }
}

/// Produce a fresh split under the configured policy.
///
/// `open_world > 0.0` selects tag-level open-world splitting with that
/// train probability; 0.0 falls back to closed world. The probability is
/// assumed already validated to lie in [0, 1].
pub fn split(store: &SampleStore, open_world: f64, rng: &mut ChaCha8Rng) -> Split {
    if open_world > 0.0 {
        open_world_split(store, open_world, rng)
    } else {
        closed_world_split(store, rng)
    }
}

/// 80/10/10 split stratified by label.
fn closed_world_split(store: &SampleStore, rng: &mut ChaCha8Rng) -> Split {
    let mut train = Vec::new();
    let mut validation = Vec::new();
    let mut test = Vec::new();

    for (_, mut indices) in store.indices_by_label() {
        indices.shuffle(rng);
        let n = indices.len();
        let train_end = (n as f64 * TRAIN_CUT) as usize;
        let validation_end = (n as f64 * VALIDATION_CUT) as usize;
        train.extend_from_slice(&indices[..train_end]);
        validation.extend_from_slice(&indices[train_end..validation_end]);
        test.extend_from_slice(&indices[validation_end..]);
    }

    Split {
        train,
        validation,
        test,
    }
}

/// Tag-level split: each tag goes wholly to train with probability `p`,
/// otherwise wholly to test.
fn open_world_split(store: &SampleStore, p: f64, rng: &mut ChaCha8Rng) -> Split {
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (_, indices) in store.indices_by_tag() {
        if rng.gen::<f64>() < p {
            train.extend_from_slice(&indices);
        } else {
            test.extend_from_slice(&indices);
        }
    }

    Split {
        train,
        validation: Vec::new(),
        test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn store_with_labels(label0: usize, label1: usize) -> SampleStore {
        let mut store = SampleStore::new(4);
        for i in 0..label0 {
            store
                .push(format!("a-{i}"), format!("site{}", i % 10), 0, vec![0.0; 4])
                .unwrap();
        }
        for i in 0..label1 {
            store
                .push(format!("b-{i}"), format!("onion{}", i % 5), 1, vec![0.0; 4])
                .unwrap();
        }
        store
    }

    fn assert_disjoint(split: &Split) {
        let train: HashSet<_> = split.train.iter().collect();
        let validation: HashSet<_> = split.validation.iter().collect();
        let test: HashSet<_> = split.test.iter().collect();
        assert!(train.is_disjoint(&validation));
        assert!(train.is_disjoint(&test));
        assert!(validation.is_disjoint(&test));
    }

    #[test]
    fn test_closed_world_sizes_and_ratios() {
        // 100 label-0 + 50 label-1 must split 120/15/15 with ~2:1 ratios.
        let store = store_with_labels(100, 50);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let split = split(&store, 0.0, &mut rng);

        assert_eq!(split.train.len(), 120);
        assert_eq!(split.validation.len(), 15);
        assert_eq!(split.test.len(), 15);
        assert_eq!(split.total(), store.len());
        assert_disjoint(&split);

        for set in [&split.train, &split.validation, &split.test] {
            let zeros = set.iter().filter(|&&i| store.label_of(i) == 0).count();
            let ones = set.len() - zeros;
            assert_eq!(zeros, 2 * ones);
        }
    }

    #[test]
    fn test_closed_world_union_is_full_set() {
        let store = store_with_labels(23, 17);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let split = split(&store, 0.0, &mut rng);

        let mut all: Vec<usize> = split
            .train
            .iter()
            .chain(&split.validation)
            .chain(&split.test)
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..store.len()).collect::<Vec<_>>());
        assert_disjoint(&split);
    }

    #[test]
    fn test_closed_world_per_label_proportions() {
        let store = store_with_labels(41, 13);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let split = split(&store, 0.0, &mut rng);

        for (label, total) in [(0u32, 41usize), (1, 13)] {
            let in_train = split.train.iter().filter(|&&i| store.label_of(i) == label).count();
            let in_valid = split
                .validation
                .iter()
                .filter(|&&i| store.label_of(i) == label)
                .count();
            let in_test = split.test.iter().filter(|&&i| store.label_of(i) == label).count();
            assert_eq!(in_train + in_valid + in_test, total);
            assert!((in_train as f64 - total as f64 * 0.8).abs() <= 1.0);
            assert!((in_valid as f64 - total as f64 * 0.1).abs() <= 1.0);
            assert!((in_test as f64 - total as f64 * 0.1).abs() <= 1.0);
        }
    }

    #[test]
    fn test_open_world_no_tag_on_both_sides() {
        let store = store_with_labels(60, 40);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let split = split(&store, 0.5, &mut rng);

        assert!(split.validation.is_empty());
        assert_eq!(split.total(), store.len());
        assert_disjoint(&split);

        let train_tags: HashSet<&str> = split.train.iter().map(|&i| store.tag_of(i)).collect();
        let test_tags: HashSet<&str> = split.test.iter().map(|&i| store.tag_of(i)).collect();
        assert!(train_tags.is_disjoint(&test_tags));
    }

    #[test]
    fn test_open_world_probability_one_trains_everything() {
        let store = store_with_labels(30, 20);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let split = split(&store, 1.0, &mut rng);

        assert_eq!(split.train.len(), store.len());
        assert!(split.validation.is_empty());
        assert!(split.test.is_empty());
    }

    #[test]
    fn test_probability_zero_falls_back_to_closed_world() {
        let store = store_with_labels(20, 10);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let split = split(&store, 0.0, &mut rng);
        // Closed world produces a non-empty validation slice.
        assert_eq!(split.validation.len(), 3);
    }

    #[test]
    fn test_same_seed_same_split() {
        let store = store_with_labels(50, 50);
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let s1 = split(&store, 0.0, &mut rng1);
        let s2 = split(&store, 0.0, &mut rng2);
        assert_eq!(s1.train, s2.train);
        assert_eq!(s1.validation, s2.validation);
        assert_eq!(s1.test, s2.test);
    }
}
