//! Core types and errors for tracedist
//!
//! This crate contains the foundational types shared across the tracedist
//! workspace: the immutable [`SampleStore`] holding merged trace collections,
//! and the [`TracedistError`] / [`Result`] error types.

use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum TracedistError {
    /// Dataset loading or invariant error.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model construction, training, or inference error.
    #[error("Model error: {0}")]
    Model(String),
}

/// Convenience alias for `std::result::Result<T, TracedistError>`.
pub type Result<T> = std::result::Result<T, TracedistError>;

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// A borrowed view of one sample in a [`SampleStore`].
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    /// Opaque unique identifier.
    pub id: &'a str,
    /// Fixed-length directional trace.
    pub trace: &'a [f32],
    /// Source-archive label (0 or 1).
    pub label: u32,
    /// Grouping key, coarser than the identifier (e.g. originating site).
    pub tag: &'a str,
}

/// Immutable store of traffic trace samples.
///
/// Backed by parallel arrays with a single flat trace matrix for cache
/// locality. Built once by the archive loader, then shared read-only across
/// all cross-validation folds.
#[derive(Debug, Clone)]
pub struct SampleStore {
    ids: Vec<String>,
    tags: Vec<String>,
    labels: Vec<u32>,
    /// Row-major `[len x trace_len]` trace matrix.
    traces: Vec<f32>,
    trace_len: usize,
    by_id: HashMap<String, usize>,
}

impl SampleStore {
    /// Create an empty store for traces of the given fixed length.
    pub fn new(trace_len: usize) -> Self {
        Self {
            ids: Vec::new(),
            tags: Vec::new(),
            labels: Vec::new(),
            traces: Vec::new(),
            trace_len,
            by_id: HashMap::new(),
        }
    }

    /// Append a sample. The trace must already be padded/truncated to
    /// `trace_len`; identifiers must be unique across all merged archives.
    pub fn push(&mut self, id: String, tag: String, label: u32, trace: Vec<f32>) -> Result<()> {
        if trace.len() != self.trace_len {
            return Err(TracedistError::Dataset(format!(
                "trace for {} has length {}, expected {}",
                id,
                trace.len(),
                self.trace_len
            )));
        }
        if self.by_id.contains_key(&id) {
            return Err(TracedistError::Dataset(format!(
                "duplicate identifier {id} across archives"
            )));
        }
        self.by_id.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        self.tags.push(tag);
        self.labels.push(label);
        self.traces.extend_from_slice(&trace);
        Ok(())
    }

    /// Number of samples in the store.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the store holds no samples.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Fixed trace length every sample was padded/truncated to.
    pub fn trace_len(&self) -> usize {
        self.trace_len
    }

    /// Sample at `index`. Panics if out of bounds.
    pub fn get(&self, index: usize) -> Sample<'_> {
        Sample {
            id: &self.ids[index],
            trace: self.trace_of(index),
            label: self.labels[index],
            tag: &self.tags[index],
        }
    }

    /// Index of the sample with the given identifier, if present.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    /// Trace row at `index`.
    pub fn trace_of(&self, index: usize) -> &[f32] {
        &self.traces[index * self.trace_len..(index + 1) * self.trace_len]
    }

    /// Label at `index`.
    pub fn label_of(&self, index: usize) -> u32 {
        self.labels[index]
    }

    /// Tag at `index`.
    pub fn tag_of(&self, index: usize) -> &str {
        &self.tags[index]
    }

    /// Iterate over all samples in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Sample indices grouped by label, in ascending label order.
    pub fn indices_by_label(&self) -> BTreeMap<u32, Vec<usize>> {
        let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, &label) in self.labels.iter().enumerate() {
            groups.entry(label).or_default().push(i);
        }
        groups
    }

    /// Sample indices grouped by tag, in lexicographic tag order.
    pub fn indices_by_tag(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, tag) in self.tags.iter().enumerate() {
            groups.entry(tag.as_str()).or_default().push(i);
        }
        groups
    }

    /// Per-label sample counts.
    pub fn class_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for &label in &self.labels {
            *counts.entry(label).or_default() += 1;
        }
        counts
    }

    /// Proportion of the larger class, i.e. the accuracy of always
    /// predicting the majority label. 0.0 for an empty store.
    pub fn baseline_accuracy(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let largest = self.class_counts().into_values().max().unwrap_or(0);
        largest as f64 / self.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(samples: &[(&str, &str, u32)]) -> SampleStore {
        let mut store = SampleStore::new(4);
        for (id, tag, label) in samples {
            store
                .push(id.to_string(), tag.to_string(), *label, vec![0.0; 4])
                .unwrap();
        }
        store
    }

    #[test]
    fn test_push_and_lookup() {
        let store = store_with(&[("a", "site1", 0), ("b", "site1", 1), ("c", "site2", 0)]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.index_of("b"), Some(1));
        assert_eq!(store.index_of("missing"), None);
        assert_eq!(store.get(1).label, 1);
        assert_eq!(store.get(2).tag, "site2");
        assert_eq!(store.trace_of(0).len(), 4);
    }

    #[test]
    fn test_push_rejects_wrong_trace_length() {
        let mut store = SampleStore::new(4);
        let err = store
            .push("a".to_string(), "t".to_string(), 0, vec![0.0; 3])
            .unwrap_err();
        assert!(err.to_string().contains("length 3"));
    }

    #[test]
    fn test_push_rejects_duplicate_id() {
        let mut store = SampleStore::new(4);
        store
            .push("a".to_string(), "t".to_string(), 0, vec![0.0; 4])
            .unwrap();
        let err = store
            .push("a".to_string(), "t".to_string(), 1, vec![0.0; 4])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_grouping_and_counts() {
        let store = store_with(&[
            ("a", "site1", 0),
            ("b", "site1", 0),
            ("c", "site2", 1),
            ("d", "site3", 0),
        ]);
        let by_label = store.indices_by_label();
        assert_eq!(by_label[&0], vec![0, 1, 3]);
        assert_eq!(by_label[&1], vec![2]);

        let by_tag = store.indices_by_tag();
        assert_eq!(by_tag["site1"], vec![0, 1]);
        assert_eq!(by_tag.len(), 3);

        let counts = store.class_counts();
        assert_eq!(counts[&0], 3);
        assert_eq!(counts[&1], 1);
    }

    #[test]
    fn test_baseline_accuracy() {
        let store = store_with(&[("a", "t", 0), ("b", "t", 0), ("c", "t", 0), ("d", "t", 1)]);
        assert!((store.baseline_accuracy() - 0.75).abs() < 1e-9);
        assert_eq!(SampleStore::new(4).baseline_accuracy(), 0.0);
    }
}
