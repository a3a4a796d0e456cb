//! Convolutional trace classifier.
//!
//! Implements the fixed feature-extractor architecture used to test whether
//! two trace collections are distinguishable: four 1-D convolutional blocks
//! with increasing channel width feeding a two-layer fully-connected head.
//! The architecture is fixed; see [`classifier::TraceClassifier`] for the
//! exact stage list.
//!
//! # Modules
//!
//! - [`classifier`] — the model itself
//! - [`device`] — compute device selection (CUDA > Metal > CPU)

pub mod classifier;
pub mod device;

pub use classifier::{feature_len, TraceClassifier, NUM_CLASSES};
pub use device::select_device;
