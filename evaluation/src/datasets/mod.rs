//! Trace archive loading and merging.
//!
//! An archive is a directory holding two files:
//!
//! | File | Contents |
//! |------|----------|
//! | `manifest.json` | ordered `{id, tag}` entries plus declared count and trace length |
//! | `traces.safetensors` | tensor `traces`, shape `[count, trace_len]`, f32 |
//!
//! [`load_store`] merges two archives into one [`SampleStore`], assigning
//! label 0 to every sample of the first archive and label 1 to the second.
//! Traces are zero-padded or truncated to the configured length on
//! ingestion. A mismatch between an archive's identifier, tag, and trace
//! counts is a fatal invariant violation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracedist_core::{Result, SampleStore, TracedistError};

/// Manifest file name inside an archive directory.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Trace matrix file name inside an archive directory.
pub const TRACES_FILE: &str = "traces.safetensors";
/// Name of the trace tensor inside the safetensors file.
const TRACES_TENSOR: &str = "traces";

/// One manifest entry; entry order matches trace matrix row order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Opaque unique identifier.
    pub id: String,
    /// Grouping key (e.g. originating site).
    pub tag: String,
}

/// Archive manifest stored alongside the trace matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub entries: Vec<ManifestEntry>,
    /// Declared sample count; must match `entries.len()` and the tensor rows.
    pub count: usize,
    /// Declared trace length; must match the tensor columns.
    pub trace_len: usize,
}

/// A sample to be written by [`save_archive`].
#[derive(Debug, Clone)]
pub struct ArchiveSample {
    pub id: String,
    pub tag: String,
    pub trace: Vec<f32>,
}

/// Load two archives and merge them into one store with traces
/// padded/truncated to `trace_len`.
///
/// The first archive's samples get label 0, the second's label 1. Fails
/// before any processing if either path does not exist.
pub fn load_store(first: &Path, second: &Path, trace_len: usize) -> Result<SampleStore> {
    for path in [first, second] {
        if !path.exists() {
            return Err(TracedistError::Dataset(format!(
                "{} does not exist",
                path.display()
            )));
        }
    }

    let mut store = SampleStore::new(trace_len);
    let first_count = load_archive_into(&mut store, first, 0)?;
    let second_count = load_archive_into(&mut store, second, 1)?;

    println!(
        "loading datasets done, {} samples, {} from {}, {} from {}",
        store.len(),
        first_count,
        first.display(),
        second_count,
        second.display(),
    );

    Ok(store)
}

/// Load one archive, appending its samples to `store` under `label`.
/// Returns the number of samples loaded.
fn load_archive_into(store: &mut SampleStore, dir: &Path, label: u32) -> Result<usize> {
    let manifest_path = dir.join(MANIFEST_FILE);
    let manifest_str = std::fs::read_to_string(&manifest_path).map_err(|e| {
        TracedistError::Dataset(format!("failed to read {}: {e}", manifest_path.display()))
    })?;
    let manifest: ArchiveManifest = serde_json::from_str(&manifest_str).map_err(|e| {
        TracedistError::Dataset(format!("failed to parse {}: {e}", manifest_path.display()))
    })?;

    if manifest.entries.len() != manifest.count {
        return Err(TracedistError::Dataset(format!(
            "{}: identifier count {} does not match declared count {}",
            dir.display(),
            manifest.entries.len(),
            manifest.count
        )));
    }

    let traces_path = dir.join(TRACES_FILE);
    let data = std::fs::read(&traces_path).map_err(|e| {
        TracedistError::Dataset(format!("failed to read {}: {e}", traces_path.display()))
    })?;
    let tensors = safetensors::SafeTensors::deserialize(&data).map_err(|e| {
        TracedistError::Dataset(format!("failed to parse {}: {e}", traces_path.display()))
    })?;
    let view = tensors.tensor(TRACES_TENSOR).map_err(|e| {
        TracedistError::Dataset(format!(
            "tensor '{TRACES_TENSOR}' not found in {}: {e}",
            traces_path.display()
        ))
    })?;

    if view.dtype() != safetensors::Dtype::F32 {
        return Err(TracedistError::Dataset(format!(
            "{}: expected f32 traces, got {:?}",
            traces_path.display(),
            view.dtype()
        )));
    }
    if view.shape() != [manifest.count, manifest.trace_len] {
        return Err(TracedistError::Dataset(format!(
            "{}: trace count {:?} does not match manifest [{}, {}]",
            traces_path.display(),
            view.shape(),
            manifest.count,
            manifest.trace_len
        )));
    }

    let raw = view.data();
    let floats: Vec<f32> = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let target_len = store.trace_len();
    for (row, entry) in manifest.entries.into_iter().enumerate() {
        let src = &floats[row * manifest.trace_len..(row + 1) * manifest.trace_len];
        let mut trace = vec![0.0f32; target_len];
        let n = target_len.min(src.len());
        trace[..n].copy_from_slice(&src[..n]);
        store.push(entry.id, entry.tag, label, trace)?;
    }

    Ok(manifest.count)
}

/// Write an archive directory in the layout [`load_store`] reads.
///
/// Every trace must have length `trace_len`. Used by tests and dataset
/// preparation tooling.
pub fn save_archive(dir: &Path, samples: &[ArchiveSample], trace_len: usize) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        TracedistError::Dataset(format!("failed to create {}: {e}", dir.display()))
    })?;

    let mut flat: Vec<f32> = Vec::with_capacity(samples.len() * trace_len);
    let mut entries: Vec<ManifestEntry> = Vec::with_capacity(samples.len());
    for sample in samples {
        if sample.trace.len() != trace_len {
            return Err(TracedistError::Dataset(format!(
                "trace for {} has length {}, expected {}",
                sample.id,
                sample.trace.len(),
                trace_len
            )));
        }
        flat.extend_from_slice(&sample.trace);
        entries.push(ManifestEntry {
            id: sample.id.clone(),
            tag: sample.tag.clone(),
        });
    }

    let byte_data: Vec<u8> = flat.iter().flat_map(|f| f.to_le_bytes()).collect();
    let mut tensors = std::collections::HashMap::new();
    tensors.insert(
        TRACES_TENSOR.to_string(),
        safetensors::tensor::TensorView::new(
            safetensors::Dtype::F32,
            vec![samples.len(), trace_len],
            &byte_data,
        )
        .map_err(|e| TracedistError::Dataset(format!("TensorView create failed: {e}")))?,
    );
    let serialized = safetensors::tensor::serialize(&tensors, &None)
        .map_err(|e| TracedistError::Dataset(format!("safetensors serialize failed: {e}")))?;
    std::fs::write(dir.join(TRACES_FILE), serialized).map_err(|e| {
        TracedistError::Dataset(format!("failed to write {}: {e}", dir.join(TRACES_FILE).display()))
    })?;

    let manifest = ArchiveManifest {
        count: entries.len(),
        trace_len,
        entries,
    };
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| TracedistError::Dataset(format!("manifest serialize failed: {e}")))?;
    std::fs::write(dir.join(MANIFEST_FILE), manifest_json).map_err(|e| {
        TracedistError::Dataset(format!(
            "failed to write {}: {e}",
            dir.join(MANIFEST_FILE).display()
        ))
    })?;

    Ok(())
}
