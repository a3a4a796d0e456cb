//! The trace classifier: four conv blocks + fully-connected head.
//!
//! Input is a `[batch, 1, trace_len]` directional trace; output is a
//! `[batch, num_classes]` vector of unnormalized class scores. Softmax is
//! applied only at evaluation time via [`TraceClassifier::probabilities`].

use candle_core::{Tensor, D};
use candle_nn::{BatchNorm, BatchNormConfig, Conv1d, Conv1dConfig, Dropout, Linear, VarBuilder};
use candle_nn::{Module, ModuleT};
use tracedist_core::{Result, TracedistError};

/// Number of output classes (first archive, second archive).
pub const NUM_CLASSES: usize = 2;

/// Channel width of each conv block.
const FILTER_NUM: [usize; 4] = [32, 64, 128, 256];
/// Kernel width of every convolution.
const KERNEL_SIZE: usize = 8;
const CONV_STRIDE: usize = 1;
/// Max-pooling window and stride; each block downsamples the sequence by 4.
const POOL_SIZE: usize = 8;
const POOL_STRIDE: usize = 4;
const BLOCK_DROPOUT: f32 = 0.1;
/// Width of both fully-connected head layers.
const HIDDEN: usize = 512;
const HEAD_DROPOUT_1: f32 = 0.7;
const HEAD_DROPOUT_2: f32 = 0.5;

/// Sequence length coming out of the four conv blocks for a given input
/// length, or `None` if the input is too short to survive four pooling
/// stages. Each block runs two same-padded even-kernel convolutions (each
/// grows the sequence by one) and then pools with window 8, stride 4.
pub fn feature_len(trace_len: usize) -> Option<usize> {
    let mut len = trace_len;
    for _ in 0..FILTER_NUM.len() {
        len += 2;
        if len < POOL_SIZE {
            return None;
        }
        len = (len - POOL_SIZE) / POOL_STRIDE + 1;
    }
    Some(len)
}

/// Nonlinearity of a conv block. The first block uses ELU, all later
/// blocks use ReLU; the asymmetry is part of the architecture contract.
#[derive(Debug, Clone, Copy)]
enum BlockActivation {
    Elu,
    Relu,
}

impl BlockActivation {
    fn apply(self, x: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Elu => x.elu(1.0),
            Self::Relu => x.relu(),
        }
    }
}

/// One feature-extraction block: conv → norm → act, twice, then pool and
/// dropout.
#[derive(Debug)]
struct ConvBlock {
    conv1: Conv1d,
    bn1: BatchNorm,
    conv2: Conv1d,
    bn2: BatchNorm,
    activation: BlockActivation,
    dropout: Dropout,
}

impl ConvBlock {
    fn new(
        in_channels: usize,
        out_channels: usize,
        activation: BlockActivation,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let cfg = Conv1dConfig {
            padding: KERNEL_SIZE / 2,
            stride: CONV_STRIDE,
            ..Default::default()
        };
        let conv1 = candle_nn::conv1d_no_bias(in_channels, out_channels, KERNEL_SIZE, cfg, vb.pp("conv1"))?;
        let bn1 = candle_nn::batch_norm(out_channels, BatchNormConfig::default(), vb.pp("bn1"))?;
        let conv2 = candle_nn::conv1d_no_bias(out_channels, out_channels, KERNEL_SIZE, cfg, vb.pp("conv2"))?;
        let bn2 = candle_nn::batch_norm(out_channels, BatchNormConfig::default(), vb.pp("bn2"))?;
        Ok(Self {
            conv1,
            bn1,
            conv2,
            bn2,
            activation,
            dropout: Dropout::new(BLOCK_DROPOUT),
        })
    }

    fn forward_t(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let x = self.conv1.forward(x)?;
        let x = self.bn1.forward_t(&x, train)?;
        let x = self.activation.apply(&x)?;
        let x = self.conv2.forward(&x)?;
        let x = self.bn2.forward_t(&x, train)?;
        let x = self.activation.apply(&x)?;
        let x = max_pool1d(&x, POOL_SIZE, POOL_STRIDE)?;
        self.dropout.forward(&x, train)
    }
}

/// Max-pooling over the last dimension of a `[batch, channels, len]` tensor.
fn max_pool1d(x: &Tensor, kernel: usize, stride: usize) -> candle_core::Result<Tensor> {
    let (batch, channels, len) = x.dims3()?;
    let pooled = x
        .reshape((batch, channels, 1, len))?
        .max_pool2d_with_stride((1, kernel), (1, stride))?;
    let out_len = pooled.dim(D::Minus1)?;
    pooled.reshape((batch, channels, out_len))
}

/// Fixed-architecture binary trace classifier.
///
/// Feature extractor: four [`ConvBlock`]s with channel widths 32→64→128→256.
/// Head: Linear(512) → BatchNorm → ReLU → Dropout(0.7) → Linear(512) →
/// BatchNorm → ReLU → Dropout(0.5) → Linear(num_classes).
#[derive(Debug)]
pub struct TraceClassifier {
    blocks: Vec<ConvBlock>,
    fc1: Linear,
    bn_fc1: BatchNorm,
    drop1: Dropout,
    fc2: Linear,
    bn_fc2: BatchNorm,
    drop2: Dropout,
    out: Linear,
    trace_len: usize,
}

impl TraceClassifier {
    /// Build a classifier for traces of length `trace_len`.
    ///
    /// Parameters are created in (or loaded from) the `VarBuilder`, so a
    /// fresh `VarMap` yields a freshly initialised model per fold.
    pub fn new(num_classes: usize, trace_len: usize, vb: VarBuilder) -> Result<Self> {
        let flat_len = feature_len(trace_len).ok_or_else(|| {
            TracedistError::Config(format!(
                "trace length {trace_len} is too short for four pooling stages"
            ))
        })?;

        let mut blocks = Vec::with_capacity(FILTER_NUM.len());
        let mut in_channels = 1;
        for (i, &out_channels) in FILTER_NUM.iter().enumerate() {
            let activation = if i == 0 {
                BlockActivation::Elu
            } else {
                BlockActivation::Relu
            };
            let block = ConvBlock::new(
                in_channels,
                out_channels,
                activation,
                vb.pp(format!("block{}", i + 1)),
            )
            .map_err(|e| TracedistError::Model(format!("Failed to create conv block {}: {e}", i + 1)))?;
            blocks.push(block);
            in_channels = out_channels;
        }

        let flat_dim = FILTER_NUM[FILTER_NUM.len() - 1] * flat_len;
        let fc1 = candle_nn::linear_no_bias(flat_dim, HIDDEN, vb.pp("fc1"))
            .map_err(|e| TracedistError::Model(format!("Failed to create fc1: {e}")))?;
        let bn_fc1 = candle_nn::batch_norm(HIDDEN, BatchNormConfig::default(), vb.pp("bn_fc1"))
            .map_err(|e| TracedistError::Model(format!("Failed to create bn_fc1: {e}")))?;
        let fc2 = candle_nn::linear_no_bias(HIDDEN, HIDDEN, vb.pp("fc2"))
            .map_err(|e| TracedistError::Model(format!("Failed to create fc2: {e}")))?;
        let bn_fc2 = candle_nn::batch_norm(HIDDEN, BatchNormConfig::default(), vb.pp("bn_fc2"))
            .map_err(|e| TracedistError::Model(format!("Failed to create bn_fc2: {e}")))?;
        let out = candle_nn::linear(HIDDEN, num_classes, vb.pp("out"))
            .map_err(|e| TracedistError::Model(format!("Failed to create output layer: {e}")))?;

        Ok(Self {
            blocks,
            fc1,
            bn_fc1,
            drop1: Dropout::new(HEAD_DROPOUT_1),
            fc2,
            bn_fc2,
            drop2: Dropout::new(HEAD_DROPOUT_2),
            out,
            trace_len,
        })
    }

    /// Trace length this model was built for.
    pub fn trace_len(&self) -> usize {
        self.trace_len
    }

    /// Forward pass producing unnormalized class scores.
    ///
    /// `x` has shape `[batch, 1, trace_len]`; the result `[batch, classes]`.
    /// `train` toggles dropout and batch-norm statistics.
    pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        self.forward_inner(x, train)
            .map_err(|e| TracedistError::Model(format!("Forward pass failed: {e}")))
    }

    fn forward_inner(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let mut x = x.clone();
        for block in &self.blocks {
            x = block.forward_t(&x, train)?;
        }
        let x = x.flatten_from(1)?;

        let x = self.fc1.forward(&x)?;
        let x = self.bn_fc1.forward_t(&x, train)?;
        let x = x.relu()?;
        let x = self.drop1.forward(&x, train)?;

        let x = self.fc2.forward(&x)?;
        let x = self.bn_fc2.forward_t(&x, train)?;
        let x = x.relu()?;
        let x = self.drop2.forward(&x, train)?;

        self.out.forward(&x)
    }

    /// Evaluation-time class probabilities: softmax over the scores, with
    /// dropout disabled and batch norm in inference mode.
    pub fn probabilities(&self, x: &Tensor) -> Result<Tensor> {
        let logits = self.forward_t(x, false)?;
        candle_nn::ops::softmax(&logits, D::Minus1)
            .map_err(|e| TracedistError::Model(format!("Softmax failed: {e}")))
    }
}
