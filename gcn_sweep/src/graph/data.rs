use crate::graph::dataset::CitationData;
use crate::graph::sparse::SparseMatrix;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

/// Which label matrix and mask a feed binding selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

/// Device-resident copies of everything the model reads: preprocessed
/// features, the support list, and per-split labels and masks. Built once
/// per run and consumed read-only for its duration.
#[derive(Debug, Clone)]
pub struct GraphTensors<B: Backend> {
    pub features: Tensor<B, 2>,
    pub supports: Vec<Tensor<B, 2>>,
    pub y_train: Tensor<B, 2>,
    pub y_val: Tensor<B, 2>,
    pub y_test: Tensor<B, 2>,
    pub train_mask: Tensor<B, 1>,
    pub val_mask: Tensor<B, 1>,
    pub test_mask: Tensor<B, 1>,
    pub num_nodes: usize,
    pub input_dim: usize,
    pub num_classes: usize,
}

/// One fully-populated placeholder binding: the concrete values supplied
/// for a single training or evaluation step. Evaluation feeds carry a
/// dropout rate of zero.
#[derive(Debug, Clone)]
pub struct Feed<B: Backend> {
    pub supports: Vec<Tensor<B, 2>>,
    pub features: Tensor<B, 2>,
    pub labels: Tensor<B, 2>,
    pub mask: Tensor<B, 1>,
    pub dropout: f64,
}

fn mask_tensor<B: Backend>(mask: &[bool], device: &B::Device) -> Tensor<B, 1> {
    let values: Vec<f32> = mask.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect();
    let len = values.len();
    Tensor::from_data(TensorData::new(values, [len]), device)
}

impl<B: Backend> GraphTensors<B> {
    /// Uploads the loaded dataset and its derived support list. `features`
    /// is the already row-normalized feature matrix.
    pub fn new(
        data: &CitationData,
        features: &SparseMatrix,
        supports: &[SparseMatrix],
        device: &B::Device,
    ) -> Self {
        let n = data.num_nodes;
        let d = data.num_features;
        let c = data.num_classes;

        let features = Tensor::from_data(TensorData::new(features.to_dense(), [n, d]), device);
        let supports = supports
            .iter()
            .map(|s| Tensor::from_data(TensorData::new(s.to_dense(), [s.rows(), s.cols()]), device))
            .collect();

        Self {
            features,
            supports,
            y_train: Tensor::from_data(TensorData::new(data.y_train.clone(), [n, c]), device),
            y_val: Tensor::from_data(TensorData::new(data.y_val.clone(), [n, c]), device),
            y_test: Tensor::from_data(TensorData::new(data.y_test.clone(), [n, c]), device),
            train_mask: mask_tensor::<B>(&data.train_mask, device),
            val_mask: mask_tensor::<B>(&data.val_mask, device),
            test_mask: mask_tensor::<B>(&data.test_mask, device),
            num_nodes: n,
            input_dim: d,
            num_classes: c,
        }
    }

    /// Assembles the feed binding for one step. Tensor handles are shared,
    /// so this is cheap and allocates nothing on the device.
    pub fn feed(&self, split: Split, dropout: f64) -> Feed<B> {
        let (labels, mask) = match split {
            Split::Train => (self.y_train.clone(), self.train_mask.clone()),
            Split::Val => (self.y_val.clone(), self.val_mask.clone()),
            Split::Test => (self.y_test.clone(), self.test_mask.clone()),
        };
        Feed {
            supports: self.supports.clone(),
            features: self.features.clone(),
            labels,
            mask,
            dropout,
        }
    }
}

impl<B: AutodiffBackend> GraphTensors<B> {
    /// Detaches every tensor onto the inner backend so evaluation never
    /// records a gradient tape.
    pub fn inner(&self) -> GraphTensors<B::InnerBackend> {
        GraphTensors {
            features: self.features.clone().inner(),
            supports: self.supports.iter().map(|s| s.clone().inner()).collect(),
            y_train: self.y_train.clone().inner(),
            y_val: self.y_val.clone().inner(),
            y_test: self.y_test.clone().inner(),
            train_mask: self.train_mask.clone().inner(),
            val_mask: self.val_mask.clone().inner(),
            test_mask: self.test_mask.clone().inner(),
            num_nodes: self.num_nodes,
            input_dim: self.input_dim,
            num_classes: self.num_classes,
        }
    }
}
