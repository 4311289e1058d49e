use crate::graph::data::Feed;
use burn::module::Param;
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, relu};
use burn::tensor::Distribution;

/// Contract every trainable variant exposes to the sweep engine: logits
/// from a feed binding, plus the weight-decay penalty (half the squared
/// norm of the first layer's weights only).
pub trait NodeModel<B: Backend>: Module<B> {
    fn forward(&self, feed: &Feed<B>) -> Tensor<B, 2>;
    fn l2_penalty(&self) -> Tensor<B, 1>;
}

/// Inverted dropout driven by the feed's rate rather than a module-level
/// constant, so evaluation at rate zero is exact.
fn dropout<B: Backend>(x: Tensor<B, 2>, rate: f64) -> Tensor<B, 2> {
    if rate <= 0.0 {
        return x;
    }
    let keep = 1.0 - rate;
    let mask = Tensor::random(x.shape(), Distribution::Bernoulli(keep), &x.device());
    x * mask.div_scalar(keep)
}

/// One graph convolution: a separate weight matrix per support, output
/// `sum_i support_i * (x * w_i)`. No bias.
#[derive(Module, Debug)]
pub struct GraphConvolution<B: Backend> {
    weights: Vec<Param<Tensor<B, 2>>>,
}

impl<B: Backend> GraphConvolution<B> {
    pub fn forward(&self, x: Tensor<B, 2>, supports: &[Tensor<B, 2>]) -> Tensor<B, 2> {
        assert_eq!(supports.len(), self.weights.len());
        self.weights
            .iter()
            .zip(supports)
            .map(|(w, s)| s.clone().matmul(x.clone().matmul(w.val())))
            .reduce(|acc, t| acc + t)
            .unwrap()
    }

    fn weight_penalty(&self) -> Tensor<B, 1> {
        self.weights
            .iter()
            .map(|w| w.val().powf_scalar(2.0).sum().div_scalar(2.0))
            .reduce(|acc, t| acc + t)
            .unwrap()
    }
}

#[derive(Config, Debug)]
pub struct GraphConvolutionConfig {
    input_dim: usize,
    output_dim: usize,
    num_supports: usize,
}

impl GraphConvolutionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GraphConvolution<B> {
        let initializer = Initializer::XavierUniform { gain: 1.0 };
        GraphConvolution {
            weights: (0..self.num_supports)
                .map(|_| {
                    initializer.init_with(
                        [self.input_dim, self.output_dim],
                        Some(self.input_dim),
                        Some(self.output_dim),
                        device,
                    )
                })
                .collect(),
        }
    }
}

/// Two-layer graph convolutional network: dropout, conv, relu, dropout,
/// conv.
#[derive(Module, Debug)]
pub struct Gcn<B: Backend> {
    conv1: GraphConvolution<B>,
    conv2: GraphConvolution<B>,
}

impl<B: Backend> NodeModel<B> for Gcn<B> {
    fn forward(&self, feed: &Feed<B>) -> Tensor<B, 2> {
        let x = dropout(feed.features.clone(), feed.dropout);
        let h = relu(self.conv1.forward(x, &feed.supports));
        let h = dropout(h, feed.dropout);
        self.conv2.forward(h, &feed.supports)
    }

    fn l2_penalty(&self) -> Tensor<B, 1> {
        self.conv1.weight_penalty()
    }
}

#[derive(Config, Debug)]
pub struct GcnConfig {
    input_dim: usize,
    hidden_dim: usize,
    num_classes: usize,
    num_supports: usize,
}

impl GcnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Gcn<B> {
        Gcn {
            conv1: GraphConvolutionConfig::new(self.input_dim, self.hidden_dim, self.num_supports)
                .init(device),
            conv2: GraphConvolutionConfig::new(self.hidden_dim, self.num_classes, self.num_supports)
                .init(device),
        }
    }
}

/// Baseline that ignores graph structure: the same two-layer shape with
/// plain bias-free linear layers.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    linear1: Linear<B>,
    linear2: Linear<B>,
}

impl<B: Backend> NodeModel<B> for Mlp<B> {
    fn forward(&self, feed: &Feed<B>) -> Tensor<B, 2> {
        let x = dropout(feed.features.clone(), feed.dropout);
        let h = relu(self.linear1.forward(x));
        let h = dropout(h, feed.dropout);
        self.linear2.forward(h)
    }

    fn l2_penalty(&self) -> Tensor<B, 1> {
        self.linear1.weight.val().powf_scalar(2.0).sum().div_scalar(2.0)
    }
}

#[derive(Config, Debug)]
pub struct MlpConfig {
    input_dim: usize,
    hidden_dim: usize,
    num_classes: usize,
}

impl MlpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        Mlp {
            linear1: LinearConfig::new(self.input_dim, self.hidden_dim)
                .with_bias(false)
                .init(device),
            linear2: LinearConfig::new(self.hidden_dim, self.num_classes)
                .with_bias(false)
                .init(device),
        }
    }
}

/// Softmax cross-entropy over one-hot labels, averaged over the rows the
/// mask selects. An empty mask yields zero rather than NaN.
pub fn masked_softmax_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 2>,
    mask: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    let ce: Tensor<B, 1> = (labels * log_probs).sum_dim(1).neg().squeeze(1);
    let denom = mask.clone().sum().clamp_min(1e-9);
    (ce * mask).sum() / denom
}

/// Fraction of mask-selected rows whose argmax matches the label argmax.
pub fn masked_accuracy<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 2>,
    mask: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let correct: Tensor<B, 1> = logits.argmax(1).equal(labels.argmax(1)).float().squeeze(1);
    let denom = mask.clone().sum().clamp_min(1e-9);
    (correct * mask).sum() / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::ElementConversion;

    type B = burn::backend::NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    fn tensor2(values: Vec<f32>, shape: [usize; 2]) -> Tensor<B, 2> {
        Tensor::from_data(TensorData::new(values, shape), &device())
    }

    fn tensor1(values: Vec<f32>) -> Tensor<B, 1> {
        let len = values.len();
        Tensor::from_data(TensorData::new(values, [len]), &device())
    }

    #[test]
    fn dropout_rate_zero_is_identity() {
        let x = tensor2(vec![1.0, 2.0, 3.0, 4.0], [2, 2]);
        let y = dropout(x.clone(), 0.0);
        assert_eq!(
            x.to_data().to_vec::<f32>().unwrap(),
            y.to_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn masked_accuracy_counts_only_masked_rows() {
        // rows 0 and 2 correct, row 1 wrong; mask selects rows 0 and 1
        let logits = tensor2(vec![2.0, 0.0, 2.0, 0.0, 0.0, 2.0], [3, 2]);
        let labels = tensor2(vec![1.0, 0.0, 0.0, 1.0, 0.0, 1.0], [3, 2]);
        let mask = tensor1(vec![1.0, 1.0, 0.0]);
        let acc: f64 = masked_accuracy(logits, labels, mask).into_scalar().elem();
        assert!((acc - 0.5).abs() < 1e-6);
    }

    #[test]
    fn masked_cross_entropy_is_nonnegative_and_masked() {
        let logits = tensor2(vec![5.0, -5.0, -5.0, 5.0], [2, 2]);
        let labels = tensor2(vec![1.0, 0.0, 0.0, 1.0], [2, 2]);
        let full = masked_softmax_cross_entropy(
            logits.clone(),
            labels.clone(),
            tensor1(vec![1.0, 1.0]),
        );
        let cost: f64 = full.into_scalar().elem();
        assert!(cost >= 0.0);
        assert!(cost < 0.1, "confident correct logits should have tiny loss");

        let empty = masked_softmax_cross_entropy(logits, labels, tensor1(vec![0.0, 0.0]));
        let cost: f64 = empty.into_scalar().elem();
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn gcn_forward_produces_class_logits() {
        let feed = Feed::<B> {
            supports: vec![tensor2(vec![0.5, 0.5, 0.5, 0.5], [2, 2])],
            features: tensor2(vec![1.0, 0.0, 0.0, 1.0], [2, 2]),
            labels: tensor2(vec![1.0, 0.0, 0.0, 1.0], [2, 2]),
            mask: tensor1(vec![1.0, 1.0]),
            dropout: 0.0,
        };
        let model = GcnConfig::new(2, 4, 2, 1).init::<B>(&device());
        assert_eq!(model.forward(&feed).shape().dims, [2, 2]);

        let penalty: f64 = model.l2_penalty().into_scalar().elem();
        assert!(penalty >= 0.0);
    }

    #[test]
    fn mlp_ignores_supports() {
        let feed = Feed::<B> {
            supports: Vec::new(),
            features: tensor2(vec![1.0, 0.0, 0.0, 1.0], [2, 2]),
            labels: tensor2(vec![1.0, 0.0, 0.0, 1.0], [2, 2]),
            mask: tensor1(vec![1.0, 1.0]),
            dropout: 0.0,
        };
        let model = MlpConfig::new(2, 4, 2).init::<B>(&device());
        assert_eq!(model.forward(&feed).shape().dims, [2, 2]);
    }
}
