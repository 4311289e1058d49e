use crate::graph::data::{GraphTensors, Split};
use crate::graph::model::{masked_accuracy, masked_softmax_cross_entropy, NodeModel};
use burn::config::Config;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::ElementConversion;
use std::time::Instant;

#[derive(Config)]
pub struct SweepConfig {
    /// Monte Carlo repetitions averaged into the final table.
    #[config(default = 50)]
    pub num_mc: usize,
    /// Checkpoint epoch counts 1..=epoch_max at which test metrics are
    /// recorded.
    #[config(default = 20)]
    pub epoch_max: usize,
    #[config(default = 0.01)]
    pub learning_rate: f64,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = 5e-4)]
    pub weight_decay: f64,
    /// Accepted for flag compatibility; the sweep never halts early.
    #[config(default = 10)]
    pub early_stopping: usize,
    #[config(default = 123)]
    pub seed: u64,
}

/// Accumulator for the averaged curves: one row per checkpoint epoch
/// count, columns Epoch, cost, accuracy, time. Allocated zero-filled,
/// mutated additively across repetitions, averaged once at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    rows: Vec<[f64; 4]>,
}

pub const METRIC_COLUMNS: [&str; 4] = ["Epoch", "cost", "accuracy", "time"];

impl MetricsTable {
    pub fn zeros(num_rows: usize) -> Self {
        Self {
            rows: vec![[0.0; 4]; num_rows],
        }
    }

    pub fn set_row(&mut self, index: usize, row: [f64; 4]) {
        self.rows[index] = row;
    }

    pub fn add_assign(&mut self, other: &Self) {
        assert_eq!(self.rows.len(), other.rows.len());
        for (a, b) in self.rows.iter_mut().zip(&other.rows) {
            for (x, y) in a.iter_mut().zip(b) {
                *x += y;
            }
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for row in &mut self.rows {
            for x in row.iter_mut() {
                *x *= factor;
            }
        }
    }

    pub fn rows(&self) -> &[[f64; 4]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Loss, accuracy, and elapsed wall-clock seconds for one split, with
/// dropout forced to zero. Never mutates parameters.
pub fn evaluate<B: Backend, M: NodeModel<B>>(
    model: &M,
    graph: &GraphTensors<B>,
    split: Split,
) -> (f64, f64, f64) {
    let start = Instant::now();
    let feed = graph.feed(split, 0.0);
    let logits = model.forward(&feed);
    let cost: f64 = masked_softmax_cross_entropy(logits.clone(), feed.labels.clone(), feed.mask.clone())
        .into_scalar()
        .elem();
    let accuracy: f64 = masked_accuracy(logits, feed.labels, feed.mask)
        .into_scalar()
        .elem();
    (cost, accuracy, start.elapsed().as_secs_f64())
}

/// The sweep driver. Each Monte Carlo repetition gets a fresh model (from
/// `make_model`) and a fresh Adam optimizer; within a repetition training
/// is cumulative, so checkpoint `e` runs `e` further epochs on top of the
/// previous checkpoints before recording test metrics at row `e - 1`.
/// Per-repetition tables are summed and divided by `num_mc` at the end.
pub fn run_sweep<B, M, F>(
    config: &SweepConfig,
    graph: &GraphTensors<B>,
    make_model: F,
) -> MetricsTable
where
    B: AutodiffBackend,
    M: NodeModel<B> + AutodiffModule<B>,
    M::InnerModule: NodeModel<B::InnerBackend>,
    F: Fn() -> M,
{
    B::seed(config.seed);

    // evaluation runs on the inner backend so no tape is recorded
    let eval_graph = graph.inner();
    let mut totals = MetricsTable::zeros(config.epoch_max);
    for rep in 0..config.num_mc {
        let mut model = make_model();
        let mut optimizer = AdamConfig::new().init();
        let mut rep_table = MetricsTable::zeros(config.epoch_max);
        let mut val_cost_history: Vec<f64> = Vec::new();

        for checkpoint in 1..=config.epoch_max {
            for _ in 0..checkpoint {
                let feed = graph.feed(Split::Train, config.dropout);
                let logits = model.forward(&feed);
                let loss = masked_softmax_cross_entropy(logits, feed.labels.clone(), feed.mask.clone())
                    + model.l2_penalty().mul_scalar(config.weight_decay);
                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(config.learning_rate, model, grads);

                let (val_cost, val_acc, _) = evaluate(&model.valid(), &eval_graph, Split::Val);
                val_cost_history.push(val_cost);
                log::debug!(
                    "rep {rep} checkpoint {checkpoint}: val_cost={val_cost:.5} val_acc={val_acc:.5}"
                );
            }

            let (test_cost, test_acc, test_duration) = evaluate(&model.valid(), &eval_graph, Split::Test);
            rep_table.set_row(
                checkpoint - 1,
                [checkpoint as f64, test_cost, test_acc, test_duration],
            );
        }

        totals.add_assign(&rep_table);
        log::info!(
            "repetition {}/{} done, final val_cost={:.5}",
            rep + 1,
            config.num_mc,
            val_cost_history.last().copied().unwrap_or(f64::NAN)
        );
    }

    if config.num_mc > 0 {
        totals.scale(1.0 / config.num_mc as f64);
    }
    totals
}
