use anyhow::Result;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use gcn_sweep::graph::data::GraphTensors;
use gcn_sweep::graph::dataset::load_citation_data;
use gcn_sweep::graph::export::{export_csv, output_path};
use gcn_sweep::graph::model::{GcnConfig, MlpConfig};
use gcn_sweep::graph::preprocess::{build_supports, ModelKind, ModelVariant};
use gcn_sweep::graph::sparse::row_normalize;
use gcn_sweep::graph::train::{run_sweep, SweepConfig};
use std::path::PathBuf;

type SweepBackend = Autodiff<NdArray<f32>>;

#[derive(Parser, Debug)]
#[command(name = "gcn_sweep")]
#[command(about = "Epoch sweep over a GCN on citation datasets, averaged over Monte Carlo repetitions")]
struct Args {
    /// Dataset string: cora, citeseer or pubmed
    #[arg(long, default_value = "cora")]
    dataset: String,

    /// Model string: gcn, gcn_cheby, dense, gcn_test1, gcn_test2, gcn_test3
    #[arg(long, default_value = "gcn")]
    model: String,

    /// Initial learning rate
    #[arg(long, default_value = "0.01")]
    learning_rate: f64,

    /// Number of units in hidden layer 1
    #[arg(long, default_value = "16")]
    hidden1: usize,

    /// Dropout rate (1 - keep probability)
    #[arg(long, default_value = "0.5")]
    dropout: f64,

    /// Weight for L2 loss on the first layer's weights
    #[arg(long, default_value = "5e-4")]
    weight_decay: f64,

    /// Tolerance for early stopping (# of epochs); accepted but never
    /// consulted by this sweep
    #[arg(long, default_value = "10")]
    early_stopping: usize,

    /// Maximum Chebyshev polynomial degree
    #[arg(long, default_value = "3")]
    max_degree: usize,

    /// Monte Carlo repetitions to average over
    #[arg(long, default_value = "50")]
    num_mc: usize,

    /// Largest checkpoint epoch count
    #[arg(long, default_value = "20")]
    epoch_max: usize,

    /// Directory holding <dataset>.content and <dataset>.cites
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Directory the result CSV is written to; must already exist
    #[arg(long, default_value = "./data")]
    output_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let variant: ModelVariant = args.model.parse()?;
    let data = load_citation_data(&args.dataset, &args.data_dir)?;
    log::info!(
        "{}: {} nodes, {} features, {} classes, {} edges",
        args.dataset,
        data.num_nodes,
        data.num_features,
        data.num_classes,
        data.adj.nnz() / 2
    );

    let features = row_normalize(&data.features);
    let supports = build_supports(variant, &data.adj, args.max_degree);
    log::info!("model {variant}: {} support(s)", supports.len());

    let device = Default::default();
    let graph = GraphTensors::<SweepBackend>::new(&data, &features, &supports, &device);

    let sweep = SweepConfig::new()
        .with_num_mc(args.num_mc)
        .with_epoch_max(args.epoch_max)
        .with_learning_rate(args.learning_rate)
        .with_dropout(args.dropout)
        .with_weight_decay(args.weight_decay)
        .with_early_stopping(args.early_stopping);

    let table = match variant.model_kind() {
        ModelKind::Gcn => {
            let model_config = GcnConfig::new(
                graph.input_dim,
                args.hidden1,
                graph.num_classes,
                supports.len(),
            );
            run_sweep(&sweep, &graph, || model_config.init(&device))
        }
        ModelKind::Mlp => {
            let model_config = MlpConfig::new(graph.input_dim, args.hidden1, graph.num_classes);
            run_sweep(&sweep, &graph, || model_config.init(&device))
        }
    };

    let path = output_path(&args.output_dir, &args.dataset, variant);
    export_csv(&table, &path)?;
    log::info!("averaged results written to {}", path.display());

    Ok(())
}
