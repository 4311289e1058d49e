use anyhow::Result;
use clap::Parser;
use gcn_sweep::graph::dataset::load_citation_data;
use gcn_sweep::graph::preprocess::{build_supports, ALL_VARIANTS};
use std::path::PathBuf;

/// Prints the shape of a citation dataset and of every model variant's
/// support list, without running any training.
#[derive(Parser, Debug)]
#[command(name = "inspect_dataset")]
struct Args {
    /// Dataset string: cora, citeseer or pubmed
    #[arg(long, default_value = "cora")]
    dataset: String,

    /// Directory holding <dataset>.content and <dataset>.cites
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Maximum Chebyshev polynomial degree
    #[arg(long, default_value = "3")]
    max_degree: usize,
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let data = load_citation_data(&args.dataset, &args.data_dir)?;

    println!("dataset: {}", args.dataset);
    println!("  nodes:    {}", data.num_nodes);
    println!("  edges:    {}", data.adj.nnz() / 2);
    println!("  features: {} ({} nonzero)", data.num_features, data.features.nnz());
    println!("  classes:  {}", data.num_classes);
    println!(
        "  splits:   train={} val={} test={}",
        count(&data.train_mask),
        count(&data.val_mask),
        count(&data.test_mask)
    );

    println!("supports (max_degree = {}):", args.max_degree);
    for variant in ALL_VARIANTS {
        let supports = build_supports(variant, &data.adj, args.max_degree);
        let nnz: usize = supports.iter().map(|s| s.nnz()).sum();
        println!("  {variant:<10} count={} nnz={}", supports.len(), nnz);
    }

    Ok(())
}
