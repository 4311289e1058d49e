use crate::graph::error::SweepError;
use crate::graph::sparse::SparseMatrix;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const SUPPORTED_DATASETS: [&str; 3] = ["cora", "citeseer", "pubmed"];

/// Everything the training engine consumes, CPU-side and immutable after
/// loading. Three one-hot label matrices with rows zeroed outside their
/// mask, plus the masks themselves; `mask.len() == n` for all three.
#[derive(Debug, Clone)]
pub struct CitationData {
    pub adj: SparseMatrix,
    pub features: SparseMatrix,
    pub y_train: Vec<f32>,
    pub y_val: Vec<f32>,
    pub y_test: Vec<f32>,
    pub train_mask: Vec<bool>,
    pub val_mask: Vec<bool>,
    pub test_mask: Vec<bool>,
    pub num_nodes: usize,
    pub num_features: usize,
    pub num_classes: usize,
}

struct ContentRow {
    id: String,
    features: Vec<f32>,
    class_name: String,
}

fn parse_content_line(line: &str, path: &str) -> Result<ContentRow, SweepError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(SweepError::MalformedDataset {
            path: path.to_string(),
            reason: format!("content line with {} fields", fields.len()),
        });
    }
    let id = fields[0].to_string();
    let class_name = fields[fields.len() - 1].to_string();
    let features = fields[1..fields.len() - 1]
        .iter()
        .map(|f| {
            f.parse::<f32>().map_err(|_| SweepError::MalformedDataset {
                path: path.to_string(),
                reason: format!("non-numeric feature value {f:?} for node {id}"),
            })
        })
        .collect::<Result<Vec<f32>, SweepError>>()?;
    Ok(ContentRow { id, features, class_name })
}

/// Planetoid convention generalized to any node/class count: the first
/// `20 * num_classes` rows train, the last 1000 test, up to 500 in between
/// validate. For cora (n = 2708, 7 classes) this is the usual 140/500/1000.
fn planetoid_masks(n: usize, num_classes: usize) -> (Vec<bool>, Vec<bool>, Vec<bool>) {
    let train_size = (20 * num_classes).min(n);
    let test_size = 1000.min(n - train_size);
    let test_start = n - test_size;
    let val_end = (train_size + 500).min(test_start);

    let mut train_mask = vec![false; n];
    let mut val_mask = vec![false; n];
    let mut test_mask = vec![false; n];
    train_mask[..train_size].fill(true);
    val_mask[train_size..val_end].fill(true);
    test_mask[test_start..].fill(true);
    (train_mask, val_mask, test_mask)
}

fn masked_one_hot(targets: &[usize], num_classes: usize, mask: &[bool]) -> Vec<f32> {
    let mut labels = vec![0.0; targets.len() * num_classes];
    for (i, (&class, &keep)) in targets.iter().zip(mask).enumerate() {
        if keep {
            labels[i * num_classes + class] = 1.0;
        }
    }
    labels
}

/// Loads `<data_dir>/<name>.content` and `<data_dir>/<name>.cites`. Node
/// ids are opaque strings (citeseer uses non-numeric ids); class names are
/// interned in first-seen order. Citations mentioning ids absent from the
/// content file are skipped with a warning.
pub fn load_citation_data(name: &str, data_dir: &Path) -> Result<CitationData, SweepError> {
    if !SUPPORTED_DATASETS.contains(&name) {
        return Err(SweepError::UnknownDataset(name.to_string()));
    }

    let content_path = data_dir.join(format!("{name}.content"));
    let cites_path = data_dir.join(format!("{name}.cites"));
    let content_path_str = content_path.display().to_string();

    let content_lines: Vec<String> = BufReader::new(File::open(&content_path)?)
        .lines()
        .collect::<Result<_, _>>()?;
    let rows: Vec<ContentRow> = content_lines
        .par_iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| parse_content_line(l, &content_path_str))
        .collect::<Result<_, _>>()?;

    let num_nodes = rows.len();
    if num_nodes == 0 {
        return Err(SweepError::MalformedDataset {
            path: content_path_str,
            reason: "empty content file".to_string(),
        });
    }
    let num_features = rows[0].features.len();

    let mut index_of: HashMap<&str, usize> = HashMap::with_capacity(num_nodes);
    let mut class_of: HashMap<&str, usize> = HashMap::new();
    let mut targets: Vec<usize> = Vec::with_capacity(num_nodes);
    let mut feature_triplets: Vec<(usize, usize, f32)> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        if row.features.len() != num_features {
            return Err(SweepError::MalformedDataset {
                path: content_path_str,
                reason: format!(
                    "node {} has {} features, expected {num_features}",
                    row.id,
                    row.features.len()
                ),
            });
        }
        index_of.insert(&row.id, i);
        let next_class = class_of.len();
        let class = *class_of.entry(&row.class_name).or_insert(next_class);
        targets.push(class);
        for (j, &v) in row.features.iter().enumerate() {
            if v != 0.0 {
                feature_triplets.push((i, j, v));
            }
        }
    }
    let num_classes = class_of.len();
    let features = SparseMatrix::from_triplets(num_nodes, num_features, feature_triplets);

    let mut edges: HashSet<(usize, usize)> = HashSet::new();
    let mut skipped = 0usize;
    for line in BufReader::new(File::open(&cites_path)?).lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != 2 {
            return Err(SweepError::MalformedDataset {
                path: cites_path.display().to_string(),
                reason: format!("cites line with {} fields", fields.len()),
            });
        }
        match (index_of.get(fields[0]), index_of.get(fields[1])) {
            (Some(&a), Some(&b)) if a != b => {
                edges.insert((a, b));
                edges.insert((b, a));
            }
            (Some(_), Some(_)) => {} // self-citation
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::warn!("{name}: skipped {skipped} citations referencing unknown node ids");
    }
    let adj = SparseMatrix::from_triplets(
        num_nodes,
        num_nodes,
        edges.into_iter().map(|(a, b)| (a, b, 1.0)).collect(),
    );

    let (train_mask, val_mask, test_mask) = planetoid_masks(num_nodes, num_classes);
    let y_train = masked_one_hot(&targets, num_classes, &train_mask);
    let y_val = masked_one_hot(&targets, num_classes, &val_mask);
    let y_test = masked_one_hot(&targets, num_classes, &test_mask);

    Ok(CitationData {
        adj,
        features,
        y_train,
        y_val,
        y_test,
        train_mask,
        val_mask,
        test_mask,
        num_nodes,
        num_features,
        num_classes,
    })
}
