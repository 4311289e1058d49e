use crate::graph::error::SweepError;
use crate::graph::preprocess::ModelVariant;
use crate::graph::train::{MetricsTable, METRIC_COLUMNS};
use std::path::{Path, PathBuf};

/// `<output_dir>/<dataset>_<model>_testAdj.csv`.
pub fn output_path(output_dir: &Path, dataset: &str, variant: ModelVariant) -> PathBuf {
    output_dir.join(format!("{dataset}_{variant}_testAdj.csv"))
}

/// Writes the averaged table with a `Epoch,cost,accuracy,time` header and
/// no index column, overwriting any existing file. The parent directory
/// must already exist; a missing directory is a fatal error.
pub fn export_csv(table: &MetricsTable, path: &Path) -> Result<(), SweepError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(METRIC_COLUMNS)?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
