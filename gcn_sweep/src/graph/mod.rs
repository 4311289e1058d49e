pub mod data;
pub mod dataset;
pub mod error;
pub mod export;
pub mod model;
pub mod preprocess;
pub mod sparse;
pub mod train;
