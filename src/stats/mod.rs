pub mod metrics;
pub mod normalizer;

pub use normalizer::{normalize, Averages, DatasetStatistics, NormalizedListing};
