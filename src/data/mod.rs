//! Data ingestion: CSV loading, normalization, the columnar frame and
//! statistics helpers.

pub mod frame;
pub mod loader;
pub mod normalize;
pub mod stats;

pub use loader::{load_csv, RawTable};
pub use normalize::{normalize, normalize_with};
