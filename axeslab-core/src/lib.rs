//! AxesLab Core: statistical primitives for dataset drift and pattern quality.
//!
//! This crate contains the pure computations of the metrics engine:
//! - In-memory table model with inferred column kinds
//! - `Metric` tagged value separating "not available" from "ran and found zero"
//! - Population stability index over shared equal-width bins
//! - Kernel-density dip approximation for unimodality
//! - Seeded k-means and the clustering-based density scorer
//! - Shape, temporal and two-sample KS statistics
//!
//! Nothing here performs I/O or holds process-wide state; every entry point
//! takes its configuration explicitly.

pub mod density;
pub mod dip;
pub mod kmeans;
pub mod ks;
pub mod metric;
pub mod psi;
pub mod rng;
pub mod sample;
pub mod shape;
pub mod table;
pub mod temporal;

pub use density::{compute_density_metrics, DensityConfig, DensityMetrics};
pub use dip::{approximate_dip, is_unimodal, DipConfig, MIN_DIP_SAMPLES};
pub use kmeans::{KMeansConfig, KMeansError, KMeansFit};
pub use ks::{ks_p_value, ks_statistic};
pub use metric::{Metric, Unavailable};
pub use psi::{population_stability_index, windowed_trigger_rate, BinHistogram, PsiConfig};
pub use rng::{standard_normal, SeedHierarchy};
pub use shape::{compute_shape_metrics, ShapeConfig, ShapeMetrics};
pub use table::{Column, ColumnData, ColumnKind, Dataset, TableError};
pub use temporal::{compute_temporal_metrics, PsiMode, TemporalConfig, TemporalMetrics};
