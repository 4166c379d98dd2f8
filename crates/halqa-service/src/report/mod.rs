//! Projection of attendance verdicts into per-kind session reports.

pub mod sync;

pub use sync::ReportSynchronizer;
