//! # sharescope-assessment: sharing-exposure assessment
//!
//! Turns a connected [`sharescope_graph::GraphSession`] into an exposure
//! report: daily audit windows are reconciled against the drive inventory,
//! each distinct accessed file is enriched once, and the results are folded
//! into a [`RiskTally`].

pub mod error;
pub mod config;
pub mod types;
pub mod windows;
pub mod reconcile;
pub mod aggregate;
pub mod report;
pub mod run;

// Re-exports
pub use aggregate::RiskTally;
pub use config::{AssessmentConfig, LogFormat};
pub use error::{AssessmentError, AssessmentResult};
pub use reconcile::{reconcile, DriveMatch, DriveMatcher, PathKey, ReconcileDelta, ReconciledLog};
pub use report::{AssessmentReport, JsonReportRenderer, RankedCount, ReportRenderer};
pub use run::AssessmentRun;
pub use types::{AccessEvent, Inventory};
pub use windows::{daily_windows, TimeWindow};
