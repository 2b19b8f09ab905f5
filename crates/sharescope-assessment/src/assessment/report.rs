//! Assessment report and its renderers.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use sharescope_graph::{FileIdentity, SiteAnalytics};
use std::path::{Path, PathBuf};

use crate::assessment::aggregate::RiskTally;
use crate::assessment::error::{AssessmentError, AssessmentResult};
use crate::assessment::windows::TimeWindow;

/// Occurrence count for one actor or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCount {
    pub key: String,
    pub count: u64,
}

impl From<(String, u64)> for RankedCount {
    fn from((key, count): (String, u64)) -> Self {
        Self { key, count }
    }
}

/// Everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentReport {
    pub tenant_id: String,
    pub generated_at: DateTime<Utc>,
    pub windows: Vec<TimeWindow>,
    pub site_count: usize,
    pub drive_count: usize,
    pub user_count: usize,
    /// Inventory records left out because they could not be decoded.
    pub skipped_records: usize,
    pub site_analytics: Vec<SiteAnalytics>,
    pub distinct_files: usize,
    pub tally: RiskTally,
    pub top_actors: Vec<RankedCount>,
    pub top_objects: Vec<RankedCount>,
    pub unresolved: Vec<FileIdentity>,
}

/// Writes a report to `path` and returns where it ended up.
pub trait ReportRenderer {
    fn render(&self, report: &AssessmentReport, path: &Path) -> AssessmentResult<PathBuf>;
}

/// Pretty-printed JSON summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    fn render(&self, report: &AssessmentReport, path: &Path) -> AssessmentResult<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AssessmentError::report(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(path, json)?;
        info!("Report written to {}", path.display());
        Ok(path.to_path_buf())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
