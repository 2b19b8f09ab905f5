//! Risk totals folded from enrichment outcomes.

use serde::{Deserialize, Serialize};
use sharescope_graph::EnrichmentOutcome;

/// Run-wide exposure totals.  Every field only grows during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskTally {
    /// Retained file events across all windows.
    pub total_events: u64,
    /// Bytes held by resolved files.
    pub total_size: u64,
    pub sharing_links: u64,
    pub permissions: u64,
    pub resolved: u64,
    /// Identities whose lookup returned no usable body.
    pub unresolved: u64,
}

impl RiskTally {
    pub fn with_events(total_events: u64) -> Self {
        Self {
            total_events,
            ..Self::default()
        }
    }

    pub fn fold(self, outcome: &EnrichmentOutcome) -> Self {
        match outcome.detail() {
            Some(detail) => Self {
                total_size: self.total_size.saturating_add(detail.size()),
                sharing_links: self.sharing_links.saturating_add(detail.links.len() as u64),
                permissions: self.permissions.saturating_add(detail.permissions.len() as u64),
                resolved: self.resolved.saturating_add(1),
                ..self
            },
            None => Self {
                unresolved: self.unresolved.saturating_add(1),
                ..self
            },
        }
    }

    /// Identities looked up, resolved or not.
    pub fn enriched(&self) -> u64 {
        self.resolved.saturating_add(self.unresolved)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
