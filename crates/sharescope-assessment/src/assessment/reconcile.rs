//! Reconciliation of audit batches against the drive inventory.
//!
//! [`reconcile`] is a pure function from one raw batch to a
//! [`ReconcileDelta`]; [`ReconciledLog::apply`] folds deltas into the
//! run-wide log.  Only `ItemType == "File"` records survive, and each is
//! annotated with the first inventory drive whose web URL it falls under.

use log::debug;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sharescope_graph::{decode_web_url, Drive, FileIdentity};
use std::collections::{BTreeMap, BTreeSet};

use crate::assessment::types::AccessEvent;

/// How an audit object URL is matched to a drive web URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriveMatch {
    /// Host must agree and the drive's decoded path segments must prefix
    /// the object's.
    #[default]
    SegmentPrefix,
    /// The decoded drive URL appears anywhere in the object URL.
    Substring,
}

/// Host and decoded path segments of a URL or bare path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathKey {
    pub host: Option<String>,
    pub segments: Vec<String>,
}

impl PathKey {
    pub fn parse(raw: &str) -> Self {
        match url::Url::parse(raw) {
            Ok(url) if url.has_host() => Self {
                host: url.host_str().map(str::to_ascii_lowercase),
                segments: url
                    .path_segments()
                    .map(|segs| decode_segments(segs))
                    .unwrap_or_default(),
            },
            _ => Self {
                host: None,
                segments: decode_segments(raw.split('/')),
            },
        }
    }

    /// Whether `self` (a drive) contains `other` (an object).
    pub fn is_prefix_of(&self, other: &PathKey) -> bool {
        if self.segments.is_empty() || self.segments.len() > other.segments.len() {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.host, &other.host) {
            if a != b {
                return false;
            }
        }
        self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

fn decode_segments<'s>(segments: impl Iterator<Item = &'s str>) -> Vec<String> {
    segments
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect()
}

struct DriveCandidate {
    id: String,
    decoded_url: String,
    key: PathKey,
}

/// Drive inventory prepared for matching.  Drives without a web URL never
/// match.
pub struct DriveMatcher {
    mode: DriveMatch,
    candidates: Vec<DriveCandidate>,
}

impl DriveMatcher {
    pub fn new(drives: &[Drive], mode: DriveMatch) -> Self {
        let candidates = drives
            .iter()
            .filter_map(|d| {
                let decoded_url = decode_web_url(d.web_url.as_deref()?);
                if decoded_url.is_empty() {
                    return None;
                }
                Some(DriveCandidate {
                    id: d.id.clone(),
                    key: PathKey::parse(&decoded_url),
                    decoded_url,
                })
            })
            .collect();
        Self { mode, candidates }
    }

    pub fn mode(&self) -> DriveMatch {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Id of the first drive, in inventory order, that contains `object_id`.
    pub fn match_drive(&self, object_id: &str) -> Option<&str> {
        let found = match self.mode {
            DriveMatch::Substring => self
                .candidates
                .iter()
                .find(|c| object_id.contains(c.decoded_url.as_str())),
            DriveMatch::SegmentPrefix => {
                let object = PathKey::parse(object_id);
                self.candidates.iter().find(|c| c.key.is_prefix_of(&object))
            }
        };
        found.map(|c| c.id.as_str())
    }
}

/// Result of reconciling one audit batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileDelta {
    /// Retained file events, annotated with their drive.
    pub events: Vec<AccessEvent>,
    pub actor_counts: BTreeMap<String, u64>,
    pub object_counts: BTreeMap<String, u64>,
    /// Records dropped by the item-type filter.
    pub dropped: usize,
}

/// Filter, count, and drive-annotate one batch of raw audit records.
pub fn reconcile(batch: &[Value], drives: &DriveMatcher) -> ReconcileDelta {
    let mut delta = ReconcileDelta::default();

    for record in batch {
        let mut event = AccessEvent::from_record(record);
        if !event.is_file() {
            delta.dropped += 1;
            continue;
        }

        *delta.actor_counts.entry(event.actor_id.clone()).or_insert(0) += 1;
        *delta.object_counts.entry(event.object_id.clone()).or_insert(0) += 1;
        event.drive_id = drives.match_drive(&event.object_id).map(str::to_string);
        delta.events.push(event);
    }

    debug!(
        "Reconciled batch: {} kept, {} dropped",
        delta.events.len(),
        delta.dropped
    );
    delta
}

/// Run-wide accumulation of reconciled events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciledLog {
    pub events: Vec<AccessEvent>,
    pub actor_counts: BTreeMap<String, u64>,
    pub object_counts: BTreeMap<String, u64>,
    pub event_count: u64,
    pub dropped: u64,
}

impl ReconciledLog {
    pub fn apply(mut self, delta: ReconcileDelta) -> Self {
        self.event_count += delta.events.len() as u64;
        self.dropped += delta.dropped as u64;
        merge_counts(&mut self.actor_counts, delta.actor_counts);
        merge_counts(&mut self.object_counts, delta.object_counts);
        self.events.extend(delta.events);
        self
    }

    /// Distinct accessed files, in key order.
    pub fn identities(&self) -> BTreeSet<FileIdentity> {
        self.events.iter().map(AccessEvent::identity).collect()
    }

    /// Most active actors, highest count first; ties by id.
    pub fn top_actors(&self, n: usize) -> Vec<(String, u64)> {
        top(&self.actor_counts, n)
    }

    /// Most accessed objects, highest count first; ties by URL.
    pub fn top_objects(&self, n: usize) -> Vec<(String, u64)> {
        top(&self.object_counts, n)
    }
}

fn merge_counts(into: &mut BTreeMap<String, u64>, from: BTreeMap<String, u64>) {
    for (key, count) in from {
        *into.entry(key).or_insert(0) += count;
    }
}

fn top(counts: &BTreeMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
