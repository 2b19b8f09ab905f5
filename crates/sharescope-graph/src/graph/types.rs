//! Shared types for the tenant inventory, audit, and enrichment calls.
//!
//! Models cover configuration and credentials, OAuth2 tokens, sites, drives,
//! users, drive items, permissions, sharing links, and the identities and
//! outcomes produced by batch enrichment.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::graph::error::GraphResult;

// ═══════════════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Endpoint configuration for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
    /// Entra ID tenant ID (GUID or verified domain).
    pub tenant_id: String,
    /// Identity platform host.  Default: `https://login.microsoftonline.com`.
    pub authority_host: String,
    /// Resource API base URL.  Default: `https://graph.microsoft.com/v1.0`.
    pub graph_base_url: String,
    /// Audit API base URL.  Default: `https://manage.office.com`.
    pub management_base_url: String,
    /// Timeout in seconds for HTTP calls.  Default: 60.
    pub timeout_sec: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            tenant_id: String::new(),
            authority_host: "https://login.microsoftonline.com".into(),
            graph_base_url: "https://graph.microsoft.com/v1.0".into(),
            management_base_url: "https://manage.office.com".into(),
            timeout_sec: 60,
        }
    }
}

/// Application credentials for the client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }

    pub fn secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  OAuth2 / Authentication
// ═══════════════════════════════════════════════════════════════════════

/// Which API a token is minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenScope {
    /// Resource API (sites, drives, users, `$batch`).
    Graph,
    /// Management Activity API (audit content).
    Management,
}

impl TokenScope {
    /// The `.default` scope string for this API, derived from the configured
    /// base URL's origin.
    pub fn scope_string(&self, config: &GraphConfig) -> GraphResult<String> {
        let base = match self {
            Self::Graph => &config.graph_base_url,
            Self::Management => &config.management_base_url,
        };
        let origin = url::Url::parse(base)?.origin().ascii_serialization();
        Ok(format!("{}/.default", origin))
    }
}

/// Bearer token returned by the client-credentials exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub scope: TokenScope,
}

impl AccessToken {
    /// Whether the access token has expired (with 60-second grace).
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - chrono::Duration::seconds(60)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Inventory: sites, drives, users
// ═══════════════════════════════════════════════════════════════════════

/// Descriptive inventory text: numbers and booleans are kept as text, any
/// other non-string value reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// A collaboration site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Site {
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub web_url: Option<String>,
}

impl Site {
    /// Short name used in share labels; falls back to the display name.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or_default()
    }
}

/// A document library (drive) inside a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Drive {
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub drive_type: Option<String>,
    /// Percent-encoded web URL; decode before comparing with audit paths.
    #[serde(deserialize_with = "lenient_text")]
    pub web_url: Option<String>,
}

/// An organizational account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub display_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub user_principal_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub mail: Option<String>,
}

/// All-time access statistics for a site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAnalytics {
    pub site_id: String,
    pub access_action_count: i64,
    pub access_actor_count: i64,
}

/// A drive flattened into a share record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfo {
    /// Drive ID.
    pub reference_id: String,
    /// `<site>-<drive>` label.
    pub share: String,
    /// Decoded drive web URL.
    pub share_path: String,
}

// ═══════════════════════════════════════════════════════════════════════
//  Drive Items
// ═══════════════════════════════════════════════════════════════════════

/// The subset of a drive item the assessment reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveItemSummary {
    pub id: String,
    pub name: Option<String>,
    pub size: Option<i64>,
    pub web_url: Option<String>,
    pub folder: Option<FolderInfo>,
    pub file: Option<FileInfo>,
}

impl DriveItemSummary {
    /// Size in bytes; negative or absent sizes count as zero.
    pub fn size_bytes(&self) -> u64 {
        self.size.unwrap_or(0).max(0) as u64
    }
}

/// Folder-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolderInfo {
    pub child_count: Option<i32>,
}

/// File-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileInfo {
    pub mime_type: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Identity
// ═══════════════════════════════════════════════════════════════════════

/// A set of identities (user, application, device).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySet {
    pub application: Option<Identity>,
    pub device: Option<Identity>,
    pub user: Option<Identity>,
}

/// A single identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Permissions & Sharing
// ═══════════════════════════════════════════════════════════════════════

/// A raw permission on a drive item, as returned by the permissions endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permission {
    pub id: Option<String>,
    pub roles: Option<Vec<String>>,
    pub granted_to: Option<IdentitySet>,
    #[serde(rename = "grantedToV2")]
    pub granted_to_v2: Option<IdentitySet>,
    pub link: Option<SharingLink>,
    pub inherited_from: Option<serde_json::Value>,
}

/// Sharing link details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharingLink {
    pub scope: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    pub web_url: Option<String>,
}

/// One access-control entry, flattened for the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    /// Display name of the grantee, or its raw id when no name is present.
    pub subject: String,
    /// First listed role, or empty.
    pub role: String,
    /// Every listed role, comma-joined.
    pub mask: String,
}

/// One shareable link on an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingLinkInfo {
    pub url: String,
    pub link_type: String,
    pub scope: String,
}

// ═══════════════════════════════════════════════════════════════════════
//  Enrichment
// ═══════════════════════════════════════════════════════════════════════

/// Deduplication key for one accessed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIdentity {
    pub site_id: String,
    pub list_id: String,
    pub list_item_unique_id: String,
    /// Empty when no drive matched the audit event.
    pub drive_id: String,
}

/// Item detail with its permissions and sharing links attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub item: DriveItemSummary,
    pub permissions: Vec<PermissionGrant>,
    pub links: Vec<SharingLinkInfo>,
}

impl FileDetail {
    pub fn size(&self) -> u64 {
        self.item.size_bytes()
    }
}

/// Result of enriching a single identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EnrichmentOutcome {
    Resolved {
        identity: FileIdentity,
        detail: FileDetail,
    },
    /// A sub-response came back without a usable body.
    Unresolved {
        identity: FileIdentity,
        reason: String,
    },
}

impl EnrichmentOutcome {
    pub fn identity(&self) -> &FileIdentity {
        match self {
            Self::Resolved { identity, .. } | Self::Unresolved { identity, .. } => identity,
        }
    }

    pub fn detail(&self) -> Option<&FileDetail> {
        match self {
            Self::Resolved { detail, .. } => Some(detail),
            Self::Unresolved { .. } => None,
        }
    }
}

/// A directory child with its permissions merged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub item: DriveItemSummary,
    pub permissions: Vec<PermissionGrant>,
    pub links: Vec<SharingLinkInfo>,
}

impl DirectoryEntry {
    /// Path separator used when composing entry paths.
    pub const SEPARATOR: char = '/';

    pub fn is_directory(&self) -> bool {
        self.item.folder.is_some()
    }

    pub fn file_name(&self) -> &str {
        self.item.name.as_deref().unwrap_or_default()
    }
}

/// Children of one folder (or a whole drive walk).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub entries: Vec<DirectoryEntry>,
    /// Children whose permission sub-response had no body.
    pub unresolved: usize,
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
