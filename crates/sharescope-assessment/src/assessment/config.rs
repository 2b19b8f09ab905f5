//! Assessment configuration.
//!
//! Loaded from a camelCase JSON file; every field has a default.  Credentials
//! may be supplied or overridden through `SHARESCOPE_*` environment variables.

use serde::{Deserialize, Serialize};
use sharescope_graph::{ClientCredentials, GraphConfig};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assessment::error::{AssessmentError, AssessmentResult};
use crate::assessment::reconcile::DriveMatch;

pub const ENV_TENANT_ID: &str = "SHARESCOPE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "SHARESCOPE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SHARESCOPE_CLIENT_SECRET";

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authority_host: String,
    pub graph_base_url: String,
    pub management_base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_sec: u64,
    /// Number of daily audit windows, counting back from the run start.
    pub lookback_days: u32,
    /// Overlap appended to the end of each window.  Default: 1.  The live
    /// audit API rejects listings spanning more than 24 hours, so set this
    /// to 0 against a real tenant.
    pub window_overlap_minutes: i64,
    pub drive_match: DriveMatch,
    /// Fetch per-site analytics during inventory.
    pub include_site_analytics: bool,
    pub report_path: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        let graph = GraphConfig::default();
        Self {
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            authority_host: graph.authority_host,
            graph_base_url: graph.graph_base_url,
            management_base_url: graph.management_base_url,
            timeout_sec: graph.timeout_sec,
            lookback_days: 7,
            window_overlap_minutes: 1,
            drive_match: DriveMatch::default(),
            include_site_analytics: true,
            report_path: PathBuf::from("assessment_report.json"),
            log_level: "info".into(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl fmt::Debug for AssessmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("graph_base_url", &self.graph_base_url)
            .field("management_base_url", &self.management_base_url)
            .field("lookback_days", &self.lookback_days)
            .field("window_overlap_minutes", &self.window_overlap_minutes)
            .field("drive_match", &self.drive_match)
            .field("report_path", &self.report_path)
            .finish_non_exhaustive()
    }
}

impl AssessmentConfig {
    /// Parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> AssessmentResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AssessmentError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AssessmentError::config(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// File (when given), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> AssessmentResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace credential fields with non-empty values from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields = [
            (ENV_TENANT_ID, &mut self.tenant_id),
            (ENV_CLIENT_ID, &mut self.client_id),
            (ENV_CLIENT_SECRET, &mut self.client_secret),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> AssessmentResult<()> {
        if self.tenant_id.is_empty() {
            return Err(AssessmentError::config("tenantId is required"));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AssessmentError::config(
                "clientId and clientSecret are required",
            ));
        }
        if self.lookback_days == 0 {
            return Err(AssessmentError::config("lookbackDays must be at least 1"));
        }
        if self.window_overlap_minutes < 0 {
            return Err(AssessmentError::config(
                "windowOverlapMinutes must not be negative",
            ));
        }
        for (name, value) in [
            ("authorityHost", &self.authority_host),
            ("graphBaseUrl", &self.graph_base_url),
            ("managementBaseUrl", &self.management_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AssessmentError::config(format!("{} is not a URL: {}", name, e)))?;
        }
        Ok(())
    }

    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            tenant_id: self.tenant_id.clone(),
            authority_host: self.authority_host.clone(),
            graph_base_url: self.graph_base_url.clone(),
            management_base_url: self.management_base_url.clone(),
            timeout_sec: self.timeout_sec,
        }
    }

    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(self.client_id.clone(), self.client_secret.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AssessmentConfig {
        AssessmentConfig {
            tenant_id: "contoso".into(),
            client_id: "app".into(),
            client_secret: "s3cret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = AssessmentConfig::default();
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.window_overlap_minutes, 1);
        assert_eq!(config.timeout_sec, 60);
        assert_eq!(config.drive_match, DriveMatch::SegmentPrefix);
        assert!(config.include_site_analytics);
        assert_eq!(config.report_path, PathBuf::from("assessment_report.json"));
    }

    #[test]
    fn test_from_file_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "tenantId": "contoso", "lookbackDays": 3, "driveMatch": "substring" }}"#
        )
        .unwrap();

        let config = AssessmentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tenant_id, "contoso");
        assert_eq!(config.lookback_days, 3);
        assert_eq!(config.drive_match, DriveMatch::Substring);
        assert_eq!(config.graph_base_url, "https://graph.microsoft.com/v1.0");
    }

    #[test]
    fn test_from_file_errors() {
        let missing = AssessmentConfig::from_file("/nonexistent/sharescope.json");
        assert!(matches!(missing, Err(AssessmentError::Config(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let invalid = AssessmentConfig::from_file(file.path());
        assert!(matches!(invalid, Err(AssessmentError::Config(_))));
    }

    #[test]
    fn test_overrides_replace_non_empty_values_only() {
        let mut config = valid();
        config.apply_overrides(|key| match key {
            ENV_CLIENT_SECRET => Some("from-env".into()),
            ENV_CLIENT_ID => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.client_secret, "from-env");
        assert_eq!(config.client_id, "app");
        assert_eq!(config.tenant_id, "contoso");
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut no_tenant = valid();
        no_tenant.tenant_id.clear();
        assert!(no_tenant.validate().is_err());

        let mut no_days = valid();
        no_days.lookback_days = 0;
        assert!(no_days.validate().is_err());

        let mut bad_url = valid();
        bad_url.graph_base_url = "not a url".into();
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_graph_config_and_credentials() {
        let config = valid();
        let graph = config.graph_config();
        assert_eq!(graph.tenant_id, "contoso");
        assert_eq!(graph.management_base_url, "https://manage.office.com");
        assert_eq!(config.credentials().secret(), "s3cret");
    }
}
