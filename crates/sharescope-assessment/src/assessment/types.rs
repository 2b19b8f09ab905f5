//! Audit events and the tenant inventory they are reconciled against.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sharescope_graph::{Drive, FileIdentity, Site, SiteAnalytics, User};

/// Item type of retained audit records.
pub const FILE_ITEM_TYPE: &str = "File";

/// One audit record, reduced to the fields the assessment reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    pub actor_id: String,
    /// Full URL of the accessed object.
    pub object_id: String,
    pub item_type: String,
    pub site_id: String,
    pub list_id: String,
    pub list_item_unique_id: String,
    pub creation_time: String,
    pub operation: String,
    /// Set by reconciliation when a drive matches the object URL.
    pub drive_id: Option<String>,
}

impl AccessEvent {
    /// Read an audit record.  Missing fields become empty strings.
    pub fn from_record(v: &Value) -> Self {
        let field = |key: &str| v[key].as_str().unwrap_or_default().to_string();
        Self {
            actor_id: field("UserId"),
            object_id: field("ObjectId"),
            item_type: field("ItemType"),
            site_id: field("Site"),
            list_id: field("ListId"),
            list_item_unique_id: field("ListItemUniqueId"),
            creation_time: field("CreationTime"),
            operation: field("Operation"),
            drive_id: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.item_type == FILE_ITEM_TYPE
    }

    /// Deduplication key; an unmatched event carries an empty drive id.
    pub fn identity(&self) -> FileIdentity {
        FileIdentity {
            site_id: self.site_id.clone(),
            list_id: self.list_id.clone(),
            list_item_unique_id: self.list_item_unique_id.clone(),
            drive_id: self.drive_id.clone().unwrap_or_default(),
        }
    }
}

/// Sites, drives, and users fetched once at the start of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub sites: Vec<Site>,
    /// Drives of every site, in site order then listing order.
    pub drives: Vec<Drive>,
    pub users: Vec<User>,
    pub site_analytics: Vec<SiteAnalytics>,
    /// Collection records that could not be decoded and were left out.
    #[serde(default)]
    pub skipped_records: usize,
}

impl Inventory {
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn drive_count(&self) -> usize {
        self.drives.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_record() {
        let event = AccessEvent::from_record(&json!({
            "UserId": "ada@contoso.com",
            "ObjectId": "https://contoso.sharepoint.com/sites/Eng/Docs/a.docx",
            "ItemType": "File",
            "Site": "s1",
            "ListId": "l1",
            "ListItemUniqueId": "i1",
            "CreationTime": "2024-03-01T10:00:00",
            "Operation": "FileAccessed"
        }));
        assert!(event.is_file());
        assert_eq!(event.actor_id, "ada@contoso.com");
        assert_eq!(event.operation, "FileAccessed");
        assert!(event.drive_id.is_none());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let event = AccessEvent::from_record(&json!({ "ItemType": "Folder" }));
        assert!(!event.is_file());
        assert_eq!(event.object_id, "");
        assert_eq!(
            event.identity(),
            FileIdentity {
                site_id: String::new(),
                list_id: String::new(),
                list_item_unique_id: String::new(),
                drive_id: String::new(),
            }
        );
    }

    #[test]
    fn test_item_type_is_case_sensitive() {
        let event = AccessEvent::from_record(&json!({ "ItemType": "file" }));
        assert!(!event.is_file());
    }
}
