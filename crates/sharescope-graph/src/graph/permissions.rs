//! Flattening raw permission records into grants and sharing links.

use serde_json::Value;

use crate::graph::pager::decode_records;
use crate::graph::types::{IdentitySet, Permission, PermissionGrant, SharingLinkInfo};

/// Parse a permissions `value` array.  Records that fail to deserialize are
/// logged and skipped; missing fields default to empty strings.
pub fn parse_permissions(values: &[Value]) -> Vec<Permission> {
    decode_records(values, "permissions").0
}

/// One grant per permission record.
pub fn grants(permissions: &[Permission]) -> Vec<PermissionGrant> {
    permissions.iter().map(grant).collect()
}

/// Sharing links carried by permission records with `link` metadata.
pub fn sharing_links(permissions: &[Permission]) -> Vec<SharingLinkInfo> {
    permissions
        .iter()
        .filter_map(|p| p.link.as_ref())
        .map(|link| SharingLinkInfo {
            url: link.web_url.clone().unwrap_or_default(),
            link_type: link.link_type.clone().unwrap_or_default(),
            scope: link.scope.clone().unwrap_or_default(),
        })
        .collect()
}

/// Grants and links from a permissions response body.
pub fn from_body(body: &Value) -> (Vec<PermissionGrant>, Vec<SharingLinkInfo>) {
    let raw = body["value"]
        .as_array()
        .map(|arr| parse_permissions(arr))
        .unwrap_or_default();
    (grants(&raw), sharing_links(&raw))
}

fn grant(permission: &Permission) -> PermissionGrant {
    let roles = permission.roles.as_deref().unwrap_or_default();
    PermissionGrant {
        subject: subject(permission),
        role: roles.first().cloned().unwrap_or_default(),
        mask: roles.join(","),
    }
}

fn subject(permission: &Permission) -> String {
    [&permission.granted_to, &permission.granted_to_v2]
        .into_iter()
        .flatten()
        .find_map(user_label)
        .unwrap_or_default()
}

fn user_label(set: &IdentitySet) -> Option<String> {
    let user = set.user.as_ref()?;
    user.display_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(user.id.as_deref().filter(|id| !id.is_empty()))
        .map(str::to_string)
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
