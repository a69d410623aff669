//! Identity and permission models returned by Jira's user-scoped endpoints.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
/// The identity behind the configured credentials (`GET /myself`).
pub struct Myself {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
    /// Server/DC installations identify users by `name`/`key` instead of `accountId`.
    pub name: Option<String>,
    pub key: Option<String>,
}

impl Myself {
    /// Returns the best available stable identifier for matching worklog authors.
    pub fn identity(&self) -> Option<String> {
        self.account_id
            .clone()
            .or_else(|| self.key.clone())
            .or_else(|| self.name.clone())
    }
}

/// Response of `GET /mypermissions`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PermissionsResponse {
    #[serde(default)]
    pub permissions: HashMap<String, PermissionGrant>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    #[serde(default)]
    pub have_permission: bool,
}

impl PermissionsResponse {
    pub fn has(&self, permission: &str) -> bool {
        self.permissions
            .get(permission)
            .map(|grant| grant.have_permission)
            .unwrap_or(false)
    }
}
