//! Search response models and the normalized ticket shape used by the rest of the app.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: RawFields,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawFields {
    pub summary: Option<String>,
    pub timespent: Option<u64>,
    pub issuetype: Option<RawIssueType>,
    pub status: Option<RawStatus>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawIssueType {
    pub name: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawStatus {
    pub name: Option<String>,
    pub status_category: Option<RawStatusCategory>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawStatusCategory {
    pub key: Option<String>,
    pub color_name: Option<String>,
}

/// Coarse three-way status classification Jira assigns to every status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    New,
    Indeterminate,
    Done,
}

impl StatusCategory {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "new" => Some(StatusCategory::New),
            "indeterminate" => Some(StatusCategory::Indeterminate),
            "done" => Some(StatusCategory::Done),
            _ => None,
        }
    }

    /// Fixed display colors. Unknown categories share the `new` color.
    pub fn color(category: Option<Self>) -> &'static str {
        match category {
            Some(StatusCategory::Indeterminate) => "amber",
            Some(StatusCategory::Done) => "green",
            Some(StatusCategory::New) | None => "slate",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    pub name: String,
    pub icon_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicketStatus {
    pub name: String,
    pub category_color: String,
    pub category_key: String,
}

/// Read-only ticket snapshot. `time_spent_seconds` is whatever the tracker reports.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub time_spent_seconds: u64,
    pub issue_type: IssueType,
    pub status: TicketStatus,
}

impl From<RawIssue> for Ticket {
    fn from(issue: RawIssue) -> Self {
        let fields = issue.fields;
        let issue_type = fields.issuetype.unwrap_or(RawIssueType {
            name: None,
            icon_url: None,
        });
        let (status_name, category_key) = match fields.status {
            Some(status) => (
                status.name,
                status.status_category.and_then(|category| category.key),
            ),
            None => (None, None),
        };
        let category_key = category_key.unwrap_or_default();
        let category = StatusCategory::from_key(&category_key);

        Ticket {
            id: issue.id,
            key: issue.key,
            summary: fields.summary.unwrap_or_default(),
            time_spent_seconds: fields.timespent.unwrap_or(0),
            issue_type: IssueType {
                name: issue_type.name.unwrap_or_else(|| "Unknown".to_string()),
                icon_url: issue_type.icon_url.unwrap_or_default(),
            },
            status: TicketStatus {
                name: status_name.unwrap_or_else(|| "Unknown".to_string()),
                category_color: StatusCategory::color(category).to_string(),
                category_key,
            },
        }
    }
}
