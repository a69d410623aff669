use serde::{Deserialize, Serialize};

/// Duration payload of a worklog. Jira accepts either a second count or its own
/// duration grammar ("2h 30m"), under different body keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TimeSpent {
    #[serde(rename = "timeSpentSeconds")]
    Seconds(u64),
    #[serde(rename = "timeSpent")]
    Text(String),
}

#[derive(Debug, Serialize)]
pub(crate) struct WorklogCreateRequest {
    #[serde(flatten)]
    pub time_spent: TimeSpent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<RichTextDocument>,
}

/// Atlassian document format envelope: a single paragraph of plain text.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RichTextDocument {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: u8,
    pub content: Vec<RichTextNode>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RichTextNode>,
}

impl RichTextDocument {
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text_node = RichTextNode {
            kind: "text",
            text: Some(text.into()),
            content: Vec::new(),
        };
        Self {
            kind: "doc",
            version: 1,
            content: vec![RichTextNode {
                kind: "paragraph",
                text: None,
                content: vec![text_node],
            }],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorklogList {
    #[serde(default)]
    pub worklogs: Vec<WorklogEntry>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorklogEntry {
    pub author: Option<WorklogAuthor>,
    pub started: Option<String>,
    #[serde(default)]
    pub time_spent_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WorklogAuthor {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    /// Server/DC identifiers.
    pub name: Option<String>,
    pub key: Option<String>,
}

impl WorklogAuthor {
    fn matches(&self, identity: &str) -> bool {
        [&self.account_id, &self.key, &self.name]
            .into_iter()
            .any(|candidate| candidate.as_deref() == Some(identity))
    }
}

impl WorklogEntry {
    /// Calendar date part of `started` ("2026-01-14T08:00:00.000+0100" -> "2026-01-14").
    pub fn started_date(&self) -> Option<&str> {
        self.started
            .as_deref()
            .and_then(|value| value.split('T').next())
            .filter(|value| !value.is_empty())
    }

    /// `identity` is a cloud account id or a Server/DC user key or name.
    pub fn is_authored_by(&self, identity: &str) -> bool {
        self.author
            .as_ref()
            .is_some_and(|author| author.matches(identity))
    }
}
