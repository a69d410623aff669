//! JQL builders for the ticket lists shown by the tracker.

/// Statuses hidden from the in-progress list when no explicit status filter is configured.
pub const DEFAULT_EXCLUDED_STATUSES: [&str; 7] = [
    "Done",
    "Canceled",
    "Cancelled",
    "Closed",
    "To Do",
    "New",
    "Open",
];

/// Lookback window for recently finished tickets.
pub const DONE_LOOKBACK: &str = "-7d";

/// User-configured narrowing of the in-progress list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketFilters {
    pub statuses: Vec<String>,
    pub issue_types: Vec<String>,
}

impl TicketFilters {
    /// Builds filters from the comma separated strings kept in settings.
    pub fn from_csv(statuses: &str, issue_types: &str) -> Self {
        Self {
            statuses: split_csv(statuses),
            issue_types: split_csv(issue_types),
        }
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tickets assigned to the current credential's identity that are still being worked on.
pub fn in_progress(filters: &TicketFilters) -> String {
    let mut jql = String::from("assignee = currentUser()");

    if filters.statuses.is_empty() {
        let excluded = DEFAULT_EXCLUDED_STATUSES
            .iter()
            .map(|status| format!("'{}'", status))
            .collect::<Vec<_>>()
            .join(", ");
        jql.push_str(&format!(" AND status not in ({})", excluded));
    } else {
        jql.push_str(&format!(" AND status in ({})", quoted_list(&filters.statuses)));
    }

    if !filters.issue_types.is_empty() {
        jql.push_str(&format!(
            " AND issuetype in ({})",
            quoted_list(&filters.issue_types)
        ));
    }

    jql.push_str(" ORDER BY updated DESC");
    jql
}

pub fn done() -> String {
    format!(
        "status = 'Done' AND assignee = currentUser() AND updated >= {} ORDER BY updated DESC",
        DONE_LOOKBACK
    )
}

/// `None` for an empty key list; callers skip the request entirely.
pub fn by_keys(keys: &[String]) -> Option<String> {
    let keys: Vec<&str> = keys
        .iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .collect();
    if keys.is_empty() {
        return None;
    }
    Some(format!("key in ({})", keys.join(",")))
}

/// Broad net for issues the user may have logged time on recently.
pub fn recently_updated() -> String {
    "updated >= -30d ORDER BY updated DESC".to_string()
}
