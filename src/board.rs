//! Pinned, in-progress and recently done ticket lists for one refresh.

use crate::config::Settings;
use jira_api::{JiraClient, Ticket};
use log::{debug, warn};

/// Snapshot of the three lists shown to the user. A pinned ticket appears only in
/// `pinned`, even when it also matches the in-progress or done queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketBoard {
    pub pinned: Vec<Ticket>,
    pub in_progress: Vec<Ticket>,
    pub done: Vec<Ticket>,
}

impl TicketBoard {
    /// Runs the three queries concurrently. Only the in-progress list is required; a
    /// failing pinned or done query is logged and leaves that list empty.
    pub async fn load(client: &JiraClient, settings: &Settings) -> jira_api::Result<Self> {
        let filters = settings.filters();
        let (pinned, in_progress, done) = tokio::join!(
            client.fetch_by_keys(&settings.pinned_ticket_keys),
            client.fetch_in_progress(&filters),
            client.fetch_done(),
        );

        let pinned = pinned.unwrap_or_else(|err| {
            warn!("Failed to load pinned tickets: {}", err);
            Vec::new()
        });
        let done = done.unwrap_or_else(|err| {
            warn!("Failed to load done tickets: {}", err);
            Vec::new()
        });
        let board = Self::assemble(&settings.pinned_ticket_keys, pinned, in_progress?, done);
        debug!(
            "Loaded board: {} pinned, {} in progress, {} done",
            board.pinned.len(),
            board.in_progress.len(),
            board.done.len()
        );
        Ok(board)
    }

    /// Orders pinned tickets as the user pinned them and removes them from the other lists.
    pub fn assemble(
        pinned_keys: &[String],
        mut pinned: Vec<Ticket>,
        mut in_progress: Vec<Ticket>,
        mut done: Vec<Ticket>,
    ) -> Self {
        let position = |key: &str| {
            pinned_keys
                .iter()
                .position(|pinned| pinned.eq_ignore_ascii_case(key))
                .unwrap_or(usize::MAX)
        };
        pinned.sort_by_key(|ticket| position(&ticket.key));

        let is_pinned = |ticket: &Ticket| pinned.iter().any(|p| p.id == ticket.id);
        in_progress.retain(|ticket| !is_pinned(ticket));
        done.retain(|ticket| !is_pinned(ticket));

        Self {
            pinned,
            in_progress,
            done,
        }
    }

    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.pinned
            .iter()
            .chain(self.in_progress.iter())
            .chain(self.done.iter())
    }

    /// Case-insensitive lookup by key across all lists.
    pub fn find(&self, key: &str) -> Option<&Ticket> {
        self.tickets()
            .find(|ticket| ticket.key.eq_ignore_ascii_case(key.trim()))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Ticket> {
        self.tickets().find(|ticket| ticket.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.tickets().next().is_none()
    }
}
