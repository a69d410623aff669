//! Timer session controller: start, stop, retry, discard and manual worklogs for one
//! user, on top of the shared [`TimerStore`] and a [`WorklogApi`].
//!
//! State lives in the store, not here: `Idle` means the store holds no timer, `Running`
//! means it holds one. A failed save leaves the timer in the store so the user can retry
//! or discard it.

use crate::duration::{format_duration, parse_duration};
use crate::timer::{ActiveTimer, StoreError, TimerStore};
use jira_api::{JiraClient, JiraError, TimeSpent};
use log::{info, warn};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Jira rejects zero-length worklogs; anything shorter is rounded up to one minute.
pub const MINIMUM_WORKLOG_SECONDS: u64 = 60;
/// Durations at or above this trigger the touch-grass advisory.
pub const TOUCH_GRASS_SECONDS: u64 = 8 * 3600;

pub const SAVE_LABEL: &str = "Stop & Save";
pub const RETRY_LABEL: &str = "Retry Save";

/// The two remote calls the controller needs. Implemented by [`JiraClient`]; tests
/// substitute an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait WorklogApi {
    /// `Ok(false)` is an explicit denial, `Err` means the check could not be made.
    async fn check_permission(&self, ticket_key: &str) -> jira_api::Result<bool>;

    async fn submit_worklog(
        &self,
        ticket_id: &str,
        time_spent: &TimeSpent,
        comment: Option<&str>,
    ) -> jira_api::Result<()>;
}

impl WorklogApi for JiraClient {
    async fn check_permission(&self, ticket_key: &str) -> jira_api::Result<bool> {
        JiraClient::check_permission(self, ticket_key).await
    }

    async fn submit_worklog(
        &self,
        ticket_id: &str,
        time_spent: &TimeSpent,
        comment: Option<&str>,
    ) -> jira_api::Result<()> {
        JiraClient::submit_worklog(self, ticket_id, time_spent, comment).await
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    ValidationFailed(String),
    #[error("you do not have permission to log work on {ticket_key}")]
    PermissionDenied { ticket_key: String },
    #[error("could not verify permission for {ticket_key}: {message}")]
    PermissionCheckFailed { ticket_key: String, message: String },
    #[error("failed to save worklog: {message}")]
    SubmissionFailed { status: Option<u16>, message: String },
    #[error("no timer is running")]
    NotRunning,
    #[error("a request for {0} is already in progress")]
    Busy(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    fn submission(err: JiraError) -> Self {
        SessionError::SubmissionFailed {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }

    /// Errors the user can override (proceed anyway) rather than just report.
    pub fn is_user_arbitrated(&self) -> bool {
        matches!(self, SessionError::PermissionCheckFailed { .. })
    }
}

/// Non-blocking notice attached to a successful (or attempted) submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advisory {
    TouchGrass { seconds: u64 },
}

impl Advisory {
    pub fn for_duration(seconds: u64) -> Option<Self> {
        (seconds >= TOUCH_GRASS_SECONDS).then_some(Advisory::TouchGrass { seconds })
    }

    pub fn message(&self) -> String {
        match self {
            Advisory::TouchGrass { seconds } => format!(
                "Whoa, that's {}! Go touch some grass. (Saving your time anyway...)",
                format_duration(*seconds)
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running(ActiveTimer),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopOutcome {
    pub ticket_id: String,
    pub elapsed_seconds: u64,
    pub submitted_seconds: u64,
    pub advisory: Option<Advisory>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManualLogOutcome {
    pub ticket_id: String,
    pub duration_text: String,
    /// Local reading of the text; 0 when only Jira's grammar understands it.
    pub parsed_seconds: u64,
    pub advisory: Option<Advisory>,
}

/// Tracked time the user explicitly chose to throw away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discarded {
    pub timer: ActiveTimer,
    pub lost_seconds: u64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a ticket as having a request outstanding until dropped.
struct InFlight<'a> {
    tickets: &'a Mutex<HashSet<String>>,
    ticket_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.tickets).remove(&self.ticket_id);
    }
}

pub struct TimerSession<S, A> {
    store: Arc<S>,
    api: A,
    description: Mutex<Option<String>>,
    last_error: Mutex<Option<String>>,
    error_file: Option<PathBuf>,
    in_flight: Mutex<HashSet<String>>,
}

impl<S, A> TimerSession<S, A>
where
    S: TimerStore,
    A: WorklogApi,
{
    pub fn new(store: Arc<S>, api: A) -> Self {
        Self {
            store,
            api,
            description: Mutex::new(None),
            last_error: Mutex::new(None),
            error_file: None,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Mirrors the last save error to `path` so later instances still offer a retry.
    /// A stored error is only picked up while a timer is running.
    pub fn with_error_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let running = matches!(self.store.read(), Ok(Some(_)));
        *lock(&self.last_error) = if running { read_error_file(&path) } else { None };
        self.error_file = Some(path);
        self
    }

    fn set_last_error(&self, error: Option<String>) {
        if let Some(path) = &self.error_file {
            if let Err(err) = write_error_file(path, error.as_deref()) {
                warn!("Failed to update {}: {}", path.display(), err);
            }
        }
        *lock(&self.last_error) = error;
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> Result<SessionState, SessionError> {
        Ok(match self.store.read()? {
            Some(timer) => SessionState::Running(timer),
            None => SessionState::Idle,
        })
    }

    /// True when a timer runs for a different ticket; front ends disable starting then.
    pub fn is_running_elsewhere(&self, ticket_id: &str) -> Result<bool, SessionError> {
        Ok(self
            .store
            .read()?
            .map(|timer| timer.ticket_id != ticket_id)
            .unwrap_or(false))
    }

    /// Label for the save action: switches to "Retry Save" after a failed attempt.
    pub fn save_label(&self) -> &'static str {
        if lock(&self.last_error).is_some() {
            RETRY_LABEL
        } else {
            SAVE_LABEL
        }
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Sets the work description sent with the next stop. Blank text clears it.
    pub fn set_description(&self, text: &str) {
        let trimmed = text.trim();
        *lock(&self.description) = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn description(&self) -> Option<String> {
        lock(&self.description).clone()
    }

    fn claim(&self, ticket_id: &str) -> Result<InFlight<'_>, SessionError> {
        let mut tickets = lock(&self.in_flight);
        if !tickets.insert(ticket_id.to_string()) {
            return Err(SessionError::Busy(ticket_id.to_string()));
        }
        Ok(InFlight {
            tickets: &self.in_flight,
            ticket_id: ticket_id.to_string(),
        })
    }

    /// Starts a timer after confirming the user may log work on `ticket_key`.
    ///
    /// Starting the ticket that is already running returns the existing timer untouched.
    /// Front ends must not call this while another ticket's timer runs.
    pub async fn start(&self, ticket_id: &str, ticket_key: &str) -> Result<ActiveTimer, SessionError> {
        let _in_flight = self.claim(ticket_id)?;
        if let Some(timer) = self.running_for(ticket_id)? {
            return Ok(timer);
        }

        match self.api.check_permission(ticket_key).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Permission to log work on {} denied", ticket_key);
                return Err(SessionError::PermissionDenied {
                    ticket_key: ticket_key.to_string(),
                });
            }
            Err(err) => {
                warn!("Permission check for {} failed: {}", ticket_key, err);
                return Err(SessionError::PermissionCheckFailed {
                    ticket_key: ticket_key.to_string(),
                    message: err.to_string(),
                });
            }
        }

        self.begin(ticket_id)
    }

    /// Starts without the permission pre-check, for when the user chose to proceed
    /// after [`SessionError::PermissionCheckFailed`].
    pub fn start_unchecked(&self, ticket_id: &str) -> Result<ActiveTimer, SessionError> {
        let _in_flight = self.claim(ticket_id)?;
        if let Some(timer) = self.running_for(ticket_id)? {
            return Ok(timer);
        }
        self.begin(ticket_id)
    }

    fn running_for(&self, ticket_id: &str) -> Result<Option<ActiveTimer>, SessionError> {
        Ok(self
            .store
            .read()?
            .filter(|timer| timer.ticket_id == ticket_id))
    }

    fn begin(&self, ticket_id: &str) -> Result<ActiveTimer, SessionError> {
        let timer = ActiveTimer::start_now(ticket_id);
        self.store.write(Some(timer.clone()))?;
        self.set_last_error(None);
        info!("Timer started for ticket {}", ticket_id);
        Ok(timer)
    }

    /// Submits the running timer as a worklog (at least one minute) and clears it.
    /// On failure the timer stays in the store and the error is kept for display.
    pub async fn stop(&self) -> Result<StopOutcome, SessionError> {
        let timer = self.store.read()?.ok_or(SessionError::NotRunning)?;
        let _in_flight = self.claim(&timer.ticket_id)?;
        self.set_last_error(None);

        let elapsed = timer.elapsed_seconds();
        let submitted = elapsed.max(MINIMUM_WORKLOG_SECONDS);
        let advisory = Advisory::for_duration(elapsed);
        let description = self.description();

        let result = self
            .api
            .submit_worklog(
                &timer.ticket_id,
                &TimeSpent::Seconds(submitted),
                description.as_deref(),
            )
            .await;

        if let Err(err) = result {
            let err = SessionError::submission(err);
            warn!("Saving timer for {} failed: {}", timer.ticket_id, err);
            self.set_last_error(Some(err.to_string()));
            return Err(err);
        }

        self.store.write(None)?;
        *lock(&self.description) = None;
        info!(
            "Logged {} on ticket {}",
            format_duration(submitted),
            timer.ticket_id
        );
        Ok(StopOutcome {
            ticket_id: timer.ticket_id,
            elapsed_seconds: elapsed,
            submitted_seconds: submitted,
            advisory,
        })
    }

    /// Same submission as [`stop`](Self::stop), offered after a failed save.
    pub async fn retry_save(&self) -> Result<StopOutcome, SessionError> {
        self.stop().await
    }

    /// Drops the running timer without logging anything. Callers confirm with the user
    /// first: the tracked time is gone afterwards.
    pub fn discard(&self) -> Result<Discarded, SessionError> {
        let timer = self.store.read()?.ok_or(SessionError::NotRunning)?;
        let _in_flight = self.claim(&timer.ticket_id)?;

        self.store.write(None)?;
        *lock(&self.description) = None;
        self.set_last_error(None);

        let lost_seconds = timer.elapsed_seconds();
        warn!(
            "Discarded {} of unsaved time on ticket {}",
            format_duration(lost_seconds),
            timer.ticket_id
        );
        Ok(Discarded {
            timer,
            lost_seconds,
        })
    }

    /// Logs `duration_text` directly, independent of the timer.
    ///
    /// The text goes to Jira as-is so its own grammar decides validity; the local parse
    /// only feeds the advisory. Empty text is rejected before any request.
    pub async fn log_manual(
        &self,
        ticket_id: &str,
        duration_text: &str,
        comment: Option<&str>,
    ) -> Result<ManualLogOutcome, SessionError> {
        let text = duration_text.trim();
        if text.is_empty() {
            return Err(SessionError::ValidationFailed(
                "duration must not be empty".to_string(),
            ));
        }
        let _in_flight = self.claim(ticket_id)?;

        let parsed = parse_duration(text);
        let advisory = if parsed > 0 {
            Advisory::for_duration(parsed)
        } else {
            None
        };

        self.api
            .submit_worklog(ticket_id, &TimeSpent::Text(text.to_string()), comment)
            .await
            .map_err(SessionError::submission)?;

        info!("Logged {} on ticket {}", text, ticket_id);
        Ok(ManualLogOutcome {
            ticket_id: ticket_id.to_string(),
            duration_text: text.to_string(),
            parsed_seconds: parsed,
            advisory,
        })
    }
}

/// Last save error recorded by a previous instance, if any.
pub fn read_error_file(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn write_error_file(path: &Path, error: Option<&str>) -> io::Result<()> {
    match error {
        Some(error) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, error)
        }
        None => match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        },
    }
}
