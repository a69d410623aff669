//! Persistent settings model, file-backed manager and on-disk locations.

use jira_api::{Credentials, JiraConfig, TicketFilters};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Overrides both the config and data directories when set.
pub const HOME_ENV: &str = "JIRATIME_HOME";
const SETTINGS_FILE: &str = "settings.json";
const TIMER_FILE: &str = "active_timer.json";
const BADGE_FILE: &str = "badge";
const LAST_ERROR_FILE: &str = "last_error";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Jira host and API token must be configured (run `jiratime init`)")]
    Incomplete,
    #[error("could not determine a config directory")]
    NoConfigDir,
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Default reminder interval for a running timer, in minutes.
fn default_timer_notification_interval() -> u32 {
    15
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// User settings: connection, pinned tickets, list filters and display preferences.
#[derive(Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub jira_host: String,
    pub jira_email: String,
    pub jira_token: String,
    pub pinned_ticket_keys: Vec<String>,
    /// Comma separated status names.
    pub filter_statuses: String,
    /// Comma separated issue type names.
    pub filter_issue_types: String,
    pub theme: Theme,
    #[serde(default = "default_timer_notification_interval")]
    pub timer_notification_interval: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            jira_host: String::new(),
            jira_email: String::new(),
            jira_token: String::new(),
            pinned_ticket_keys: Vec::new(),
            filter_statuses: String::new(),
            filter_issue_types: String::new(),
            theme: Theme::default(),
            timer_notification_interval: default_timer_notification_interval(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("jira_host", &self.jira_host)
            .field("jira_email", &self.jira_email)
            .field("jira_token", &"<redacted>")
            .field("pinned_ticket_keys", &self.pinned_ticket_keys)
            .field("filter_statuses", &self.filter_statuses)
            .field("filter_issue_types", &self.filter_issue_types)
            .field("theme", &self.theme)
            .field("timer_notification_interval", &self.timer_notification_interval)
            .finish()
    }
}

impl Settings {
    /// Host and token are the minimum needed before talking to Jira.
    pub fn is_configured(&self) -> bool {
        !self.jira_host.trim().is_empty() && !self.jira_token.trim().is_empty()
    }

    pub fn host(&self) -> &str {
        self.jira_host.trim().trim_end_matches('/')
    }

    pub fn filters(&self) -> TicketFilters {
        TicketFilters::from_csv(&self.filter_statuses, &self.filter_issue_types)
    }

    pub fn jira_config(&self) -> Result<JiraConfig, SettingsError> {
        if !self.is_configured() {
            return Err(SettingsError::Incomplete);
        }
        let email = Some(self.jira_email.clone());
        let credentials = Credentials::new(email, self.jira_token.trim());
        Ok(JiraConfig::new(self.host(), credentials))
    }

    /// Browser link for a ticket.
    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.host(), key)
    }

    /// Adds a key to the pinned list. Keys are uppercased; returns false if already pinned.
    pub fn pin(&mut self, key: &str) -> bool {
        let key = normalize_key(key);
        if key.is_empty() || self.pinned_ticket_keys.iter().any(|pinned| *pinned == key) {
            return false;
        }
        self.pinned_ticket_keys.push(key);
        true
    }

    /// Removes a key from the pinned list; returns whether it was pinned.
    pub fn unpin(&mut self, key: &str) -> bool {
        let key = normalize_key(key);
        let before = self.pinned_ticket_keys.len();
        self.pinned_ticket_keys.retain(|pinned| *pinned != key);
        before != self.pinned_ticket_keys.len()
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Where settings and shared runtime state live on this machine.
#[derive(Clone, Debug)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Uses `JIRATIME_HOME` when set, otherwise the platform directories.
    pub fn resolve() -> Result<Self, SettingsError> {
        if let Some(home) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::rooted(PathBuf::from(home)));
        }
        let dirs = directories::ProjectDirs::from("dev", "jiratime", "jiratime")
            .ok_or(SettingsError::NoConfigDir)?;
        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_local_dir().to_path_buf(),
        })
    }

    pub fn rooted(root: PathBuf) -> Self {
        Self {
            config_dir: root.clone(),
            data_dir: root,
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    pub fn timer_file(&self) -> PathBuf {
        self.data_dir.join(TIMER_FILE)
    }

    pub fn badge_file(&self) -> PathBuf {
        self.data_dir.join(BADGE_FILE)
    }

    pub fn last_error_file(&self) -> PathBuf {
        self.data_dir.join(LAST_ERROR_FILE)
    }
}

/// Loads and saves [`Settings`] as pretty JSON.
pub struct SettingsManager {
    path: PathBuf,
}

impl SettingsManager {
    pub fn new(paths: &AppPaths) -> Self {
        Self {
            path: paths.settings_file(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads settings from disk, falling back to defaults on read/parse errors.
    pub fn load(&self) -> Settings {
        if self.path.exists() {
            let content = fs::read_to_string(&self.path).unwrap_or_default();
            match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!("Ignoring unreadable settings at {}: {}", self.path.display(), err);
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        }
    }

    /// Persists settings, creating parent directories when needed. The file holds the
    /// API token, so on unix it is restricted to the owner.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppPaths, Settings, SettingsError, SettingsManager, Theme};
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        env::temp_dir().join(format!("jiratime-tests-{name}-{nanos}"))
    }

    #[test]
    fn default_settings_have_expected_values() {
        let settings = Settings::default();
        assert_eq!(settings.timer_notification_interval, 15);
        assert_eq!(settings.theme, Theme::System);
        assert!(settings.pinned_ticket_keys.is_empty());
        assert!(!settings.is_configured());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let manager = SettingsManager::new(&AppPaths::rooted(unique_root("missing")));
        assert_eq!(manager.load(), Settings::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let root = unique_root("roundtrip");
        let manager = SettingsManager::new(&AppPaths::rooted(root.clone()));
        let settings = Settings {
            jira_host: "https://acme.atlassian.net".to_string(),
            jira_email: "dev@acme.io".to_string(),
            jira_token: "secret".to_string(),
            pinned_ticket_keys: vec!["ACME-1".to_string()],
            filter_statuses: "In Progress".to_string(),
            filter_issue_types: String::new(),
            theme: Theme::Dark,
            timer_notification_interval: 30,
        };

        manager.save(&settings).expect("save should succeed");
        assert_eq!(manager.load(), settings);

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn load_invalid_json_falls_back_to_default() {
        let root = unique_root("invalid");
        fs::create_dir_all(&root).expect("create temp directory");
        let manager = SettingsManager::new(&AppPaths::rooted(root.clone()));
        fs::write(manager.path(), "not-valid-json").expect("write invalid settings");

        assert_eq!(manager.load(), Settings::default());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "jira_host": "https://x", "jira_token": "t" }"#).unwrap();
        assert!(settings.is_configured());
        assert_eq!(settings.timer_notification_interval, 15);
    }

    #[test]
    fn jira_config_requires_host_and_token() {
        let settings = Settings {
            jira_host: "https://acme.atlassian.net/".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.jira_config(), Err(SettingsError::Incomplete)));

        let settings = Settings {
            jira_token: "pat".to_string(),
            ..settings
        };
        let config = settings.jira_config().expect("complete settings");
        assert_eq!(config.host, "https://acme.atlassian.net");
        assert_eq!(config.credentials.authorization_header(), "Bearer pat");
        assert_eq!(settings.browse_url("ACME-7"), "https://acme.atlassian.net/browse/ACME-7");
    }

    #[test]
    fn pin_and_unpin_normalize_keys() {
        let mut settings = Settings::default();
        assert!(settings.pin(" acme-1 "));
        assert!(!settings.pin("ACME-1"));
        assert!(!settings.pin("  "));
        assert_eq!(settings.pinned_ticket_keys, vec!["ACME-1"]);

        assert!(settings.unpin("acme-1"));
        assert!(!settings.unpin("ACME-1"));
        assert!(settings.pinned_ticket_keys.is_empty());
    }

    #[test]
    fn debug_output_hides_token() {
        let settings = Settings {
            jira_token: "top-secret".to_string(),
            ..Settings::default()
        };
        assert!(!format!("{:?}", settings).contains("top-secret"));
    }
}
