use std::time::Duration;

use crate::auth::Credentials;

pub const DEFAULT_API_VERSION: &str = "3";
pub const DEFAULT_USER_AGENT: &str = "jiratime";
pub const DEFAULT_MAX_IN_FLIGHT: usize = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct JiraConfig {
    pub host: String,
    pub api_version: String,
    pub credentials: Credentials,
    pub user_agent: String,
    pub max_in_flight: usize,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl JiraConfig {
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            credentials,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = limit.max(1);
        self
    }

    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn with_connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Host and token must both be present before any request goes out.
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty() && !self.credentials.is_empty()
    }

    pub fn api_root(&self) -> String {
        format!(
            "{}/rest/api/{}/",
            self.host.trim().trim_end_matches('/'),
            self.api_version.trim_matches('/')
        )
    }
}
