//! Typed Jira REST client crate used by the time tracking engine.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod jql;
pub mod models;
pub mod throttle;

pub use auth::Credentials;
pub use client::JiraClient;
pub use config::JiraConfig;
pub use error::{JiraError, Result};
pub use jql::TicketFilters;
pub use models::{
    IssueType, Myself, StatusCategory, Ticket, TicketStatus, TimeSpent, WorklogEntry,
};
pub use reqwest::StatusCode;
pub use throttle::RequestGate;
