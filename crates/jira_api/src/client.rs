use crate::config::JiraConfig;
use crate::error::{JiraError, Result};
use crate::jql::{self, TicketFilters};
use crate::models::{
    Myself, PermissionsResponse, RichTextDocument, SearchResponse, Ticket, TimeSpent,
    WorklogCreateRequest, WorklogEntry, WorklogList,
};
use crate::throttle::RequestGate;
use chrono::{Local, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client as HttpClient, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Capability required to log work on an issue.
pub const WORK_ON_ISSUES: &str = "WORK_ON_ISSUES";
/// Result cap for every ticket list.
pub const SEARCH_MAX_RESULTS: u32 = 50;
const TICKET_FIELDS: [&str; 4] = ["summary", "timespent", "issuetype", "status"];
const WORKLOG_SCAN_MAX_RESULTS: u32 = 300;

#[derive(Clone)]
pub struct JiraClient {
    http: HttpClient,
    config: JiraConfig,
    gate: RequestGate,
}

impl JiraClient {
    /// Builds a client. Host and token must be configured, otherwise no request is attempted.
    pub fn new(config: JiraConfig) -> Result<Self> {
        if !config.is_complete() {
            return Err(JiraError::Configuration(
                "Jira host and API token must be set".to_string(),
            ));
        }
        let http = build_http_client(&config)?;
        let gate = RequestGate::new(config.max_in_flight);
        Ok(Self { http, config, gate })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_with_body(Method::GET, path, Option::<&Value>::None).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(Method::POST, path, Some(body)).await
    }

    async fn send_with_body<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _permit = self.gate.enter().await?;
        debug!(%method, path, "jira request");
        let mut request = self.http.request(method, self.url_for(path));
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        Self::parse_json(response).await
    }

    async fn send_expect_empty<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let _permit = self.gate.enter().await?;
        debug!(%method, path, "jira request");
        let mut request = self.http.request(method, self.url_for(path));
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        Self::ensure_success(response).await
    }

    fn url_for(&self, path: &str) -> String {
        let mut base = self.config.api_root();
        base.push_str(path.trim_start_matches('/'));
        base
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(JiraError::from)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(JiraError::http(status, body))
        }
    }

    async fn ensure_success(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(JiraError::http(status, body))
        }
    }

    pub async fn myself(&self) -> Result<Myself> {
        self.get("myself").await
    }

    /// True when the configured credentials can read `/myself`.
    pub async fn validate_connection(&self) -> bool {
        match self.myself().await {
            Ok(_) => true,
            Err(err) => {
                warn!("connection validation failed: {}", err);
                false
            }
        }
    }

    /// Runs a JQL query with the ticket field projection, capped at 50 results.
    pub async fn search(&self, query: &str) -> Result<Vec<Ticket>> {
        let response = self
            .search_raw(query, &TICKET_FIELDS, SEARCH_MAX_RESULTS)
            .await?;
        Ok(response.issues.into_iter().map(Ticket::from).collect())
    }

    async fn search_raw(&self, query: &str, fields: &[&str], max_results: u32) -> Result<SearchResponse> {
        let payload = SearchRequest {
            jql: query,
            fields,
            max_results,
        };
        self.post("search/jql", &payload).await
    }

    pub async fn fetch_in_progress(&self, filters: &TicketFilters) -> Result<Vec<Ticket>> {
        self.search(&jql::in_progress(filters)).await
    }

    pub async fn fetch_done(&self) -> Result<Vec<Ticket>> {
        self.search(&jql::done()).await
    }

    pub async fn fetch_by_keys(&self, keys: &[String]) -> Result<Vec<Ticket>> {
        match jql::by_keys(keys) {
            Some(query) => self.search(&query).await,
            None => Ok(Vec::new()),
        }
    }

    /// Posts a worklog. A blank comment is omitted from the body.
    pub async fn submit_worklog(
        &self,
        ticket_id: &str,
        time_spent: &TimeSpent,
        comment: Option<&str>,
    ) -> Result<()> {
        let path = format!("issue/{}/worklog", ticket_id);
        let comment = comment
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(RichTextDocument::paragraph);
        let payload = WorklogCreateRequest {
            time_spent: time_spent.clone(),
            comment,
        };
        self.send_expect_empty(Method::POST, &path, Some(&payload)).await
    }

    /// `Ok(false)` when Jira answers without the grant or with a non-2xx status;
    /// `Err` only when the call itself could not be completed or decoded.
    pub async fn check_permission(&self, ticket_key: &str) -> Result<bool> {
        let _permit = self.gate.enter().await?;
        let response = self
            .http
            .get(self.url_for("mypermissions"))
            .query(&[("issueKey", ticket_key), ("permissions", WORK_ON_ISSUES)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(ticket_key, %status, "permission check rejected");
            return Ok(false);
        }

        let grants = response.json::<PermissionsResponse>().await?;
        let allowed = grants.has(WORK_ON_ISSUES);
        debug!(ticket_key, allowed, "permission check");
        Ok(allowed)
    }

    pub async fn issue_worklogs(&self, issue_key: &str) -> Result<Vec<WorklogEntry>> {
        let path = format!("issue/{}/worklog", issue_key);
        let list: WorklogList = self.get(&path).await?;
        Ok(list.worklogs)
    }

    pub async fn fetch_todays_seconds(&self) -> Result<u64> {
        let today = Local::now().date_naive();
        self.fetch_logged_seconds_on(today).await
    }

    /// Sums the current user's worklogs started on `date` across recently updated issues.
    /// Issues whose worklogs cannot be read are skipped.
    pub async fn fetch_logged_seconds_on(&self, date: NaiveDate) -> Result<u64> {
        let me = self.myself().await?;
        let identity = me.identity().ok_or_else(|| {
            JiraError::Other("current user has no account identifier".to_string())
        })?;

        let issues = self
            .search_raw(&jql::recently_updated(), &["key"], WORKLOG_SCAN_MAX_RESULTS)
            .await?
            .issues;
        if issues.is_empty() {
            return Ok(0);
        }

        let mut tasks = JoinSet::new();
        for issue in issues {
            let client = self.clone();
            tasks.spawn(async move {
                let result = client.issue_worklogs(&issue.key).await;
                (issue.key, result)
            });
        }

        let day = date.format("%Y-%m-%d").to_string();
        let mut total = 0u64;
        while let Some(joined) = tasks.join_next().await {
            let (key, result) = joined.map_err(|err| JiraError::Other(err.to_string()))?;
            match result {
                Ok(entries) => {
                    total += entries
                        .iter()
                        .filter(|entry| entry.is_authored_by(&identity))
                        .filter(|entry| entry.started_date() == Some(day.as_str()))
                        .map(|entry| entry.time_spent_seconds)
                        .sum::<u64>();
                }
                Err(err) => debug!(issue = %key, "skipping worklogs: {}", err),
            }
        }
        Ok(total)
    }
}

fn build_http_client(config: &JiraConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();

    let mut auth_value = header_value(config.credentials.authorization_header())?;
    auth_value.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth_value);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(config.user_agent.clone())?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| JiraError::Other(err.to_string()))
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|err| JiraError::Configuration(err.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: &'a str,
    fields: &'a [&'a str],
    max_results: u32,
}
