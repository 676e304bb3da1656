//! GitHub issues as a record store
//!
//! Each record is one issue in a configured repository. The title is the lookup key,
//! labels carry the status and the comment thread receives alerts.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::models::{record_title, RecordId, RecordStatus, StoredRecord};

use super::RecordStore;

const PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("keepalive/", env!("CARGO_PKG_VERSION"));

/// Record store backed by the GitHub REST API
#[derive(Clone)]
pub struct GitHubStore {
    client: Client,
    api_base: Url,
    repo: String,
    token: String,
}

impl GitHubStore {
    /// Create a store for the configured repository
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let mut api_base = Url::parse(&config.api_base)
            .map_err(|e| Error::config(format!("invalid store.api_base: {e}")))?;
        // Url::join drops the last path segment unless it ends in a slash
        if !api_base.path().ends_with('/') {
            api_base.set_path(&format!("{}/", api_base.path()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base,
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path)
            .map_err(|e| Error::internal(format!("bad endpoint {path}: {e}")))
    }

    fn issue_endpoint(&self, id: RecordId, suffix: &str) -> Result<Url> {
        self.endpoint(&format!("repos/{}/issues/{id}{suffix}", self.repo))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::store(format!("{what}: GitHub returned {status}: {body}")));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl RecordStore for GitHubStore {
    async fn find(&self, owner: &str) -> Result<Option<StoredRecord>> {
        let title = record_title(owner);
        let query = format!("\"{title}\" in:title repo:{} state:open", self.repo);
        let url = self.endpoint("search/issues")?;

        let results: SearchResults = self
            .send(self.client.get(url).query(&[("q", query.as_str())]), "search issues")
            .await?
            .json()
            .await?;

        debug!(owner, matches = results.items.len(), "Searched records");

        // search is fuzzy on titles; only an exact title counts
        Ok(results
            .items
            .into_iter()
            .filter(|issue| issue.pull_request.is_none() && issue.state == "open")
            .find(|issue| issue.title == title)
            .map(Into::into))
    }

    async fn create(&self, owner: &str, body: &str, initial: RecordStatus) -> Result<StoredRecord> {
        let url = self.endpoint(&format!("repos/{}/issues", self.repo))?;
        let payload = CreateIssue {
            title: record_title(owner),
            body,
            labels: initial.label().into_iter().collect(),
        };

        let issue: Issue = self
            .send(self.client.post(url).json(&payload), "create issue")
            .await?
            .json()
            .await?;

        info!(issue = issue.number, owner, "Created keepalive record");
        Ok(issue.into())
    }

    async fn update_body(&self, id: RecordId, body: &str) -> Result<()> {
        let url = self.issue_endpoint(id, "")?;
        self.send(
            self.client.patch(url).json(&serde_json::json!({ "body": body })),
            "update issue",
        )
        .await?;
        Ok(())
    }

    async fn list_open(&self) -> Result<Vec<StoredRecord>> {
        let url = self.endpoint(&format!("repos/{}/issues", self.repo))?;
        let mut records = Vec::new();
        let mut page = 1usize;

        loop {
            let per_page = PER_PAGE.to_string();
            let page_str = page.to_string();
            let issues: Vec<Issue> = self
                .send(
                    self.client.get(url.clone()).query(&[
                        ("state", "open"),
                        ("per_page", per_page.as_str()),
                        ("page", page_str.as_str()),
                    ]),
                    "list issues",
                )
                .await?
                .json()
                .await?;

            let fetched = issues.len();
            records.extend(
                issues
                    .into_iter()
                    .filter(|issue| issue.pull_request.is_none())
                    .map(StoredRecord::from),
            );

            if fetched < PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(count = records.len(), "Listed open records");
        Ok(records)
    }

    async fn add_label(&self, id: RecordId, label: &str) -> Result<()> {
        let url = self.issue_endpoint(id, "/labels")?;
        self.send(
            self.client
                .post(url)
                .json(&serde_json::json!({ "labels": [label] })),
            "add label",
        )
        .await?;
        Ok(())
    }

    async fn remove_label(&self, id: RecordId, label: &str) -> Result<()> {
        let mut url = self.issue_endpoint(id, "/labels")?;
        url.path_segments_mut()
            .map_err(|()| Error::internal("store.api_base cannot be a base URL"))?
            .push(label);
        self.send(self.client.delete(url), "remove label").await?;
        Ok(())
    }

    async fn comment(&self, id: RecordId, text: &str) -> Result<()> {
        let url = self.issue_endpoint(id, "/comments")?;
        self.send(
            self.client
                .post(url)
                .json(&serde_json::json!({ "body": text })),
            "create comment",
        )
        .await?;
        Ok(())
    }
}

// GitHub API payloads

#[derive(Debug, Serialize)]
struct CreateIssue<'a> {
    title: String,
    body: &'a str,
    labels: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    labels: Vec<IssueLabel>,
    #[serde(default)]
    comments: u32,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct IssueLabel {
    name: String,
}

impl From<Issue> for StoredRecord {
    fn from(issue: Issue) -> Self {
        StoredRecord {
            id: issue.number,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            comments: issue.comments,
        }
    }
}
