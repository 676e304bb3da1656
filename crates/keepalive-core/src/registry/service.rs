//! Owner-scoped URL registry operations

use std::sync::Arc;

use tracing::{debug, info};

use crate::codec;
use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::models::{RecordStatus, UrlListing};
use crate::store::RecordStore;

use super::policy::{normalize_url, DomainPolicy};

/// Reads and mutates owners' URL lists through a [`RecordStore`].
///
/// Mutations are unguarded read-modify-write cycles; concurrent requests for the same
/// owner can lose an update.
#[derive(Clone)]
pub struct UrlRegistry {
    store: Arc<dyn RecordStore>,
    policy: DomainPolicy,
    max_urls: usize,
    client_tag: String,
}

impl UrlRegistry {
    /// Create a registry with an explicit policy
    pub fn new(
        store: Arc<dyn RecordStore>,
        policy: DomainPolicy,
        max_urls: usize,
        client_tag: impl Into<String>,
    ) -> Self {
        Self {
            store,
            policy,
            max_urls,
            client_tag: client_tag.into(),
        }
    }

    /// Create a registry from configuration
    pub fn from_config(store: Arc<dyn RecordStore>, config: &RegistryConfig) -> Result<Self> {
        let policy = DomainPolicy::new(&config.allowed_domains)?;
        Ok(Self::new(store, policy, config.max_urls, config.client_tag.clone()))
    }

    /// URLs and status for `owner`; an owner without a record gets an empty `unknown` listing
    pub async fn get_urls(&self, owner: &str) -> Result<UrlListing> {
        let owner = require_owner(owner)?;

        let Some(record) = self.store.find(owner).await? else {
            return Ok(UrlListing::empty());
        };

        Ok(UrlListing {
            urls: codec::decode_urls(&record.body),
            status: record.status(),
        })
    }

    /// Start monitoring `raw_url` for `owner`, creating the owner's record on first use
    pub async fn add_url(&self, owner: &str, raw_url: &str) -> Result<Vec<String>> {
        let owner = require_owner(owner)?;

        if !self.policy.allows(raw_url) {
            return Err(Error::DomainNotAllowed(format!(
                "{} (allowed: {})",
                raw_url.trim(),
                self.policy.suffixes().join(", ")
            )));
        }

        let url = normalize_url(raw_url);

        let Some(record) = self.store.find(owner).await? else {
            let urls = vec![url];
            let body = codec::encode(owner, &urls, &self.client_tag);
            let record = self.store.create(owner, &body, RecordStatus::Alive).await?;
            info!(record = record.id, owner, url = %urls[0], "Created record with first URL");
            return Ok(urls);
        };

        let mut urls = codec::decode_urls(&record.body);
        if urls.len() >= self.max_urls {
            return Err(Error::QuotaExceeded {
                limit: self.max_urls,
            });
        }
        if urls.contains(&url) {
            return Err(Error::DuplicateUrl(url));
        }

        urls.push(url);
        let body = codec::encode(owner, &urls, &self.client_tag);
        self.store.update_body(record.id, &body).await?;

        info!(record = record.id, owner, count = urls.len(), "Added URL");
        Ok(urls)
    }

    /// Stop monitoring `raw_url` for `owner`.
    ///
    /// Removing a URL that is not monitored is not an error: the record is rewritten
    /// unchanged and the current list returned. A blank `raw_url` is rejected.
    pub async fn remove_url(&self, owner: &str, raw_url: &str) -> Result<Vec<String>> {
        let owner = require_owner(owner)?;
        if raw_url.trim().is_empty() {
            return Err(Error::validation("url is required"));
        }

        let record = self
            .store
            .find(owner)
            .await?
            .ok_or_else(|| Error::not_found("record", owner))?;

        let target = normalize_url(raw_url);
        let mut urls = codec::decode_urls(&record.body);
        let before = urls.len();
        urls.retain(|u| *u != target);

        if urls.len() == before {
            debug!(record = record.id, url = %target, "URL not monitored, nothing to remove");
        }

        let body = codec::encode(owner, &urls, &self.client_tag);
        self.store.update_body(record.id, &body).await?;

        info!(record = record.id, owner, count = urls.len(), "Removed URL");
        Ok(urls)
    }
}

fn require_owner(owner: &str) -> Result<&str> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(Error::unauthorized("owner identity missing"));
    }
    Ok(owner)
}
