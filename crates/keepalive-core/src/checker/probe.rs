//! HTTP probes

use std::time::Duration;

use reqwest::{redirect, Client};
use serde::Serialize;
use tracing::debug;

use crate::config::CheckerConfig;
use crate::error::Result;

/// Result of a single probe.
///
/// Transport failures are folded into [`ProbeOutcome::Unreachable`] and never surface as
/// errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Answered with a status in 200..400
    Up(u16),
    /// Answered with any other status
    Down(u16),
    /// No answer: timeout, DNS, TLS or connection failure
    Unreachable(String),
}

impl ProbeOutcome {
    /// Classify a final HTTP status code
    pub fn from_status(code: u16) -> Self {
        if (200..400).contains(&code) {
            Self::Up(code)
        } else {
            Self::Down(code)
        }
    }

    /// Whether the target counts as awake
    pub fn is_up(&self) -> bool {
        matches!(self, Self::Up(_))
    }

    /// Status code, or 0 when the target never answered
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Up(code) | Self::Down(code) => *code,
            Self::Unreachable(_) => 0,
        }
    }
}

/// Performs one bounded check against a URL
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Probe `url` once. Must not fail; problems are reported through the outcome.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// GET-based prober following redirects
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Create a prober with the configured timeout and redirect limit
    pub fn new(config: &CheckerConfig) -> Result<Self> {
        Self::with_limits(config.probe_timeout, config.max_redirects)
    }

    /// Create a prober with explicit limits
    pub fn with_limits(timeout: Duration, max_redirects: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(max_redirects))
            .user_agent(concat!("keepalive-pinger/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(response) => ProbeOutcome::from_status(response.status().as_u16()),
            Err(e) => {
                debug!(url, error = %e, "Probe failed to connect");
                ProbeOutcome::Unreachable(e.to_string())
            }
        }
    }
}
