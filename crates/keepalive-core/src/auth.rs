//! Owner identity verification
//!
//! The API trusts an external identity provider to turn an access token into a verified
//! email address, which becomes the owner key of a record.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Resolves an access token to an owner identity
#[async_trait::async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Return the verified owner identity, or [`Error::Unauthorized`]
    async fn verify(&self, token: &str) -> Result<String>;
}

/// Verifies Google OAuth access tokens through the token-info endpoint
pub struct GoogleTokenVerifier {
    client: Client,
    tokeninfo_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    email: Option<String>,
    // Google sends this as the string "true"
    email_verified: Option<serde_json::Value>,
}

impl TokenInfo {
    fn verified_email(self) -> Option<String> {
        let verified = match self.email_verified {
            Some(serde_json::Value::String(s)) => s == "true",
            Some(serde_json::Value::Bool(b)) => b,
            _ => false,
        };
        self.email.filter(|e| verified && !e.is_empty())
    }
}

impl GoogleTokenVerifier {
    /// Create a verifier from configuration
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            tokeninfo_url: config.tokeninfo_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, token: &str) -> Result<String> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::unauthorized("missing access token"));
        }

        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "Token verification request failed");
                Error::unauthorized("identity provider unreachable")
            })?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Token rejected");
            return Err(Error::unauthorized("invalid access token"));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|_| Error::unauthorized("malformed token info"))?;

        info.verified_email()
            .ok_or_else(|| Error::unauthorized("email not verified"))
    }
}
