//! Allowed-domain policy and URL normalization

use regex::Regex;

use crate::error::{Error, Result};

/// Accepts URLs whose host ends in one of a configured set of platform suffixes.
///
/// The check runs against the raw input, before normalization: an optional
/// `http://`/`https://`, one or more `[\w-]+.` labels, an allowed suffix and an optional path.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    pattern: Option<Regex>,
    suffixes: Vec<String>,
}

impl DomainPolicy {
    /// Build a policy from host suffixes such as `onrender.com`
    pub fn new<S: AsRef<str>>(suffixes: &[S]) -> Result<Self> {
        let suffixes: Vec<String> = suffixes
            .iter()
            .map(|s| s.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if suffixes.is_empty() {
            return Ok(Self {
                pattern: None,
                suffixes,
            });
        }

        let alternatives = suffixes
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(
            r"(?i)^(https?://)?([\w-]+\.)+({alternatives})(/.*)?$"
        ))
        .map_err(|e| Error::config(format!("invalid allowed_domains: {e}")))?;

        Ok(Self {
            pattern: Some(pattern),
            suffixes,
        })
    }

    /// Whether `raw_url` may be monitored
    pub fn allows(&self, raw_url: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|p| p.is_match(raw_url.trim()))
    }

    /// Configured suffixes, normalized
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }
}

/// Canonical stored form of a URL: trimmed, `https://` added when no scheme is present,
/// an existing `http`/`https` scheme lowercased, and exactly one trailing `/` removed.
///
/// Scheme detection ignores case, like [`DomainPolicy::allows`].
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    let mut url = match trimmed.split_once("://") {
        Some((scheme, rest))
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            format!("{}://{rest}", scheme.to_ascii_lowercase())
        }
        _ => format!("https://{trimmed}"),
    };

    if url.ends_with('/') {
        url.pop();
    }
    url
}
