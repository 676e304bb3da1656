//! Line-oriented text codec for record bodies
//!
//! ```text
//! Submitted-by: {owner}
//! URLs:
//! - {url_1}
//! - {url_2}
//!
//! Added-via: {client_tag}
//! ```
//!
//! Decoding is permissive: any line that, once trimmed, starts with `- http` is taken as a URL
//! entry wherever it appears, and every other line is ignored.

const SUBMITTED_BY: &str = "Submitted-by:";
const URLS_HEADER: &str = "URLs:";
const ADDED_VIA: &str = "Added-via:";
const BULLET: &str = "- ";

/// Fields recovered from a record body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Value of the `Submitted-by:` line, if present
    pub submitted_by: Option<String>,
    /// URL entries in body order
    pub urls: Vec<String>,
}

/// Parse a record body. Never fails; unparseable input yields no URLs.
pub fn decode(body: &str) -> DecodedRecord {
    let mut decoded = DecodedRecord::default();

    for line in body.lines() {
        let line = line.trim();

        if let Some(entry) = line.strip_prefix(BULLET) {
            if entry.starts_with("http") {
                decoded.urls.push(entry.trim().to_string());
            }
        } else if decoded.submitted_by.is_none() {
            if let Some(owner) = line.strip_prefix(SUBMITTED_BY) {
                decoded.submitted_by = Some(owner.trim().to_string());
            }
        }
    }

    decoded
}

/// Parse only the URL entries of a record body
pub fn decode_urls(body: &str) -> Vec<String> {
    decode(body).urls
}

/// Render the canonical body for an owner's URL list
pub fn encode(owner: &str, urls: &[String], client_tag: &str) -> String {
    let mut body = format!("{SUBMITTED_BY} {owner}\n{URLS_HEADER}\n");
    for url in urls {
        body.push_str(BULLET);
        body.push_str(url);
        body.push('\n');
    }
    body.push('\n');
    body.push_str(ADDED_VIA);
    body.push(' ');
    body.push_str(client_tag);
    body
}
