//! URL registry
//!
//! Owner-scoped add/remove/list of monitored URLs, with a per-owner quota and a domain
//! allow-list. Each mutation is a read-modify-write of the owner's record.

mod policy;
mod service;

pub use policy::{normalize_url, DomainPolicy};
pub use service::UrlRegistry;
