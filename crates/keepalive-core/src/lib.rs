//! # keepalive
//!
//! Keeps free-tier web deployments awake and tracks whether they answer.
//!
//! Each owner has one record in an issue tracker: a plain-text body listing up to three
//! URLs, plus an `alive`/`failed` tag. The registry edits the URL list on behalf of the
//! HTTP API; the health checker periodically pings every URL and moves the tag.
//!
//! ## Architecture
//!
//! - **Codec**: line-based record body format
//! - **Store**: record store capability over GitHub issues (or memory)
//! - **Registry**: quota, allow-list and dedup for owner URL lists
//! - **Checker**: ping cycle with retry, pacing, jitter and tag hysteresis
//! - **API**: REST API for the dashboard
//!
//! ## Quick Start
//!
//! ```bash
//! # Serve the API
//! keepalive serve
//!
//! # Run one check cycle (from cron or CI)
//! keepalive check
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod api;
pub mod auth;
pub mod checker;
pub mod codec;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::checker::{HealthChecker, HttpProber, Prober};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::registry::UrlRegistry;
    pub use crate::store::{GitHubStore, MemoryStore, RecordStore};
}
