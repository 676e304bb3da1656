//! Data models for keepalive

mod record;

pub use record::*;
