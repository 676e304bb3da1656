//! Health checker
//!
//! One cycle scans every open keepalive record, pings its URLs and moves the record's
//! status tag between `alive` and `failed`. The tags are the only memory between cycles:
//! a tag is written only when it changes, and an alert comment is posted only on a fresh
//! transition into `failed` on a record that has no comments yet.

mod cycle;
mod probe;

pub use cycle::{
    pick_jitter, CycleReport, HealthChecker, RecordOutcome, RecordReport, Transition, UrlCheck,
};
pub use probe::{HttpProber, ProbeOutcome, Prober};
