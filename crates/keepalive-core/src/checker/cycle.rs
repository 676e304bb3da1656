//! Check cycle and status transitions

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::Serialize;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::config::CheckerConfig;
use crate::error::Result;
use crate::models::{
    is_keepalive_title, RecordId, RecordStatus, StoredRecord, LABEL_ALIVE, LABEL_FAILED,
};
use crate::store::RecordStore;

use super::probe::{HttpProber, ProbeOutcome, Prober};

/// Pick the pre-cycle delay uniformly from `[0, max]` at millisecond resolution
pub fn pick_jitter<R: Rng + ?Sized>(rng: &mut R, max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rng.gen_range(0..=max_ms))
}

/// Probes of one URL within a cycle: the first attempt and at most one retry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlCheck {
    /// URL as stored in the record
    pub url: String,
    /// First attempt
    pub first: ProbeOutcome,
    /// Retry, only made when the first attempt failed
    pub retry: Option<ProbeOutcome>,
}

impl UrlCheck {
    /// Up on the first attempt or on the retry
    pub fn is_alive(&self) -> bool {
        self.first.is_up() || self.retry.as_ref().is_some_and(ProbeOutcome::is_up)
    }

    /// Failed first, then answered on the retry
    pub fn recovered(&self) -> bool {
        !self.first.is_up() && self.is_alive()
    }
}

/// Tag changes applied to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Status the record carries after the cycle
    pub status: RecordStatus,
    /// Number of tag additions and removals issued
    pub tag_writes: usize,
    /// Whether an alert comment was posted
    pub alerted: bool,
}

/// What happened to a record during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Body holds no URL entries; left untouched
    NoUrls,
    /// URLs probed and tags reconciled
    Checked {
        /// One entry per URL, in body order
        checks: Vec<UrlCheck>,
        /// Tag changes that followed
        transition: Transition,
    },
    /// A store call failed while updating this record
    Errored {
        /// Rendered store error
        error: String,
    },
}

/// Per-record summary of a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    /// Store identifier
    pub id: RecordId,
    /// Record title
    pub title: String,
    /// What the cycle did with it
    pub outcome: RecordOutcome,
}

impl RecordReport {
    /// Status after the cycle, when the record was checked
    pub fn status(&self) -> Option<RecordStatus> {
        match &self.outcome {
            RecordOutcome::Checked { transition, .. } => Some(transition.status),
            _ => None,
        }
    }
}

/// Summary of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// When the pass began, after the jitter
    pub started_at: DateTime<Utc>,
    /// Delay waited before the pass; zero for [`HealthChecker::run_pass`]
    #[serde(with = "humantime_serde")]
    pub jitter: Duration,
    /// Keepalive records in listing order
    pub records: Vec<RecordReport>,
}

impl CycleReport {
    /// Records left in the given status
    pub fn count(&self, status: RecordStatus) -> usize {
        self.records
            .iter()
            .filter(|r| r.status() == Some(status))
            .count()
    }

    /// Records whose update failed
    pub fn errors(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, RecordOutcome::Errored { .. }))
            .count()
    }
}

/// Runs check cycles over every open keepalive record
pub struct HealthChecker {
    store: Arc<dyn RecordStore>,
    prober: Arc<dyn Prober>,
    config: CheckerConfig,
}

impl HealthChecker {
    /// Create a checker with an explicit prober
    pub fn new(store: Arc<dyn RecordStore>, prober: Arc<dyn Prober>, config: CheckerConfig) -> Self {
        Self {
            store,
            prober,
            config,
        }
    }

    /// Create a checker probing over HTTP
    pub fn from_config(store: Arc<dyn RecordStore>, config: CheckerConfig) -> Result<Self> {
        let prober = Arc::new(HttpProber::new(&config)?);
        Ok(Self::new(store, prober, config))
    }

    /// Run cycles forever on a fixed interval
    pub async fn start(&self, every: Duration) {
        info!(interval = ?every, "Starting health checker");

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.run_cycle().await {
                Ok(report) => log_summary(&report),
                Err(e) => error!(error = %e, "Check cycle failed"),
            }
        }
    }

    /// Wait a random jitter once, then run a full pass
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let jitter = pick_jitter(&mut rand::thread_rng(), self.config.jitter_max);
        info!(jitter = ?jitter, "Waiting before check cycle");
        sleep(jitter).await;

        let mut report = self.run_pass().await?;
        report.jitter = jitter;
        Ok(report)
    }

    /// Run a full pass immediately.
    ///
    /// Only listing the records can fail the pass; errors on individual records are
    /// logged and recorded in the report.
    pub async fn run_pass(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        let records = self.store.list_open().await?;

        let candidates: Vec<StoredRecord> = records
            .into_iter()
            .filter(|r| {
                let keep = is_keepalive_title(&r.title);
                if !keep {
                    debug!(record = r.id, title = %r.title, "Skipping non-keepalive record");
                }
                keep
            })
            .collect();

        debug!(count = candidates.len(), "Checking records");

        let records: Vec<RecordReport> = stream::iter(candidates)
            .map(|record| self.check_record(record))
            .buffered(self.config.record_concurrency.max(1))
            .collect()
            .await;

        Ok(CycleReport {
            started_at,
            jitter: Duration::ZERO,
            records,
        })
    }

    async fn check_record(&self, record: StoredRecord) -> RecordReport {
        let urls = codec::decode_urls(&record.body);

        let outcome = if urls.is_empty() {
            debug!(record = record.id, "No URLs, skipping");
            RecordOutcome::NoUrls
        } else {
            info!(record = record.id, title = %record.title, urls = urls.len(), "Processing record");

            let checks = self.check_urls(&urls).await;
            let failed: Vec<String> = checks
                .iter()
                .filter(|c| !c.is_alive())
                .map(|c| c.url.clone())
                .collect();

            match self.apply_transition(&record, &failed).await {
                Ok(transition) => RecordOutcome::Checked { checks, transition },
                Err(e) => {
                    error!(record = record.id, error = %e, "Failed to update record status");
                    RecordOutcome::Errored { error: e.to_string() }
                }
            }
        };

        RecordReport {
            id: record.id,
            title: record.title,
            outcome,
        }
    }

    async fn check_urls(&self, urls: &[String]) -> Vec<UrlCheck> {
        let mut checks = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                sleep(self.config.pacing_delay).await;
            }
            checks.push(self.check_url(url).await);
        }

        checks
    }

    async fn check_url(&self, url: &str) -> UrlCheck {
        let first = self.prober.probe(url).await;
        info!(url, status = first.status_code(), "Pinged");

        if first.is_up() {
            return UrlCheck {
                url: url.to_string(),
                first,
                retry: None,
            };
        }

        // cold starts often fail the first request
        sleep(self.config.retry_delay).await;
        let retry = self.prober.probe(url).await;

        if retry.is_up() {
            info!(url, status = retry.status_code(), "Recovered on retry");
        } else {
            warn!(url, status = retry.status_code(), "Failed after retry");
        }

        UrlCheck {
            url: url.to_string(),
            first,
            retry: Some(retry),
        }
    }

    async fn apply_transition(&self, record: &StoredRecord, failed: &[String]) -> Result<Transition> {
        let has_alive = record.has_label(LABEL_ALIVE);
        let has_failed = record.has_label(LABEL_FAILED);
        let mut tag_writes = 0;
        let mut alerted = false;

        let status = if failed.is_empty() {
            if has_failed {
                self.store.remove_label(record.id, LABEL_FAILED).await?;
                tag_writes += 1;
            }
            if !has_alive {
                self.store.add_label(record.id, LABEL_ALIVE).await?;
                tag_writes += 1;
            }
            RecordStatus::Alive
        } else {
            if has_alive {
                self.store.remove_label(record.id, LABEL_ALIVE).await?;
                tag_writes += 1;
            }
            if !has_failed {
                self.store.add_label(record.id, LABEL_FAILED).await?;
                tag_writes += 1;

                if record.comments == 0 {
                    alerted = self.post_alert(record.id, failed).await;
                }
            }
            RecordStatus::Failed
        };

        if tag_writes > 0 {
            info!(record = record.id, status = %status, "Record status changed");
        }

        Ok(Transition {
            status,
            tag_writes,
            alerted,
        })
    }

    /// Best effort: a failed comment is logged and the status update stands
    async fn post_alert(&self, id: RecordId, failed: &[String]) -> bool {
        match self.store.comment(id, &alert_message(failed)).await {
            Ok(()) => {
                info!(record = id, failed = failed.len(), "Alert posted");
                true
            }
            Err(e) => {
                warn!(record = id, error = %e, "Could not post alert");
                false
            }
        }
    }
}

/// Body of the comment posted when a record turns `failed`
pub(crate) fn alert_message(failed: &[String]) -> String {
    format!(
        "**Alert:** The following URLs failed to respond: {}",
        failed.join(", ")
    )
}

fn log_summary(report: &CycleReport) {
    info!(
        records = report.records.len(),
        alive = report.count(RecordStatus::Alive),
        failed = report.count(RecordStatus::Failed),
        errors = report.errors(),
        "Check cycle finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, VecDeque};
    use tokio::time::Instant;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const A: &str = "https://a.onrender.com";
    const B: &str = "https://b.onrender.com";
    const C: &str = "https://c.onrender.com";

    /// Replays scripted outcomes per URL; `Up(200)` once a script runs out
    #[derive(Default)]
    struct ScriptedProber {
        scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
        calls: Mutex<HashMap<String, usize>>,
        log: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedProber {
        fn script(self, url: &str, outcomes: &[ProbeOutcome]) -> Self {
            self.scripts
                .lock()
                .insert(url.to_string(), outcomes.iter().cloned().collect());
            self
        }

        fn calls(&self, url: &str) -> usize {
            self.calls.lock().get(url).copied().unwrap_or(0)
        }

        /// Call instants relative to `start`, in call order
        fn timeline(&self, start: Instant) -> Vec<(String, Duration)> {
            self.log
                .lock()
                .iter()
                .map(|(url, at)| (url.clone(), *at - start))
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, url: &str) -> ProbeOutcome {
            *self.calls.lock().entry(url.to_string()).or_default() += 1;
            self.log.lock().push((url.to_string(), Instant::now()));
            self.scripts
                .lock()
                .get_mut(url)
                .and_then(VecDeque::pop_front)
                .unwrap_or(ProbeOutcome::Up(200))
        }
    }

    /// Delegates to a memory store, failing selected calls
    struct FlakyStore {
        inner: Arc<MemoryStore>,
        fail_comments: bool,
        fail_labels_for: Option<RecordId>,
    }

    #[async_trait::async_trait]
    impl RecordStore for FlakyStore {
        async fn find(&self, owner: &str) -> Result<Option<StoredRecord>> {
            self.inner.find(owner).await
        }

        async fn create(&self, owner: &str, body: &str, initial: RecordStatus) -> Result<StoredRecord> {
            self.inner.create(owner, body, initial).await
        }

        async fn update_body(&self, id: RecordId, body: &str) -> Result<()> {
            self.inner.update_body(id, body).await
        }

        async fn list_open(&self) -> Result<Vec<StoredRecord>> {
            self.inner.list_open().await
        }

        async fn add_label(&self, id: RecordId, label: &str) -> Result<()> {
            if self.fail_labels_for == Some(id) {
                return Err(Error::store("label write refused"));
            }
            self.inner.add_label(id, label).await
        }

        async fn remove_label(&self, id: RecordId, label: &str) -> Result<()> {
            if self.fail_labels_for == Some(id) {
                return Err(Error::store("label write refused"));
            }
            self.inner.remove_label(id, label).await
        }

        async fn comment(&self, id: RecordId, text: &str) -> Result<()> {
            if self.fail_comments {
                return Err(Error::store("comments disabled"));
            }
            self.inner.comment(id, text).await
        }
    }

    fn fast_config() -> CheckerConfig {
        CheckerConfig {
            retry_delay: Duration::ZERO,
            pacing_delay: Duration::ZERO,
            jitter_max: Duration::ZERO,
            probe_timeout: Duration::from_secs(2),
            ..CheckerConfig::default()
        }
    }

    fn body(urls: &[&str]) -> String {
        let urls: Vec<String> = urls.iter().map(|u| (*u).to_string()).collect();
        codec::encode("dev@example.com", &urls, "byKB")
    }

    fn checker(store: Arc<dyn RecordStore>, prober: Arc<dyn Prober>) -> HealthChecker {
        HealthChecker::new(store, prober, fast_config())
    }

    #[test]
    fn test_jitter_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let max = Duration::from_secs(30);

        for _ in 0..1000 {
            assert!(pick_jitter(&mut rng, max) <= max);
        }
        assert_eq!(pick_jitter(&mut rng, Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_mixed_record_fails_and_alerts_once() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("keepalive: dev@example.com", &body(&[A, B]), &["alive"]);
        let prober = Arc::new(ScriptedProber::default().script(
            B,
            &[ProbeOutcome::Down(500), ProbeOutcome::Down(500)],
        ));

        let report = checker(store.clone(), prober.clone()).run_pass().await.unwrap();

        let record = store.get(id).unwrap();
        assert_eq!(record.labels, vec!["failed".to_string()]);
        assert_eq!(
            store.comments(id),
            vec![format!("**Alert:** The following URLs failed to respond: {B}")]
        );
        assert_eq!(report.records[0].status(), Some(RecordStatus::Failed));
        assert_eq!(prober.calls(A), 1);
        assert_eq!(prober.calls(B), 2);
    }

    #[tokio::test]
    async fn test_recovered_on_retry_counts_as_alive() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("keepalive: dev@example.com", &body(&[A]), &[]);
        let prober = Arc::new(
            ScriptedProber::default().script(A, &[ProbeOutcome::Down(500), ProbeOutcome::Up(200)]),
        );

        let report = checker(store.clone(), prober.clone()).run_pass().await.unwrap();

        assert_eq!(store.get(id).unwrap().status(), RecordStatus::Alive);
        assert!(store.comments(id).is_empty());
        match &report.records[0].outcome {
            RecordOutcome::Checked { checks, .. } => assert!(checks[0].recovered()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_at_most_one_retry_per_url() {
        let store = Arc::new(MemoryStore::new());
        store.insert("keepalive: dev@example.com", &body(&[A]), &["alive"]);
        let prober = Arc::new(ScriptedProber::default().script(
            A,
            &[
                ProbeOutcome::Unreachable("timeout".to_string()),
                ProbeOutcome::Unreachable("timeout".to_string()),
                ProbeOutcome::Up(200),
            ],
        ));

        checker(store.clone(), prober.clone()).run_pass().await.unwrap();

        assert_eq!(prober.calls(A), 2);
    }

    #[tokio::test]
    async fn test_all_success_cycles_are_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("keepalive: dev@example.com", &body(&[A, B]), &["alive"]);
        let checker = checker(store.clone(), Arc::new(ScriptedProber::default()));

        for _ in 0..2 {
            let report = checker.run_pass().await.unwrap();
            match &report.records[0].outcome {
                RecordOutcome::Checked { transition, .. } => assert_eq!(transition.tag_writes, 0),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(store.label_writes(), 0);
        assert_eq!(store.get(id).unwrap().labels, vec!["alive".to_string()]);
    }

    #[tokio::test]
    async fn test_consecutive_failures_alert_once() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("keepalive: dev@example.com", &body(&[A]), &["alive"]);
        let down = vec![ProbeOutcome::Down(502); 4];
        let checker = checker(
            store.clone(),
            Arc::new(ScriptedProber::default().script(A, &down)),
        );

        checker.run_pass().await.unwrap();
        checker.run_pass().await.unwrap();

        assert_eq!(store.comments(id).len(), 1);
        // remove alive + add failed, then nothing
        assert_eq!(store.label_writes(), 2);
    }

    #[tokio::test]
    async fn test_fresh_failure_with_existing_comments_does_not_alert() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("keepalive: dev@example.com", &body(&[A]), &["alive"]);
        store.comment(id, "thanks for the service").await.unwrap();
        let prober = ScriptedProber::default()
            .script(A, &[ProbeOutcome::Down(500), ProbeOutcome::Down(500)]);

        let report = checker(store.clone(), Arc::new(prober)).run_pass().await.unwrap();

        assert_eq!(store.get(id).unwrap().status(), RecordStatus::Failed);
        assert_eq!(store.comments(id).len(), 1);
        match &report.records[0].outcome {
            RecordOutcome::Checked { transition, .. } => assert!(!transition.alerted),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_record_recovers() {
        let store = Arc::new(MemoryStore::new());
        let id = store.insert("keepalive: dev@example.com", &body(&[A]), &["failed"]);

        checker(store.clone(), Arc::new(ScriptedProber::default()))
            .run_pass()
            .await
            .unwrap();

        assert_eq!(store.get(id).unwrap().labels, vec!["alive".to_string()]);
        assert_eq!(store.label_writes(), 2);
    }

    #[tokio::test]
    async fn test_skips_foreign_and_empty_records() {
        let store = Arc::new(MemoryStore::new());
        let foreign = store.insert("Bug report", &body(&[A]), &[]);
        let empty = store.insert("keepalive: idle@example.com", &body(&[]), &[]);
        let prober = Arc::new(ScriptedProber::default());

        let report = checker(store.clone(), prober.clone()).run_pass().await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].id, empty);
        assert_eq!(report.records[0].outcome, RecordOutcome::NoUrls);
        assert_eq!(store.get(foreign).unwrap().status(), RecordStatus::Unknown);
        assert_eq!(store.get(empty).unwrap().status(), RecordStatus::Unknown);
        assert_eq!(prober.calls(A), 0);
    }

    #[tokio::test]
    async fn test_alert_failure_is_swallowed() {
        let memory = Arc::new(MemoryStore::new());
        let id = memory.insert("keepalive: dev@example.com", &body(&[A]), &["alive"]);
        let store = Arc::new(FlakyStore {
            inner: memory.clone(),
            fail_comments: true,
            fail_labels_for: None,
        });
        let prober = ScriptedProber::default()
            .script(A, &[ProbeOutcome::Down(500), ProbeOutcome::Down(500)]);

        let report = checker(store, Arc::new(prober)).run_pass().await.unwrap();

        assert_eq!(memory.get(id).unwrap().status(), RecordStatus::Failed);
        assert!(memory.comments(id).is_empty());
        assert_eq!(report.errors(), 0);
    }

    #[tokio::test]
    async fn test_record_error_does_not_abort_pass() {
        let memory = Arc::new(MemoryStore::new());
        let broken = memory.insert("keepalive: one@example.com", &body(&[A]), &[]);
        let healthy = memory.insert("keepalive: two@example.com", &body(&[B]), &[]);
        let store = Arc::new(FlakyStore {
            inner: memory.clone(),
            fail_comments: false,
            fail_labels_for: Some(broken),
        });

        let report = checker(store, Arc::new(ScriptedProber::default()))
            .run_pass()
            .await
            .unwrap();

        assert_eq!(report.errors(), 1);
        assert!(matches!(report.records[0].outcome, RecordOutcome::Errored { .. }));
        assert_eq!(memory.get(healthy).unwrap().status(), RecordStatus::Alive);
        assert_eq!(memory.get(broken).unwrap().status(), RecordStatus::Unknown);
    }

    #[tokio::test]
    async fn test_concurrent_records_keep_report_order() {
        let store = Arc::new(MemoryStore::new());
        let ids: Vec<RecordId> = (0..6)
            .map(|n| store.insert(&format!("keepalive: u{n}@example.com"), &body(&[A]), &[]))
            .collect();
        let config = CheckerConfig {
            record_concurrency: 3,
            ..fast_config()
        };
        let checker = HealthChecker::new(store.clone(), Arc::new(ScriptedProber::default()), config);

        let report = checker.run_pass().await.unwrap();

        let reported: Vec<RecordId> = report.records.iter().map(|r| r.id).collect();
        assert_eq!(reported, ids);
        assert_eq!(report.count(RecordStatus::Alive), 6);
    }

    #[tokio::test]
    async fn test_run_cycle_applies_jitter_once() {
        let store = Arc::new(MemoryStore::new());
        store.insert("keepalive: dev@example.com", &body(&[A, B]), &[]);
        let config = CheckerConfig {
            jitter_max: Duration::from_millis(20),
            ..fast_config()
        };
        let checker = HealthChecker::new(store, Arc::new(ScriptedProber::default()), config);

        let report = checker.run_cycle().await.unwrap();

        assert!(report.jitter <= Duration::from_millis(20));
        assert_eq!(report.count(RecordStatus::Alive), 1);
    }

    fn timed_config() -> CheckerConfig {
        CheckerConfig {
            retry_delay: Duration::from_secs(1),
            pacing_delay: Duration::from_millis(500),
            jitter_max: Duration::ZERO,
            ..CheckerConfig::default()
        }
    }

    fn at(url: &str, ms: u64) -> (String, Duration) {
        (url.to_string(), Duration::from_millis(ms))
    }

    /// Timer wheel resolution is 1ms, so each sleep may land slightly late
    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual <= expected + Duration::from_millis(10),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn assert_timeline(actual: &[(String, Duration)], expected: &[(String, Duration)]) {
        let urls: Vec<&str> = actual.iter().map(|(u, _)| u.as_str()).collect();
        let expected_urls: Vec<&str> = expected.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(urls, expected_urls);
        for ((_, got), (_, want)) in actual.iter().zip(expected) {
            assert_near(*got, *want);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_urls_only() {
        let store = Arc::new(MemoryStore::new());
        store.insert("keepalive: dev@example.com", &body(&[A, B, C]), &["alive"]);
        let prober = Arc::new(ScriptedProber::default());
        let checker = HealthChecker::new(store, prober.clone(), timed_config());

        let start = Instant::now();
        checker.run_pass().await.unwrap();

        assert_near(start.elapsed(), Duration::from_millis(1000));
        assert_timeline(
            &prober.timeline(start),
            &[at(A, 0), at(B, 500), at(C, 1000)],
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_once_before_second_attempt() {
        let store = Arc::new(MemoryStore::new());
        store.insert("keepalive: dev@example.com", &body(&[A, B, C]), &["alive"]);
        let prober = Arc::new(ScriptedProber::default().script(
            B,
            &[ProbeOutcome::Down(503), ProbeOutcome::Down(503)],
        ));
        let checker = HealthChecker::new(store, prober.clone(), timed_config());

        let start = Instant::now();
        checker.run_pass().await.unwrap();

        // two pacing gaps plus one retry delay
        assert_near(start.elapsed(), Duration::from_millis(2000));
        assert_timeline(
            &prober.timeline(start),
            &[at(A, 0), at(B, 500), at(B, 1500), at(C, 2000)],
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_precedes_first_ping_only() {
        let store = Arc::new(MemoryStore::new());
        store.insert("keepalive: one@example.com", &body(&[A, B]), &[]);
        store.insert("keepalive: two@example.com", &body(&[C]), &[]);
        let prober = Arc::new(ScriptedProber::default());
        let config = CheckerConfig {
            jitter_max: Duration::from_secs(30),
            ..timed_config()
        };
        let checker = HealthChecker::new(store, prober.clone(), config);

        let start = Instant::now();
        let report = checker.run_cycle().await.unwrap();

        let jitter = report.jitter;
        let pacing = Duration::from_millis(500);
        assert!(jitter <= Duration::from_secs(30));
        // the second record starts right after the first: no second jitter
        assert_timeline(
            &prober.timeline(start),
            &[
                (A.to_string(), jitter),
                (B.to_string(), jitter + pacing),
                (C.to_string(), jitter + pacing),
            ],
        );
        assert_near(start.elapsed(), jitter + pacing);
    }

    #[tokio::test]
    async fn test_http_cycle_against_live_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/up"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        // first hit is a cold start, the retry succeeds
        Mock::given(method("GET"))
            .and(path("/cold"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cold"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let up = format!("{}/up", server.uri());
        let down = format!("{}/down", server.uri());
        let cold = format!("{}/cold", server.uri());

        let store = Arc::new(MemoryStore::new());
        let mixed = store.insert("keepalive: one@example.com", &body(&[&up, &down]), &[]);
        let waking = store.insert("keepalive: two@example.com", &body(&[&cold]), &[]);

        let checker = HealthChecker::from_config(store.clone(), fast_config()).unwrap();
        checker.run_pass().await.unwrap();

        assert_eq!(store.get(mixed).unwrap().labels, vec!["failed".to_string()]);
        assert_eq!(store.comments(mixed).len(), 1);
        assert!(store.comments(mixed)[0].contains(&down));
        assert!(!store.comments(mixed)[0].contains(&up));
        assert_eq!(store.get(waking).unwrap().labels, vec!["alive".to_string()]);
    }
}
