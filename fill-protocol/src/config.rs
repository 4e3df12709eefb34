use std::collections::BTreeSet;
use std::time::Duration;

/// The engine's tunable knobs, as enumerated in spec.md §6. Kept here
/// (rather than only in `engine`'s CLI `Config`) so that pure functions in
/// `engine` (the validator, the wrapper's sanitizer) can take an
/// `&EngineConfig` without depending on `clap`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Max concurrent events in flight per dispatcher instance.
    pub parallelism: u16,
    /// Idle poll cadence.
    pub poll_interval: Duration,
    /// Events claimed per poll.
    pub claim_batch_size: u32,
    /// Stuck-event reap threshold.
    pub reap_after: Duration,
    /// Per-event in-process retries.
    pub max_retries: u32,
    /// Content truncation length.
    pub max_cell_length: usize,
    /// Hosts whose URLs are rejected pre-write (known vendor redirect hosts).
    pub blocked_url_hosts: BTreeSet<String>,
    /// Confidence below which a retry is triggered.
    pub low_confidence_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 8,
            poll_interval: Duration::from_millis(2000),
            claim_batch_size: 16,
            reap_after: Duration::from_millis(120_000),
            max_retries: 2,
            max_cell_length: 5000,
            blocked_url_hosts: default_blocked_hosts(),
            low_confidence_threshold: 0.5,
        }
    }
}

fn default_blocked_hosts() -> BTreeSet<String> {
    [
        "vertexaisearch.cloud.google.com",
        "www.google.com",
        "google.com",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}
