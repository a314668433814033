use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide decoding counters, monotonically increasing for the lifetime
/// of the owning `ParserState`. Relaxed atomics: a snapshot may be taken from
/// another thread at any time without synchronizing with an in-flight parse.
#[derive(Debug, Default)]
pub struct Counters {
    records: AtomicU64,
    templates: AtomicU64,
    option_templates: AtomicU64,
    missing_templates: AtomicU64,
    malformed_packets: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_records(&self, n: u64) {
        self.records.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn inc_templates(&self) {
        self.templates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_option_templates(&self) {
        self.option_templates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_missing_templates(&self) {
        self.missing_templates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_malformed_packets(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            records: self.records.load(Ordering::Relaxed),
            templates: self.templates.load(Ordering::Relaxed),
            option_templates: self.option_templates.load(Ordering::Relaxed),
            missing_templates: self.missing_templates.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub records: u64,
    pub templates: u64,
    pub option_templates: u64,
    pub missing_templates: u64,
    pub malformed_packets: u64,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "records: {}, templates: {}, option templates: {}, missing templates: {}, malformed packets: {}",
            self.records, self.templates, self.option_templates, self.missing_templates, self.malformed_packets
        )
    }
}
