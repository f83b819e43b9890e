//! Process-wide counters for client cache behaviour and resolution outcomes.

use crate::i18n::resolver::Source;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Counters shared by every cache and resolver in the process.
pub struct TranslationMetrics {
    /// Reads served from a populated cache slot
    cache_hits: AtomicUsize,

    /// Reads that had to populate a cache slot
    cache_misses: AtomicUsize,

    /// Forced repopulations (explicit refresh or refresh after a write)
    cache_refreshes: AtomicUsize,

    /// Resolutions answered by a team entry
    resolved_team: AtomicUsize,

    /// Resolutions answered by a system entry
    resolved_system: AtomicUsize,

    /// Resolutions that fell back to the key path
    resolved_missing: AtomicUsize,
}

static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl TranslationMetrics {
    /// The process-wide instance.
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(|| TranslationMetrics {
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            cache_refreshes: AtomicUsize::new(0),
            resolved_team: AtomicUsize::new(0),
            resolved_system: AtomicUsize::new(0),
            resolved_missing: AtomicUsize::new(0),
        })
    }

    /// Record a cache read served from memory.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache read that had to load.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an explicit reload of a slot.
    pub fn record_cache_refresh(&self) {
        self.cache_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record which scope answered a resolution.
    pub fn record_resolution(&self, source: Source) {
        let counter = match source {
            Source::Team => &self.resolved_team,
            Source::System => &self.resolved_system,
            Source::None => &self.resolved_missing,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of cache hits so far.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses so far.
    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Number of slot reloads so far.
    pub fn cache_refreshes(&self) -> usize {
        self.cache_refreshes.load(Ordering::Relaxed)
    }

    /// Number of resolutions that ended at `source`.
    pub fn resolutions(&self, source: Source) -> usize {
        match source {
            Source::Team => self.resolved_team.load(Ordering::Relaxed),
            Source::System => self.resolved_system.load(Ordering::Relaxed),
            Source::None => self.resolved_missing.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of every counter.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let cache_hit_rate = match hits + misses {
            0 => 0.0,
            reads => hits as f64 * 100.0 / reads as f64,
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            cache_refreshes: self.cache_refreshes(),
            resolved_team: self.resolutions(Source::Team),
            resolved_system: self.resolutions(Source::System),
            resolved_missing: self.resolutions(Source::None),
        }
    }

    /// Zero every counter.
    #[cfg(test)]
    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.cache_refreshes.store(0, Ordering::Relaxed);
        self.resolved_team.store(0, Ordering::Relaxed);
        self.resolved_system.store(0, Ordering::Relaxed);
        self.resolved_missing.store(0, Ordering::Relaxed);
    }
}

/// Serializable view of [`TranslationMetrics`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Hits as a percentage of all cache reads.
    pub cache_hit_rate: f64,

    pub cache_refreshes: usize,
    pub resolved_team: usize,
    pub resolved_system: usize,
    pub resolved_missing: usize,
}
