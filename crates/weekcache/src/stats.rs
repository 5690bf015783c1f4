//! Life-table cache counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters, shared by every user of one `LifeTableCache`
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    renders: AtomicU64,
    capture_failures: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time copy of `CacheStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Probes that found today's render
    pub hits: u64,
    /// Probes that found a cold or stale entry
    pub misses: u64,
    /// Renders written to disk
    pub renders: u64,
    /// Renders that left no new cache entry
    pub capture_failures: u64,
    /// Explicit invalidations
    pub invalidations: u64,
    /// `hits / (hits + misses)`, zero before the first probe
    pub hit_ratio: f64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl CacheStats {
    /// Counters starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a fresh probe
    pub fn record_hit(&self) {
        bump(&self.hits);
    }

    /// Count a cold or stale probe
    pub fn record_miss(&self) {
        bump(&self.misses);
    }

    /// Count a written render
    pub fn record_render(&self) {
        bump(&self.renders);
    }

    /// Count a render that left no new cache entry
    pub fn record_capture_failure(&self) {
        bump(&self.capture_failures);
    }

    /// Count an invalidation
    pub fn record_invalidation(&self) {
        bump(&self.invalidations);
    }

    /// Fresh probes so far
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Cold or stale probes so far
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Renders written so far
    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    /// Failed renders so far
    pub fn capture_failures(&self) -> u64 {
        self.capture_failures.load(Ordering::Relaxed)
    }

    /// Invalidations so far
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Share of probes served from the cache
    pub fn hit_ratio(&self) -> f64 {
        ratio(self.hits(), self.misses())
    }

    /// Copy every counter
    ///
    /// Counters are read one by one, so a snapshot taken during a render may
    /// be off by one between fields.
    pub fn snapshot(&self) -> StatsSnapshot {
        let (hits, misses) = (self.hits(), self.misses());
        StatsSnapshot {
            hits,
            misses,
            renders: self.renders(),
            capture_failures: self.capture_failures(),
            invalidations: self.invalidations(),
            hit_ratio: ratio(hits, misses),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.renders,
            &self.capture_failures,
            &self.invalidations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    match hits + misses {
        0 => 0.0,
        total => hits as f64 / total as f64,
    }
}
