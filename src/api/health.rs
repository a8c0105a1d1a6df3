//! Shared health state for the /health endpoint.
//! Updated by the analysis handlers, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// Completed analysis passes since startup.
    pub analyses: AtomicU64,
    /// Millisecond timestamp of the last analysis pass (0 = none).
    pub last_analysis_at_ms: AtomicU64,
    /// Listings scored by the last analysis pass.
    pub last_analysis_listings: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_analysis(&self, at_ms: u64, listings: usize) {
        self.analyses.fetch_add(1, Ordering::Relaxed);
        self.last_analysis_at_ms.store(at_ms, Ordering::Relaxed);
        self.last_analysis_listings.store(listings as u64, Ordering::Relaxed);
    }

    pub fn analyses(&self) -> u64 {
        self.analyses.load(Ordering::Relaxed)
    }

    pub fn last_analysis_at_ms(&self) -> u64 {
        self.last_analysis_at_ms.load(Ordering::Relaxed)
    }

    pub fn last_analysis_listings(&self) -> u64 {
        self.last_analysis_listings.load(Ordering::Relaxed)
    }
}
