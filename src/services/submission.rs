use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use log::info;

const MAX_SUBMISSIONS_PER_WINDOW: usize = 5;
const WINDOW_MINUTES: i64 = 60;

/// Gate on manual link submissions, keyed by caller origin.
///
/// Behind a trait so the window store can live in memory here and in a
/// shared store for multi-instance deployments.
pub trait SubmissionGate: Send + Sync {
    /// Accept and record the submission, or reject it without recording.
    fn check_and_record(&self, origin: &str) -> bool;
}

/// Sliding one-hour window allowing at most five submissions per origin.
/// Stale entries are pruned lazily on each check; no background sweep.
#[derive(Default)]
pub struct SlidingWindowThrottle {
    windows: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SlidingWindowThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_and_record_at(&self, origin: &str, now: DateTime<Utc>) -> bool {
        let cutoff = now - Duration::minutes(WINDOW_MINUTES);
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        // Origins whose whole window has gone stale are dropped so the map
        // does not grow without bound on one-off submitters.
        windows.retain(|_, stamps| stamps.last().is_some_and(|newest| *newest > cutoff));

        let stamps = windows.entry(origin.to_string()).or_default();
        stamps.retain(|stamp| *stamp > cutoff);

        if stamps.len() >= MAX_SUBMISSIONS_PER_WINDOW {
            info!("Rejecting submission from {origin}: rate limit reached");
            return false;
        }
        stamps.push(now);
        true
    }
}

impl SubmissionGate for SlidingWindowThrottle {
    fn check_and_record(&self, origin: &str) -> bool {
        self.check_and_record_at(origin, Utc::now())
    }
}
