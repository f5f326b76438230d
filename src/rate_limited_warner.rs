use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between warnings about dropped entries.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Helper that rate limits dropped-entry warnings.
///
/// The caller increments the drop counter via [`record_drop`]. The next call to
/// [`warn_if_due`] emits a warning using the provided callback if the configured
/// interval has elapsed. [`flush`] emits a warning immediately if any entries
/// have been dropped since the last emission.
///
/// [`record_drop`]: RateLimitedWarner::record_drop
/// [`warn_if_due`]: RateLimitedWarner::warn_if_due
/// [`flush`]: RateLimitedWarner::flush
pub struct RateLimitedWarner {
    interval: Duration,
    last_warn: Mutex<Option<Instant>>,
    dropped: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    /// Create a new [`RateLimitedWarner`]. The first warning can be emitted
    /// immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_warn: Mutex::new(None),
            dropped: AtomicU64::new(0),
        }
    }

    /// Increment the dropped-entry counter.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit a warning if the rate limit interval has elapsed.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = Instant::now();
        let mut last = self.last_warn.lock();
        if last.is_some_and(|prev| now.duration_since(prev) < self.interval) {
            return;
        }
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            *last = Some(now);
        }
    }

    /// Immediately warn about any dropped entries.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            *self.last_warn.lock() = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_first_warning_immediately() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn rate_limits_subsequent_warnings() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        warner.record_drop();
        warner.warn_if_due(|c| warnings.push(c));
        assert_eq!(warnings, vec![1]);
    }

    #[test]
    fn zero_interval_warns_every_time() {
        let warner = RateLimitedWarner::new(Duration::ZERO);
        let mut warnings = Vec::new();
        for _ in 0..3 {
            warner.record_drop();
            warner.warn_if_due(|c| warnings.push(c));
        }
        assert_eq!(warnings, vec![1, 1, 1]);
    }

    #[test]
    fn flush_emits_pending_warning() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.record_drop();
        warner.record_drop();
        warner.flush(|c| warnings.push(c));
        assert_eq!(warnings, vec![2]);
    }

    #[test]
    fn flush_is_silent_without_drops() {
        let warner = RateLimitedWarner::default();
        let mut warnings = Vec::new();
        warner.flush(|c| warnings.push(c));
        assert!(warnings.is_empty());
    }
}
