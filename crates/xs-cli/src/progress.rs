//! Throttled progress logging for long event loops.

use std::time::{Duration, Instant};

/// Logs the processed-event count at most once per interval.
pub struct ProgressCounter {
    start: Instant,
    last: Instant,
    interval: Duration,
    total: Option<u64>,
}

impl ProgressCounter {
    /// `total` is the expected number of events, if the source declares one.
    pub fn new(total: Option<u64>) -> Self {
        Self::with_interval(total, Duration::from_secs(1))
    }

    pub fn with_interval(total: Option<u64>, interval: Duration) -> Self {
        let now = Instant::now();
        Self { start: now, last: now, interval, total }
    }

    /// Record progress, logging a line if the interval has passed.
    #[inline]
    pub fn tick(&mut self, processed: u64) {
        let now = Instant::now();
        if self.due(now) {
            tracing::info!("{}", self.line(processed, now - self.start));
        }
    }

    fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;
        true
    }

    fn line(&self, processed: u64, elapsed: Duration) -> String {
        match self.total {
            Some(total) => format!("{processed:>10} / {total} | {}", format_elapsed(elapsed)),
            None => format!("{processed:>10} | {}", format_elapsed(elapsed)),
        }
    }

    pub fn finish(&self, processed: u64) {
        tracing::info!("processed {processed} events in {}", format_elapsed(self.start.elapsed()));
    }
}

/// `h:mm:ss`, `m:ss` or `Ns`.
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else if m > 0 {
        format!("{m}:{s:02}")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formats() {
        assert_eq!(format_elapsed(Duration::from_millis(900)), "0s");
        assert_eq!(format_elapsed(Duration::from_secs(42)), "42s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2:05");
        assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 7)), "3:00:07");
    }

    #[test]
    fn ticks_are_throttled() {
        let mut p = ProgressCounter::with_interval(None, Duration::from_secs(10));
        let t0 = p.start;
        assert!(!p.due(t0 + Duration::from_secs(3)));
        assert!(p.due(t0 + Duration::from_secs(10)));
        assert!(!p.due(t0 + Duration::from_secs(19)));
        assert!(p.due(t0 + Duration::from_secs(21)));

        let mut p = ProgressCounter::with_interval(None, Duration::ZERO);
        let now = Instant::now();
        assert!(p.due(now));
        assert!(p.due(now));
    }

    #[test]
    fn line_shows_declared_total() {
        let p = ProgressCounter::new(Some(250));
        assert_eq!(p.line(100, Duration::from_secs(65)), "       100 / 250 | 1:05");
        let p = ProgressCounter::new(None);
        assert_eq!(p.line(7, Duration::from_secs(3)), "         7 | 3s");
    }
}
