//! Timing helpers

use std::time::{Duration, Instant};

/// Wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Format epoch milliseconds as an RFC 3339 timestamp
pub fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

/// Measures a span on the monotonic clock and remembers its wall-clock start
#[derive(Debug)]
pub struct Timer {
    label: String,
    started: Instant,
    started_millis: i64,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
            started_millis: now_millis(),
        }
    }

    /// Epoch milliseconds at `start`
    pub fn started_millis(&self) -> i64 {
        self.started_millis
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Consume the timer, logging the span at debug level
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{} took {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer() {
        let before = now_millis();
        let timer = Timer::start("test");
        assert!(timer.started_millis() >= before);
        sleep(Duration::from_millis(10));
        assert!(timer.stop() >= Duration::from_millis(10));
    }

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        let first = now_millis();
        sleep(Duration::from_millis(2));
        assert!(now_millis() >= first);
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00.000Z");
    }
}
