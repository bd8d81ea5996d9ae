//! Epoch-millisecond clock shared by adapters and native sources.
//!
//! Wall-clock time is read once (chrono) and everything after that is
//! measured on the tokio monotonic clock, so paused-time tests and timer
//! ticks line up to the millisecond.

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    epoch_ms: u64,
    start: Instant,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}

impl SessionClock {
    /// Anchor at the current wall-clock time.
    pub fn start() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self::with_epoch_ms(u64::try_from(now).unwrap_or(0))
    }

    /// Anchor at a fixed epoch value.
    pub fn with_epoch_ms(epoch_ms: u64) -> Self {
        SessionClock {
            epoch_ms,
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.ms_at(Instant::now())
    }

    /// Milliseconds since the Unix epoch at `instant`.
    pub fn ms_at(&self, instant: Instant) -> u64 {
        let elapsed = instant.saturating_duration_since(self.start).as_millis();
        self.epoch_ms + u64::try_from(elapsed).unwrap_or(u64::MAX - self.epoch_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_tokio_time() {
        let clock = SessionClock::with_epoch_ms(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now_ms(), 1_250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instants_before_start() {
        let before = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let clock = SessionClock::with_epoch_ms(500);
        assert_eq!(clock.ms_at(before), 500);
    }

    #[test]
    fn test_wall_clock_anchor() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let clock = SessionClock::start();
            // Sometime after 2020
            assert!(clock.now_ms() > 1_577_836_800_000);
        });
    }
}
