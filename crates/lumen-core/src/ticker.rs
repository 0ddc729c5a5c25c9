use std::time::Duration;
use std::time::Instant;

pub const USAGE_TICK: Duration = Duration::from_secs(60);
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Polled periodic timer. Fires on the first poll (mount) and then whenever
/// `interval` has elapsed since the last fire.
///
/// Dropping the ticker is the cancellation; nothing runs in the background.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        let due = match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last_fired = Some(now);
        }
        due
    }

    /// Time left before the next fire, zero when already due.
    pub fn until_next(&self, now: Instant) -> Duration {
        match self.last_fired {
            None => Duration::ZERO,
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }
}
