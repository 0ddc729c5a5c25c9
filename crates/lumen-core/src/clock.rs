use std::cell::Cell;

use chrono::DateTime;
use chrono::Duration;
use chrono::FixedOffset;
use chrono::Local;
use chrono::NaiveDate;

/// Wall-clock source in the user's local zone.
///
/// Day boundaries and countdown arithmetic both read from here, never from a
/// server clock.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// Parses an RFC 3339 instant, e.g. `2024-01-01T23:59:30+02:00`.
    pub fn at(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self::new)
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::Clock;
    use super::ManualClock;

    #[test]
    fn today_follows_local_offset_not_utc() {
        // 00:30 at +02:00 is still the previous day in UTC.
        let clock = ManualClock::at("2024-01-02T00:30:00+02:00").expect("clock");
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2024, 1, 2).expect("date")
        );
        assert_eq!(
            clock.now().naive_utc().date(),
            NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
        );
    }

    #[test]
    fn advance_moves_now_ms() {
        let clock = ManualClock::at("2024-01-01T12:00:00+00:00").expect("clock");
        let before = clock.now_ms();
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now_ms() - before, 90_000);
    }
}
