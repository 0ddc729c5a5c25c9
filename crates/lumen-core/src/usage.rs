//! Daily usage limits for chat messages and tool generations.
//!
//! Two independent counters are checked against fixed caps and reset the
//! first time they are observed on a new local calendar day. The record is
//! persisted as JSON under [`USAGE_LIMITS_KEY`]:
//!
//! ```json
//! {"chatMessageCount":2,"toolGenerationCount":0,"lastResetDate":"2024-01-02"}
//! ```
//!
//! Anything that does not parse is treated as "no record yet" and replaced by
//! a zeroed record dated today.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::clock::Clock;
use crate::storage::KeyValueStore;

pub const CHAT_LIMIT: u32 = 6;
pub const TOOLS_LIMIT: u32 = 3;

pub const USAGE_LIMITS_KEY: &str = "usageLimits";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitState {
    pub chat_message_count: u32,
    pub tool_generation_count: u32,
    pub last_reset_date: NaiveDate,
}

impl UsageLimitState {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            chat_message_count: 0,
            tool_generation_count: 0,
            last_reset_date: today,
        }
    }

    /// Parses a stored record, capping counts at the limits. The flag is
    /// set when capping changed the record.
    fn parse(raw: &str) -> Option<(Self, bool)> {
        let stored = serde_json::from_str::<Self>(raw).ok()?;
        let capped = Self {
            chat_message_count: stored.chat_message_count.min(CHAT_LIMIT),
            tool_generation_count: stored.tool_generation_count.min(TOOLS_LIMIT),
            ..stored
        };
        Some((capped, capped != stored))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsageKind {
    Chat,
    Tools,
}

impl UsageKind {
    pub fn limit(self) -> u32 {
        match self {
            Self::Chat => CHAT_LIMIT,
            Self::Tools => TOOLS_LIMIT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Chat => "chat messages",
            Self::Tools => "tool generations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub date: NaiveDate,
    pub chat_used: u32,
    pub chat_limit: u32,
    pub tools_used: u32,
    pub tools_limit: u32,
}

impl UsageSnapshot {
    pub fn remaining(&self, kind: UsageKind) -> u32 {
        match kind {
            UsageKind::Chat => self.chat_limit.saturating_sub(self.chat_used),
            UsageKind::Tools => self.tools_limit.saturating_sub(self.tools_used),
        }
    }
}

/// Owns the usage record. Single writer per store.
#[derive(Debug)]
pub struct UsageLimiter<S, C> {
    store: S,
    clock: C,
    state: UsageLimitState,
}

impl<S: KeyValueStore, C: Clock> UsageLimiter<S, C> {
    /// Loads the persisted record and runs the day-boundary check, so a
    /// freshly mounted limiter never serves yesterday's counts.
    pub fn mount(store: S, clock: C) -> Self {
        let today = clock.today();
        let (state, needs_write) = match store.get(USAGE_LIMITS_KEY) {
            Some(raw) => match UsageLimitState::parse(&raw) {
                Some((state, capped)) => {
                    if capped {
                        warn!(key = USAGE_LIMITS_KEY, "usage record over limits, capping");
                    }
                    (state, capped)
                }
                None => {
                    warn!(key = USAGE_LIMITS_KEY, "malformed usage record, starting fresh");
                    (UsageLimitState::fresh(today), true)
                }
            },
            None => (UsageLimitState::fresh(today), true),
        };
        let mut limiter = Self {
            store,
            clock,
            state,
        };
        if !limiter.check_reset() && needs_write {
            limiter.persist();
        }
        limiter
    }

    /// Zeroes both counters when the local date has moved on. Returns whether
    /// a reset happened.
    pub fn check_reset(&mut self) -> bool {
        let today = self.clock.today();
        if self.state.last_reset_date == today {
            return false;
        }
        info!(
            from = %self.state.last_reset_date,
            to = %today,
            "daily usage limits reset"
        );
        self.state = UsageLimitState::fresh(today);
        self.persist();
        true
    }

    pub fn can_send_message(&self) -> bool {
        self.state.chat_message_count < CHAT_LIMIT
    }

    pub fn can_use_tools(&self) -> bool {
        self.state.tool_generation_count < TOOLS_LIMIT
    }

    pub fn can_use(&self, kind: UsageKind) -> bool {
        match kind {
            UsageKind::Chat => self.can_send_message(),
            UsageKind::Tools => self.can_use_tools(),
        }
    }

    pub fn increment_chat_messages(&mut self) -> bool {
        self.try_consume(UsageKind::Chat)
    }

    pub fn increment_tool_generations(&mut self) -> bool {
        self.try_consume(UsageKind::Tools)
    }

    /// Spends one unit of `kind`. Refusals leave the record untouched.
    pub fn try_consume(&mut self, kind: UsageKind) -> bool {
        self.check_reset();
        if !self.can_use(kind) {
            info!(kind = kind.label(), "daily limit reached");
            return false;
        }
        match kind {
            UsageKind::Chat => self.state.chat_message_count += 1,
            UsageKind::Tools => self.state.tool_generation_count += 1,
        }
        self.persist();
        true
    }

    pub fn remaining_messages(&self) -> u32 {
        CHAT_LIMIT.saturating_sub(self.state.chat_message_count)
    }

    pub fn remaining_generations(&self) -> u32 {
        TOOLS_LIMIT.saturating_sub(self.state.tool_generation_count)
    }

    pub fn state(&self) -> &UsageLimitState {
        &self.state
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            date: self.state.last_reset_date,
            chat_used: self.state.chat_message_count,
            chat_limit: CHAT_LIMIT,
            tools_used: self.state.tool_generation_count,
            tools_limit: TOOLS_LIMIT,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&mut self) {
        let encoded = match serde_json::to_string(&self.state) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("failed to encode usage record: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(USAGE_LIMITS_KEY, encoded) {
            warn!(key = USAGE_LIMITS_KEY, "failed to persist usage record: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn clock(rfc3339: &str) -> ManualClock {
        ManualClock::at(rfc3339).expect("clock")
    }

    fn persisted(limiter: &UsageLimiter<MemoryStore, &ManualClock>) -> UsageLimitState {
        let raw = limiter.store().get(USAGE_LIMITS_KEY).expect("record present");
        serde_json::from_str(&raw).expect("record parses")
    }

    #[test]
    fn six_messages_then_refusal() {
        let clock = clock("2024-01-02T10:00:00+01:00");
        let mut limiter = UsageLimiter::mount(MemoryStore::new(), &clock);
        assert_eq!(limiter.remaining_messages(), 6);

        let mut remaining = Vec::new();
        for _ in 0..CHAT_LIMIT {
            assert!(limiter.increment_chat_messages());
            remaining.push(limiter.remaining_messages());
        }
        assert_eq!(remaining, vec![5, 4, 3, 2, 1, 0]);

        let before = *limiter.state();
        assert!(!limiter.can_send_message());
        assert!(!limiter.increment_chat_messages());
        assert_eq!(limiter.remaining_messages(), 0);
        assert_eq!(*limiter.state(), before);
        assert_eq!(persisted(&limiter), before);
    }

    #[test]
    fn counters_are_independent() {
        let clock = clock("2024-01-02T10:00:00+00:00");
        let mut limiter = UsageLimiter::mount(MemoryStore::new(), &clock);
        for _ in 0..TOOLS_LIMIT {
            assert!(limiter.increment_tool_generations());
        }
        assert!(!limiter.can_use_tools());
        assert!(!limiter.increment_tool_generations());
        assert!(limiter.can_send_message());
        assert_eq!(limiter.remaining_generations(), 0);
        assert_eq!(limiter.remaining_messages(), CHAT_LIMIT);
    }

    #[test]
    fn yesterday_record_is_zeroed_on_mount() {
        let clock = clock("2024-01-02T08:00:00+00:00");
        let store = MemoryStore::new().with_entry(
            USAGE_LIMITS_KEY,
            r#"{"chatMessageCount":6,"toolGenerationCount":3,"lastResetDate":"2024-01-01"}"#,
        );
        let limiter = UsageLimiter::mount(store, &clock);

        assert_eq!(*limiter.state(), UsageLimitState::fresh(date(2024, 1, 2)));
        assert_eq!(persisted(&limiter), UsageLimitState::fresh(date(2024, 1, 2)));
        assert!(limiter.can_send_message());
    }

    #[test]
    fn reset_check_is_idempotent_within_a_day() {
        let clock = clock("2024-01-02T08:00:00+00:00");
        let mut limiter = UsageLimiter::mount(MemoryStore::new(), &clock);
        limiter.increment_chat_messages();
        limiter.increment_tool_generations();
        let before = *limiter.state();

        for _ in 0..5 {
            clock.advance(Duration::hours(2));
            assert!(!limiter.check_reset());
        }
        assert_eq!(*limiter.state(), before);
    }

    #[test]
    fn local_midnight_resets_even_when_utc_date_is_unchanged() {
        // 23:59 at +05:00 is 18:59 UTC; one minute later the local date flips
        // while the UTC date does not.
        let clock = clock("2024-01-01T23:59:00+05:00");
        let mut limiter = UsageLimiter::mount(MemoryStore::new(), &clock);
        for _ in 0..CHAT_LIMIT {
            limiter.increment_chat_messages();
        }
        assert!(!limiter.can_send_message());

        clock.advance(Duration::minutes(1));
        assert!(limiter.check_reset());
        assert_eq!(limiter.state().last_reset_date, date(2024, 1, 2));
        assert!(limiter.can_send_message());
    }

    #[test]
    fn increment_after_midnight_resets_before_counting() {
        let clock = clock("2024-01-01T23:59:59+00:00");
        let mut limiter = UsageLimiter::mount(MemoryStore::new(), &clock);
        for _ in 0..CHAT_LIMIT {
            limiter.increment_chat_messages();
        }
        clock.advance(Duration::seconds(2));

        assert!(limiter.increment_chat_messages());
        assert_eq!(limiter.state().chat_message_count, 1);
        assert_eq!(limiter.state().last_reset_date, date(2024, 1, 2));
    }

    #[test]
    fn corrupt_record_recovers_to_full_quota() {
        let clock = clock("2024-01-02T08:00:00+00:00");
        let malformed = [
            "not json",
            "{}",
            r#"{"chatMessageCount":-1}"#,
            r#"{"chatMessageCount":1,"toolGenerationCount":0,"lastResetDate":"yesterday"}"#,
        ];
        for raw in malformed {
            let store = MemoryStore::new().with_entry(USAGE_LIMITS_KEY, raw);
            let limiter = UsageLimiter::mount(store, &clock);
            assert_eq!(*limiter.state(), UsageLimitState::fresh(date(2024, 1, 2)));
            assert_eq!(persisted(&limiter), UsageLimitState::fresh(date(2024, 1, 2)));
        }
    }

    #[test]
    fn oversized_counts_are_capped_on_load() {
        let clock = clock("2024-01-02T08:00:00+00:00");
        let store = MemoryStore::new().with_entry(
            USAGE_LIMITS_KEY,
            r#"{"chatMessageCount":40,"toolGenerationCount":9,"lastResetDate":"2024-01-02"}"#,
        );
        let limiter = UsageLimiter::mount(store, &clock);
        assert_eq!(limiter.state().chat_message_count, CHAT_LIMIT);
        assert_eq!(limiter.state().tool_generation_count, TOOLS_LIMIT);
        assert_eq!(limiter.remaining_messages(), 0);
        assert_eq!(persisted(&limiter), *limiter.state());
    }

    #[test]
    fn in_range_record_is_left_untouched() {
        let clock = clock("2024-01-02T08:00:00+00:00");
        let raw = r#"{ "chatMessageCount": 2, "toolGenerationCount": 1, "lastResetDate": "2024-01-02" }"#;
        let store = MemoryStore::new().with_entry(USAGE_LIMITS_KEY, raw);
        let limiter = UsageLimiter::mount(store, &clock);
        assert_eq!(limiter.store().get(USAGE_LIMITS_KEY).as_deref(), Some(raw));
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let state = UsageLimitState {
            chat_message_count: 2,
            tool_generation_count: 1,
            last_reset_date: date(2024, 1, 2),
        };
        assert_eq!(
            serde_json::to_string(&state).expect("encode"),
            r#"{"chatMessageCount":2,"toolGenerationCount":1,"lastResetDate":"2024-01-02"}"#
        );
    }

    #[test]
    fn snapshot_reports_remaining() {
        let clock = clock("2024-01-02T08:00:00+00:00");
        let mut limiter = UsageLimiter::mount(MemoryStore::new(), &clock);
        limiter.try_consume(UsageKind::Chat);
        limiter.try_consume(UsageKind::Tools);
        limiter.try_consume(UsageKind::Tools);
        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.remaining(UsageKind::Chat), 5);
        assert_eq!(snapshot.remaining(UsageKind::Tools), 1);
        assert_eq!(snapshot.date, date(2024, 1, 2));
    }
}
