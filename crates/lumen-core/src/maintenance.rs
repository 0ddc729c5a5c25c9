//! Local maintenance window.
//!
//! While a window is counting down the shell renders nothing but the
//! countdown. The end instant lives in the store under
//! [`MAINTENANCE_END_KEY`] as epoch milliseconds; [`MAINTENANCE_MODE_KEY`]
//! remembers whether the last window was released by expiry or disabled by
//! an operator, so the reload after completion lands in the normal app.
//!
//! ```text
//! Unscheduled --(first check)--> CountingDown --(now >= end)--> Complete
//!      |                              ^                             |
//!      +--(marker present)--> Inactive +---- enable_maintenance_mode+
//!
//! A stored end that does not parse is discarded and lands in Inactive.
//! ```

use chrono::DateTime;
use chrono::Duration;
use chrono::FixedOffset;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::clock::Clock;
use crate::storage::KeyValueStore;

pub const MAINTENANCE_END_KEY: &str = "maintenanceEndTime";
pub const MAINTENANCE_MODE_KEY: &str = "maintenanceMode";

pub const DEFAULT_MAINTENANCE_HOURS: u32 = 15;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeMarker {
    Released,
    Disabled,
}

impl ModeMarker {
    fn as_str(self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::Disabled => "disabled",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "released" => Some(Self::Released),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceSettings {
    /// Schedule a window automatically when nothing is stored.
    pub enabled: bool,
    pub duration: Duration,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: Duration::hours(i64::from(DEFAULT_MAINTENANCE_HOURS)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn from_remaining_ms(remaining_ms: i64) -> Self {
        let remaining = remaining_ms.max(0);
        Self {
            hours: (remaining / MS_PER_HOUR) as u64,
            minutes: ((remaining % MS_PER_HOUR) / MS_PER_MINUTE) as u64,
            seconds: ((remaining % MS_PER_MINUTE) / MS_PER_SECOND) as u64,
        }
    }

    pub fn label(&self) -> String {
        format!("{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// What the end key held when last read. A value that does not parse
/// releases the app instead of re-arming a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoredEnd {
    Missing,
    At(i64),
    Corrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenancePhase {
    Unscheduled,
    CountingDown { ends_at_ms: i64 },
    Complete,
    Inactive,
}

/// What the shell should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Inactive,
    CountingDown(Countdown),
    Complete,
}

impl MaintenanceStatus {
    pub fn blocks_app(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inactive => "not in maintenance",
            Self::CountingDown(_) => "counting down",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug)]
pub struct MaintenanceWindow<S, C> {
    store: S,
    clock: C,
    settings: MaintenanceSettings,
    phase: MaintenancePhase,
}

impl<S: KeyValueStore, C: Clock> MaintenanceWindow<S, C> {
    pub fn mount(store: S, clock: C, settings: MaintenanceSettings) -> Self {
        let mut window = Self {
            store,
            clock,
            settings,
            phase: MaintenancePhase::Unscheduled,
        };
        window.check();
        window
    }

    /// One tick: schedule, keep counting, or expire.
    ///
    /// `Complete` and `Inactive` are sticky for the life of this window; only
    /// [`Self::enable_maintenance_mode`] leaves them.
    pub fn check(&mut self) -> MaintenanceStatus {
        if matches!(
            self.phase,
            MaintenancePhase::Complete | MaintenancePhase::Inactive
        ) {
            return self.status();
        }

        let now_ms = self.clock.now_ms();
        self.phase = match self.stored_end() {
            StoredEnd::At(ends_at_ms) if now_ms >= ends_at_ms => {
                info!("maintenance window finished");
                self.remove(MAINTENANCE_END_KEY);
                self.write_marker(ModeMarker::Released);
                MaintenancePhase::Complete
            }
            StoredEnd::At(ends_at_ms) => {
                debug!(remaining_ms = ends_at_ms - now_ms, "maintenance countdown tick");
                MaintenancePhase::CountingDown { ends_at_ms }
            }
            StoredEnd::Corrupt => {
                self.remove(MAINTENANCE_END_KEY);
                self.write_marker(ModeMarker::Released);
                MaintenancePhase::Inactive
            }
            StoredEnd::Missing if self.stored_marker().is_some() || !self.settings.enabled => {
                MaintenancePhase::Inactive
            }
            StoredEnd::Missing => self.schedule(now_ms),
        };
        self.status()
    }

    /// Re-arms a fresh window from now.
    pub fn enable_maintenance_mode(&mut self) -> MaintenanceStatus {
        self.remove(MAINTENANCE_MODE_KEY);
        let now_ms = self.clock.now_ms();
        self.phase = self.schedule(now_ms);
        self.status()
    }

    pub fn disable_maintenance_mode(&mut self) -> MaintenanceStatus {
        info!("maintenance mode disabled");
        self.remove(MAINTENANCE_END_KEY);
        self.write_marker(ModeMarker::Disabled);
        self.phase = MaintenancePhase::Inactive;
        self.status()
    }

    pub fn status(&self) -> MaintenanceStatus {
        match self.phase {
            MaintenancePhase::Unscheduled | MaintenancePhase::Inactive => {
                MaintenanceStatus::Inactive
            }
            MaintenancePhase::CountingDown { ends_at_ms } => MaintenanceStatus::CountingDown(
                Countdown::from_remaining_ms(ends_at_ms - self.clock.now_ms()),
            ),
            MaintenancePhase::Complete => MaintenanceStatus::Complete,
        }
    }

    pub fn phase(&self) -> MaintenancePhase {
        self.phase
    }

    pub fn ends_at(&self) -> Option<DateTime<FixedOffset>> {
        let MaintenancePhase::CountingDown { ends_at_ms } = self.phase else {
            return None;
        };
        let offset = *self.clock.now().offset();
        DateTime::<Utc>::from_timestamp_millis(ends_at_ms).map(|end| end.with_timezone(&offset))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn schedule(&mut self, now_ms: i64) -> MaintenancePhase {
        let ends_at_ms = now_ms.saturating_add(self.settings.duration.num_milliseconds());
        info!(
            hours = self.settings.duration.num_hours(),
            "maintenance window scheduled"
        );
        if let Err(err) = self.store.set(MAINTENANCE_END_KEY, ends_at_ms.to_string()) {
            warn!(key = MAINTENANCE_END_KEY, "failed to persist maintenance end: {err}");
        }
        MaintenancePhase::CountingDown { ends_at_ms }
    }

    fn stored_end(&self) -> StoredEnd {
        let Some(raw) = self.store.get(MAINTENANCE_END_KEY) else {
            return StoredEnd::Missing;
        };
        match raw.trim().parse::<i64>() {
            Ok(ms) => StoredEnd::At(ms),
            Err(err) => {
                warn!(key = MAINTENANCE_END_KEY, "discarding malformed maintenance end: {err}");
                StoredEnd::Corrupt
            }
        }
    }

    fn stored_marker(&self) -> Option<ModeMarker> {
        self.store
            .get(MAINTENANCE_MODE_KEY)
            .and_then(|raw| ModeMarker::parse(&raw))
    }

    fn write_marker(&mut self, marker: ModeMarker) {
        if let Err(err) = self
            .store
            .set(MAINTENANCE_MODE_KEY, marker.as_str().to_string())
        {
            warn!(key = MAINTENANCE_MODE_KEY, "failed to persist maintenance mode: {err}");
        }
    }

    fn remove(&mut self, key: &str) {
        if let Err(err) = self.store.remove(key) {
            warn!(key, "failed to clear maintenance key: {err}");
        }
    }
}
