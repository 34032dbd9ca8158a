//! Session clock
//!
//! Tracks elapsed workout time. The precise mode recomputes elapsed time from
//! the start timestamp on every tick; the coarse mode adds one interval per
//! tick regardless of wall time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// elapsed = now - start
    #[default]
    Precise,
    /// elapsed += interval per tick
    Coarse,
}

#[derive(Debug, Clone)]
pub struct SessionClock {
    mode: ClockMode,
    interval_ms: u64,
    started_at: Option<DateTime<Utc>>,
    last_tick: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    elapsed_ms: u64,
}

impl SessionClock {
    pub fn new(mode: ClockMode, interval_ms: u64) -> Self {
        Self {
            mode,
            interval_ms,
            started_at: None,
            last_tick: None,
            stopped_at: None,
            elapsed_ms: 0,
        }
    }

    /// Start timing; a second call while running is ignored
    pub fn start(&mut self, at: DateTime<Utc>) {
        if self.started_at.is_some() {
            return;
        }
        self.started_at = Some(at);
        self.last_tick = Some(at);
        self.elapsed_ms = 0;
    }

    /// Advance the clock; no-op unless running. Elapsed time never decreases.
    pub fn tick(&mut self, at: DateTime<Utc>) -> u64 {
        let Some(started_at) = self.started_at else {
            return self.elapsed_ms;
        };
        if self.stopped_at.is_some() {
            return self.elapsed_ms;
        }

        let next = match self.mode {
            ClockMode::Precise => (at - started_at).num_milliseconds().max(0) as u64,
            ClockMode::Coarse => self.elapsed_ms + self.interval_ms,
        };
        self.elapsed_ms = self.elapsed_ms.max(next);
        self.last_tick = Some(at);
        self.elapsed_ms
    }

    /// Freeze elapsed time. A precise clock takes one final reading first.
    pub fn stop(&mut self, at: DateTime<Utc>) {
        if self.started_at.is_none() || self.stopped_at.is_some() {
            return;
        }
        if self.mode == ClockMode::Precise {
            self.tick(at);
        }
        self.stopped_at = Some(at);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.last_tick
    }

    pub fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    #[test]
    fn test_precise_clock_uses_wall_time() {
        let mut clock = SessionClock::new(ClockMode::Precise, 1000);
        clock.start(t(0));
        assert!(clock.is_running());
        assert_eq!(clock.tick(t(1003)), 1003);
        assert_eq!(clock.tick(t(2010)), 2010);
        assert_eq!(clock.last_tick(), Some(t(2010)));
    }

    #[test]
    fn test_coarse_clock_counts_ticks() {
        let mut clock = SessionClock::new(ClockMode::Coarse, 1000);
        clock.start(t(0));
        clock.tick(t(1500));
        clock.tick(t(1600));
        assert_eq!(clock.elapsed_ms(), 2000);
    }

    #[test]
    fn test_tick_before_start_is_noop() {
        let mut clock = SessionClock::new(ClockMode::Precise, 1000);
        assert_eq!(clock.tick(t(5000)), 0);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_elapsed_never_decreases() {
        let mut clock = SessionClock::new(ClockMode::Precise, 1000);
        clock.start(t(0));
        clock.tick(t(3000));
        clock.tick(t(2000));
        assert_eq!(clock.elapsed_ms(), 3000);
    }

    #[test]
    fn test_stop_freezes_elapsed() {
        let mut clock = SessionClock::new(ClockMode::Precise, 1000);
        clock.start(t(0));
        clock.tick(t(1000));
        clock.stop(t(1500));
        assert_eq!(clock.elapsed_ms(), 1500);
        assert!(!clock.is_running());

        clock.tick(t(9000));
        assert_eq!(clock.elapsed_ms(), 1500);
        assert_eq!(clock.stopped_at(), Some(t(1500)));
    }

    #[test]
    fn test_restart_ignored() {
        let mut clock = SessionClock::new(ClockMode::Precise, 1000);
        clock.start(t(0));
        clock.start(t(5000));
        assert_eq!(clock.started_at(), Some(t(0)));
    }
}
