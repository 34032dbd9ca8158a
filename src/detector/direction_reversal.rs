//! Up-then-down repetition detector
//!
//! Two states: idle, and in progress since the head last rose by more than the
//! threshold. A drop of more than the threshold while in progress closes the
//! repetition. The previous head position always tracks the latest poll.

use crate::types::RepetitionEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReversalState {
    #[default]
    Idle,
    InProgress { started_at: DateTime<Utc> },
}

#[derive(Debug, Clone)]
pub struct DirectionReversalDetector {
    threshold: f64,
    state: ReversalState,
    previous_head_y: Option<f64>,
    repetition_count: u32,
    last_completed: Option<RepetitionEvent>,
}

impl DirectionReversalDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            state: ReversalState::Idle,
            previous_head_y: None,
            repetition_count: 0,
            last_completed: None,
        }
    }

    /// Feed one head position; returns an event when a repetition completes
    pub fn observe(&mut self, head_y: f64, at: DateTime<Utc>) -> Option<RepetitionEvent> {
        let previous = self.previous_head_y.replace(head_y)?;

        match self.state {
            // Image y grows downwards: a smaller y means the head moved up
            ReversalState::Idle if head_y < previous - self.threshold => {
                log::debug!("repetition started: head rose {:.1}px", previous - head_y);
                self.state = ReversalState::InProgress { started_at: at };
                None
            }
            ReversalState::InProgress { started_at } if head_y > previous + self.threshold => {
                self.state = ReversalState::Idle;
                self.repetition_count += 1;
                log::debug!(
                    "repetition {} completed (direction reversal) in {}ms",
                    self.repetition_count,
                    (at - started_at).num_milliseconds()
                );

                let event = RepetitionEvent {
                    index: self.repetition_count,
                    started_at: Some(started_at),
                    completed_at: at,
                };
                self.last_completed = Some(event.clone());
                Some(event)
            }
            _ => None,
        }
    }

    pub fn state(&self) -> ReversalState {
        self.state
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.state, ReversalState::InProgress { .. })
    }

    pub fn previous_head_y(&self) -> Option<f64> {
        self.previous_head_y
    }

    pub fn repetition_count(&self) -> u32 {
        self.repetition_count
    }

    pub fn last_completed(&self) -> Option<&RepetitionEvent> {
        self.last_completed.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = ReversalState::Idle;
        self.previous_head_y = None;
        self.repetition_count = 0;
        self.last_completed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(poll: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap() + Duration::milliseconds(poll * 100)
    }

    #[test]
    fn test_rise_then_drop_counts_one() {
        let mut d = DirectionReversalDetector::new(5.0);

        assert!(d.observe(200.0, t(0)).is_none());
        assert_eq!(d.state(), ReversalState::Idle);

        assert!(d.observe(190.0, t(1)).is_none());
        assert_eq!(d.state(), ReversalState::InProgress { started_at: t(1) });

        let event = d.observe(210.0, t(2)).unwrap();
        assert_eq!(d.state(), ReversalState::Idle);
        assert_eq!(d.repetition_count(), 1);
        assert_eq!(event.index, 1);
        assert_eq!(event.started_at, Some(t(1)));
        assert_eq!(event.completed_at, t(2));
        assert_eq!(d.last_completed(), Some(&event));
    }

    #[test]
    fn test_small_movement_is_ignored() {
        let mut d = DirectionReversalDetector::new(5.0);
        d.observe(200.0, t(0));
        d.observe(198.0, t(1));
        assert_eq!(d.state(), ReversalState::Idle);
        assert_eq!(d.repetition_count(), 0);
        assert_eq!(d.previous_head_y(), Some(198.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut d = DirectionReversalDetector::new(5.0);
        d.observe(200.0, t(0));
        d.observe(195.0, t(1));
        assert!(!d.is_in_progress());
        d.observe(189.9, t(2));
        assert!(d.is_in_progress());
        d.observe(194.9, t(3));
        assert!(d.is_in_progress());
    }

    #[test]
    fn test_unchanged_position_is_idempotent() {
        let mut d = DirectionReversalDetector::new(5.0);
        d.observe(200.0, t(0));
        d.observe(190.0, t(1));
        for i in 2..50 {
            assert!(d.observe(190.0, t(i)).is_none());
        }
        assert_eq!(d.repetition_count(), 0);
        assert!(d.is_in_progress());
    }

    #[test]
    fn test_drop_while_idle_does_nothing() {
        let mut d = DirectionReversalDetector::new(5.0);
        d.observe(100.0, t(0));
        d.observe(200.0, t(1));
        assert_eq!(d.state(), ReversalState::Idle);
        assert_eq!(d.repetition_count(), 0);
    }

    #[test]
    fn test_previous_position_tracks_every_poll() {
        let mut d = DirectionReversalDetector::new(5.0);
        // Slow rise in 3px steps never crosses the per-poll threshold
        for (i, y) in [200.0, 197.0, 194.0, 191.0, 188.0].iter().enumerate() {
            d.observe(*y, t(i as i64));
        }
        assert_eq!(d.previous_head_y(), Some(188.0));
        assert!(!d.is_in_progress());
    }

    #[test]
    fn test_multiple_repetitions() {
        let mut d = DirectionReversalDetector::new(5.0);
        let ys = [300.0, 250.0, 320.0, 260.0, 330.0, 240.0, 310.0];
        let completed: Vec<u32> = ys
            .iter()
            .enumerate()
            .filter_map(|(i, y)| d.observe(*y, t(i as i64)))
            .map(|e| e.index)
            .collect();
        assert_eq!(completed, vec![1, 2, 3]);
    }

    #[test]
    fn test_reset() {
        let mut d = DirectionReversalDetector::new(5.0);
        d.observe(200.0, t(0));
        d.observe(190.0, t(1));
        d.observe(210.0, t(2));
        d.reset();
        assert_eq!(d.repetition_count(), 0);
        assert_eq!(d.previous_head_y(), None);
        assert!(d.last_completed().is_none());
    }
}
