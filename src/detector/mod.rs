//! Repetition detection
//!
//! One detector abstraction over two strategies, selected by configuration:
//! reference-line touches or head direction reversals.

pub mod direction_reversal;
pub mod line_crossing;

pub use direction_reversal::{DirectionReversalDetector, ReversalState};
pub use line_crossing::{is_touching_line, reference_line_y, LineCrossingDetector};

use crate::config::CounterConfig;
use crate::types::{DetectorKind, RepetitionEvent};
use chrono::{DateTime, Utc};

/// Head position observed on one poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadObservation {
    pub head_y: f64,
    pub frame_height: u32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RepetitionDetector {
    LineCrossing(LineCrossingDetector),
    DirectionReversal(DirectionReversalDetector),
}

impl RepetitionDetector {
    pub fn from_config(config: &CounterConfig) -> Self {
        match config.detector {
            DetectorKind::LineCrossing => RepetitionDetector::LineCrossing(
                LineCrossingDetector::new(
                    config.line_ratio,
                    config.line_tolerance_px,
                    config.touches_per_repetition,
                ),
            ),
            DetectorKind::DirectionReversal => RepetitionDetector::DirectionReversal(
                DirectionReversalDetector::new(config.reversal_threshold_px),
            ),
        }
    }

    /// Feed one observation; returns an event when a repetition completes
    pub fn observe(&mut self, obs: &HeadObservation) -> Option<RepetitionEvent> {
        match self {
            RepetitionDetector::LineCrossing(d) => d.observe(obs.head_y, obs.frame_height, obs.at),
            RepetitionDetector::DirectionReversal(d) => d.observe(obs.head_y, obs.at),
        }
    }

    pub fn repetition_count(&self) -> u32 {
        match self {
            RepetitionDetector::LineCrossing(d) => d.repetition_count(),
            RepetitionDetector::DirectionReversal(d) => d.repetition_count(),
        }
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            RepetitionDetector::LineCrossing(_) => DetectorKind::LineCrossing,
            RepetitionDetector::DirectionReversal(_) => DetectorKind::DirectionReversal,
        }
    }

    pub fn reset(&mut self) {
        match self {
            RepetitionDetector::LineCrossing(d) => d.reset(),
            RepetitionDetector::DirectionReversal(d) => d.reset(),
        }
    }
}
