//! Reference-line repetition detector
//!
//! A horizontal line sits at a fixed fraction of the frame height. Every poll
//! where the head is within the tolerance band of the line counts as a touch;
//! touches are level-triggered, so dwelling on the line for several polls adds
//! several touches. Reaching the configured touch count records one repetition
//! and resets the touch counter.

use crate::types::RepetitionEvent;
use chrono::{DateTime, Utc};

/// Vertical pixel position of the reference line
pub fn reference_line_y(frame_height: u32, line_ratio: f64) -> f64 {
    (frame_height as f64 * line_ratio).floor()
}

/// Point-in-time test: is the head within `tolerance` pixels of the line
pub fn is_touching_line(head_y: f64, frame_height: u32, line_ratio: f64, tolerance: f64) -> bool {
    let line_y = reference_line_y(frame_height, line_ratio);
    head_y >= line_y - tolerance && head_y <= line_y + tolerance
}

#[derive(Debug, Clone)]
pub struct LineCrossingDetector {
    line_ratio: f64,
    tolerance: f64,
    touches_per_repetition: u32,
    line_touch_count: u32,
    repetition_count: u32,
    last_touch: bool,
}

impl LineCrossingDetector {
    pub fn new(line_ratio: f64, tolerance: f64, touches_per_repetition: u32) -> Self {
        Self {
            line_ratio,
            tolerance,
            touches_per_repetition: touches_per_repetition.max(1),
            line_touch_count: 0,
            repetition_count: 0,
            last_touch: false,
        }
    }

    /// Feed one head position; returns an event when a repetition completes
    pub fn observe(
        &mut self,
        head_y: f64,
        frame_height: u32,
        at: DateTime<Utc>,
    ) -> Option<RepetitionEvent> {
        self.last_touch = is_touching_line(head_y, frame_height, self.line_ratio, self.tolerance);
        if !self.last_touch {
            return None;
        }

        self.line_touch_count += 1;
        log::trace!(
            "line touch {}/{} at y={head_y:.1}",
            self.line_touch_count,
            self.touches_per_repetition
        );

        if self.line_touch_count < self.touches_per_repetition {
            return None;
        }

        self.line_touch_count = 0;
        self.repetition_count += 1;
        log::debug!("repetition {} completed (line crossing)", self.repetition_count);

        Some(RepetitionEvent {
            index: self.repetition_count,
            started_at: None,
            completed_at: at,
        })
    }

    pub fn line_touch_count(&self) -> u32 {
        self.line_touch_count
    }

    pub fn repetition_count(&self) -> u32 {
        self.repetition_count
    }

    /// Whether the most recent observation touched the line
    pub fn last_touch(&self) -> bool {
        self.last_touch
    }

    pub fn line_y(&self, frame_height: u32) -> f64 {
        reference_line_y(frame_height, self.line_ratio)
    }

    pub fn reset(&mut self) {
        self.line_touch_count = 0;
        self.repetition_count = 0;
        self.last_touch = false;
    }
}
