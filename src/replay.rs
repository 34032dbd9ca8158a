//! Deterministic replay of recorded frames
//!
//! Drives a session from frame timestamps instead of the wall clock, so a
//! recording always yields the same snapshots and summary.

use crate::overlay::{render_frame, CommandRecorder, DrawCommand};
use crate::session::{PollOutcome, SessionSnapshot, WorkoutSession};
use crate::summary::WorkoutSummary;
use crate::types::{PoseFrame, RepetitionEvent};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Record overlay draw commands for every observed frame
    pub overlay: bool,
}

/// Draw commands produced for a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOverlay {
    pub timestamp: DateTime<Utc>,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    /// One snapshot per one-second trigger
    pub snapshots: Vec<SessionSnapshot>,
    pub events: Vec<RepetitionEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<FrameOverlay>,
    pub summary: WorkoutSummary,
}

pub fn replay_frames(session: WorkoutSession, frames: Vec<PoseFrame>) -> ReplayReport {
    replay_frames_with(session, frames, ReplayOptions::default())
}

pub fn replay_frames_with(
    mut session: WorkoutSession,
    mut frames: Vec<PoseFrame>,
    options: ReplayOptions,
) -> ReplayReport {
    frames.sort_by_key(|f| f.timestamp);

    let mut snapshots = Vec::new();
    let mut events = Vec::new();
    let mut overlays = Vec::new();
    let mut recorder = CommandRecorder::new();

    let (Some(first), Some(last)) = (
        frames.first().map(|f| f.timestamp),
        frames.last().map(|f| f.timestamp),
    ) else {
        log::debug!("replay with no frames");
        return ReplayReport {
            snapshots,
            events,
            overlays,
            summary: session.summary(),
        };
    };

    let interval = Duration::milliseconds(session.config().clock_interval_ms as i64);
    let mut next_tick = first + interval;
    session.begin(first);

    for frame in &frames {
        while next_tick <= frame.timestamp {
            session.tick_second(next_tick);
            snapshots.push(session.snapshot());
            next_tick += interval;
        }

        if let PollOutcome::Observed {
            repetition: Some(event),
            ..
        } = session.observe_frame(frame)
        {
            events.push(event);
        }

        if options.overlay && frame.pose.is_some() {
            render_frame(&mut recorder, frame, &session.snapshot(), session.config());
            overlays.push(FrameOverlay {
                timestamp: frame.timestamp,
                commands: recorder.take(),
            });
        }
    }

    session.stop(last);
    log::debug!(
        "replayed {} frames: {} repetitions",
        frames.len(),
        session.repetition_count()
    );

    ReplayReport {
        snapshots,
        events,
        overlays,
        summary: session.summary(),
    }
}
