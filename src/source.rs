//! Pose source boundary
//!
//! The pose model and camera are opaque collaborators. A source is polled once
//! per poll tick and either returns a frame, reports that it is not ready, or
//! reports that inference failed. Recorded frames can be replayed from NDJSON.

use crate::error::CounterError;
use crate::types::PoseFrame;
use std::collections::VecDeque;

pub trait PoseSource {
    /// `Ok(None)` means the source is exhausted and the session should end
    fn poll(&mut self) -> Result<Option<PoseFrame>, CounterError>;
}

/// Frames that fail this check are skipped by the session
pub fn validate_frame(frame: &PoseFrame) -> Result<(), CounterError> {
    let Some(pose) = frame.pose.as_ref() else {
        return Err(CounterError::PoseSourceUnavailable(
            "video not ready".to_string(),
        ));
    };
    if pose.is_empty() {
        return Err(CounterError::MissingKeypoint("pose has no keypoints".to_string()));
    }
    if frame.size.height == 0 {
        return Err(CounterError::ParseError("frame height must be positive".to_string()));
    }
    match pose.nose() {
        Some(nose) if nose.position.y.is_finite() => Ok(()),
        _ => Err(CounterError::MissingKeypoint("nose".to_string())),
    }
}

/// How a recorded frame will be treated when observed
#[derive(Debug)]
pub enum FrameStatus {
    Usable,
    /// Warm-up frame with no pose yet; a normal skipped poll
    NotReady,
    Invalid(CounterError),
}

pub fn classify_frame(frame: &PoseFrame) -> FrameStatus {
    match validate_frame(frame) {
        Ok(()) => FrameStatus::Usable,
        Err(CounterError::PoseSourceUnavailable(_)) => FrameStatus::NotReady,
        Err(e) => FrameStatus::Invalid(e),
    }
}

/// Parse newline-delimited JSON frames, skipping blank lines
pub fn parse_frames_ndjson(input: &str) -> Result<Vec<PoseFrame>, CounterError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<PoseFrame>(line.trim()).map_err(|e| {
                CounterError::ParseError(format!("Frame on line {}: {}", i + 1, e))
            })
        })
        .collect()
}

/// Replays recorded frames in order
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    frames: VecDeque<PoseFrame>,
}

impl ReplaySource {
    pub fn new(frames: Vec<PoseFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn from_ndjson(input: &str) -> Result<Self, CounterError> {
        Ok(Self::new(parse_frames_ndjson(input)?))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PoseSource for ReplaySource {
    fn poll(&mut self) -> Result<Option<PoseFrame>, CounterError> {
        match self.frames.pop_front() {
            Some(frame) if frame.pose.is_none() => Err(CounterError::PoseSourceUnavailable(
                format!("video not ready at {}", frame.timestamp.to_rfc3339()),
            )),
            other => Ok(other),
        }
    }
}
