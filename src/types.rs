//! Core types for the burpee counter
//!
//! This module defines the data that flows from the pose source through the
//! repetition detector: keypoints, poses, recorded frames, and the events and
//! classifications the detector emits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 2D position in the pixel space of the current video frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// COCO body landmarks, in the order pose models emit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    /// All landmarks in model output order
    pub const ALL: [KeypointKind; 17] = [
        KeypointKind::Nose,
        KeypointKind::LeftEye,
        KeypointKind::RightEye,
        KeypointKind::LeftEar,
        KeypointKind::RightEar,
        KeypointKind::LeftShoulder,
        KeypointKind::RightShoulder,
        KeypointKind::LeftElbow,
        KeypointKind::RightElbow,
        KeypointKind::LeftWrist,
        KeypointKind::RightWrist,
        KeypointKind::LeftHip,
        KeypointKind::RightHip,
        KeypointKind::LeftKnee,
        KeypointKind::RightKnee,
        KeypointKind::LeftAnkle,
        KeypointKind::RightAnkle,
    ];

    /// Position of this landmark in a model's keypoint array
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeypointKind::Nose => "nose",
            KeypointKind::LeftEye => "leftEye",
            KeypointKind::RightEye => "rightEye",
            KeypointKind::LeftEar => "leftEar",
            KeypointKind::RightEar => "rightEar",
            KeypointKind::LeftShoulder => "leftShoulder",
            KeypointKind::RightShoulder => "rightShoulder",
            KeypointKind::LeftElbow => "leftElbow",
            KeypointKind::RightElbow => "rightElbow",
            KeypointKind::LeftWrist => "leftWrist",
            KeypointKind::RightWrist => "rightWrist",
            KeypointKind::LeftHip => "leftHip",
            KeypointKind::RightHip => "rightHip",
            KeypointKind::LeftKnee => "leftKnee",
            KeypointKind::RightKnee => "rightKnee",
            KeypointKind::LeftAnkle => "leftAnkle",
            KeypointKind::RightAnkle => "rightAnkle",
        }
    }
}

/// A labeled landmark estimate with a confidence score in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub part: KeypointKind,
    pub position: Point,
    pub score: f64,
}

impl Keypoint {
    pub fn new(part: KeypointKind, x: f64, y: f64, score: f64) -> Self {
        Self {
            part,
            position: Point::new(x, y),
            score,
        }
    }

    /// Whether this keypoint clears a confidence threshold
    pub fn is_confident(&self, min_confidence: f64) -> bool {
        self.score >= min_confidence
    }
}

/// All keypoints for one detected subject in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub score: f64,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        let score = if keypoints.is_empty() {
            0.0
        } else {
            keypoints.iter().map(|k| k.score).sum::<f64>() / keypoints.len() as f64
        };
        Self { keypoints, score }
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Head proxy
    pub fn nose(&self) -> Option<&Keypoint> {
        self.landmark(KeypointKind::Nose)
    }

    pub fn left_eye(&self) -> Option<&Keypoint> {
        self.landmark(KeypointKind::LeftEye)
    }

    pub fn right_eye(&self) -> Option<&Keypoint> {
        self.landmark(KeypointKind::RightEye)
    }

    /// Keypoint at its standard index when it carries the expected label,
    /// otherwise the first keypoint with that label
    fn landmark(&self, kind: KeypointKind) -> Option<&Keypoint> {
        match self.keypoints.get(kind.index()) {
            Some(k) if k.part == kind => Some(k),
            _ => self.get(kind),
        }
    }

    /// Look up a landmark by label rather than by position
    pub fn get(&self, kind: KeypointKind) -> Option<&Keypoint> {
        self.keypoints.iter().find(|k| k.part == kind)
    }
}

/// Dimensions of the video frame a pose was estimated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// One poll result: the frame size and the estimated pose, if the video was ready
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub size: FrameSize,
    #[serde(default)]
    pub pose: Option<Pose>,
}

impl PoseFrame {
    pub fn new(timestamp: DateTime<Utc>, size: FrameSize, pose: Pose) -> Self {
        Self {
            timestamp,
            size,
            pose: Some(pose),
        }
    }

    /// A frame polled before the video was ready
    pub fn not_ready(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            size: FrameSize::default(),
            pose: None,
        }
    }

    /// Vertical position of the head proxy, when present
    pub fn head_y(&self) -> Option<f64> {
        self.pose
            .as_ref()
            .and_then(|p| p.nose())
            .map(|k| k.position.y)
    }
}

/// Informational head direction derived from nose vs eye positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadDirection {
    Up,
    Down,
    #[default]
    Neutral,
}

impl HeadDirection {
    /// Text shown in the readout; neutral renders as an empty string
    pub fn label(&self) -> &'static str {
        match self {
            HeadDirection::Up => "Up",
            HeadDirection::Down => "Down",
            HeadDirection::Neutral => "",
        }
    }
}

/// Repetition-detection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Head touches a fixed reference line twice per repetition
    #[default]
    LineCrossing,
    /// Head moves up then down past a pixel threshold
    DirectionReversal,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::LineCrossing => "line_crossing",
            DetectorKind::DirectionReversal => "direction_reversal",
        }
    }
}

/// A completed repetition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionEvent {
    /// Cumulative repetition count after this event (1-based)
    pub index: u32,
    /// When the repetition began, if the detector tracks it
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}
