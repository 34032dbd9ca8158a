//! Burpee Counter - pose-driven repetition counting for workout sessions
//!
//! A pose source yields one set of body keypoints per poll. The session turns
//! the head position into repetitions with one of two detectors, keeps an
//! elapsed-time clock behind a start countdown, and derives per-minute and
//! per-hour rates.
//!
//! ## Detectors
//!
//! - **Line crossing**: a repetition is a fixed number of polls with the head
//!   on a horizontal reference line
//! - **Direction reversal**: a repetition is an upward head move followed by a
//!   downward one
//!
//! ## Driving a session
//!
//! - [`SessionRunner`] polls a live [`PoseSource`] on its own thread
//! - [`replay_frames`] walks recorded frames using their timestamps
//! - the C ABI in [`ffi`] leaves both triggers to the host

pub mod clock;
pub mod config;
pub mod countdown;
pub mod detector;
pub mod direction;
pub mod error;
pub mod overlay;
pub mod rate;
pub mod replay;
pub mod runner;
pub mod session;
pub mod source;
pub mod summary;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::CounterConfig;
pub use detector::{DirectionReversalDetector, LineCrossingDetector, RepetitionDetector};
pub use error::CounterError;
pub use replay::{replay_frames, replay_frames_with, ReplayOptions, ReplayReport};
pub use runner::{RunHandle, SessionRunner};
pub use session::{SessionPhase, SessionSnapshot, WorkoutSession};
pub use source::{PoseSource, ReplaySource};
pub use summary::WorkoutSummary;
pub use types::{DetectorKind, HeadDirection, Keypoint, KeypointKind, Pose, PoseFrame};

/// Library version embedded in every summary
pub const COUNTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for summaries
pub const PRODUCER_NAME: &str = "burpee-counter";
