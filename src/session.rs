//! Workout session state
//!
//! A single owned record holds everything that changes during a workout: the
//! detector, the clock, the countdown, and the latest head readings. Callers
//! drive it with two triggers, `poll` (every poll interval) and `tick_second`
//! (every clock interval), and read it back through `snapshot`.

use crate::clock::SessionClock;
use crate::config::CounterConfig;
use crate::countdown::{Countdown, CountdownState};
use crate::detector::{is_touching_line, HeadObservation, RepetitionDetector};
use crate::error::CounterError;
use crate::rate::{format_elapsed, RateMetrics};
use crate::source::{validate_frame, PoseSource};
use crate::types::{DetectorKind, HeadDirection, PoseFrame, RepetitionEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for the countdown to finish; polls update the readout only
    Countdown,
    /// Clock running, detector counting
    Active,
    Stopped,
}

/// Per-session poll bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PollStats {
    /// Polls that produced a usable pose
    pub observed: u64,
    /// Polls skipped because the video or pose was not ready, or the frame
    /// was unusable
    pub skipped: u64,
    /// Polls where inference itself failed
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NotReady,
    MissingKeypoint(String),
    /// Frame itself is unusable, e.g. zero height
    InvalidFrame(String),
    InferenceFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Observed {
        head_direction: HeadDirection,
        head_on_line: Option<bool>,
        repetition: Option<RepetitionEvent>,
    },
    Skipped(SkipReason),
    /// Source has no more frames
    Exhausted,
    /// Session already stopped; nothing was polled
    Stopped,
}

/// Display surface: everything the readout and overlay show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub countdown: Option<u32>,
    pub detector: DetectorKind,
    pub repetitions: u32,
    pub elapsed_ms: u64,
    pub elapsed_display: String,
    pub per_minute: f64,
    pub per_hour: f64,
    pub head_direction: HeadDirection,
    pub head_on_line: Option<bool>,
    pub polls: PollStats,
}

#[derive(Debug)]
pub struct WorkoutSession {
    id: Uuid,
    config: CounterConfig,
    detector: RepetitionDetector,
    clock: SessionClock,
    countdown: Countdown,
    head_direction: HeadDirection,
    head_on_line: Option<bool>,
    last_frame: Option<PoseFrame>,
    stats: PollStats,
    stopped: bool,
}

impl WorkoutSession {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            detector: RepetitionDetector::from_config(&config),
            clock: SessionClock::new(config.clock_mode, config.clock_interval_ms),
            countdown: Countdown::new(config.countdown_secs),
            head_direction: HeadDirection::Neutral,
            head_on_line: None,
            last_frame: None,
            stats: PollStats::default(),
            stopped: false,
            config,
        }
    }

    /// Validate the config before building a session
    pub fn try_new(config: CounterConfig) -> Result<Self, CounterError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Mark the pose source as ready. Starts the clock straight away when
    /// there is no countdown; otherwise the countdown runs on `tick_second`.
    pub fn begin(&mut self, at: DateTime<Utc>) {
        if self.countdown.is_finished() {
            self.start(at);
        }
    }

    /// Start the workout now, skipping any remaining countdown
    pub fn start(&mut self, at: DateTime<Utc>) {
        if self.stopped || self.clock.is_running() {
            return;
        }
        self.clock.start(at);
        log::info!(
            "session {} started ({})",
            self.id,
            self.detector.kind().as_str()
        );
    }

    /// One-second trigger: advance the countdown, or the clock once running
    pub fn tick_second(&mut self, at: DateTime<Utc>) -> SessionPhase {
        if self.stopped {
            return SessionPhase::Stopped;
        }
        if self.clock.is_running() {
            self.clock.tick(at);
            return SessionPhase::Active;
        }
        if self.countdown.tick() == CountdownState::Finished {
            self.start(at);
        } else {
            log::debug!("countdown {:?}", self.countdown.display());
        }
        self.phase()
    }

    /// End the workout and freeze the clock; later polls and ticks are ignored
    pub fn stop(&mut self, at: DateTime<Utc>) {
        if self.stopped {
            return;
        }
        self.clock.stop(at);
        self.stopped = true;
        log::info!(
            "session {} stopped: {} repetitions in {}",
            self.id,
            self.repetition_count(),
            format_elapsed(self.clock.elapsed_ms())
        );
    }

    /// Poll trigger: pull one frame from the source and observe it
    pub fn poll(&mut self, source: &mut dyn PoseSource) -> PollOutcome {
        if self.stopped {
            return PollOutcome::Stopped;
        }
        match source.poll() {
            Ok(Some(frame)) => self.observe_frame(&frame),
            Ok(None) => PollOutcome::Exhausted,
            Err(e) => self.skip(e),
        }
    }

    /// Observe a frame that was already obtained from a pose source
    pub fn observe_frame(&mut self, frame: &PoseFrame) -> PollOutcome {
        if self.stopped {
            return PollOutcome::Stopped;
        }
        if let Err(e) = validate_frame(frame) {
            return self.skip(e);
        }
        let (Some(pose), Some(head_y)) = (frame.pose.as_ref(), frame.head_y()) else {
            return self.skip(CounterError::MissingKeypoint("nose".to_string()));
        };

        self.head_direction = HeadDirection::from_pose(pose);
        self.head_on_line = match self.config.detector {
            DetectorKind::LineCrossing => Some(is_touching_line(
                head_y,
                frame.size.height,
                self.config.line_ratio,
                self.config.line_tolerance_px,
            )),
            DetectorKind::DirectionReversal => None,
        };

        let repetition = if self.clock.is_running() {
            self.detector.observe(&HeadObservation {
                head_y,
                frame_height: frame.size.height,
                at: frame.timestamp,
            })
        } else {
            None
        };

        self.stats.observed += 1;
        self.last_frame = Some(frame.clone());

        PollOutcome::Observed {
            head_direction: self.head_direction,
            head_on_line: self.head_on_line,
            repetition,
        }
    }

    fn skip(&mut self, error: CounterError) -> PollOutcome {
        match error {
            CounterError::PoseSourceUnavailable(_) => {
                self.stats.skipped += 1;
                PollOutcome::Skipped(SkipReason::NotReady)
            }
            CounterError::MissingKeypoint(what) => {
                self.stats.skipped += 1;
                PollOutcome::Skipped(SkipReason::MissingKeypoint(what))
            }
            CounterError::InferenceFailed(msg) => {
                log::warn!("pose inference failed, skipping poll: {msg}");
                self.stats.failed += 1;
                PollOutcome::Skipped(SkipReason::InferenceFailed(msg))
            }
            other => {
                log::debug!("unusable frame, skipping poll: {other}");
                self.stats.skipped += 1;
                PollOutcome::Skipped(SkipReason::InvalidFrame(other.to_string()))
            }
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.stopped {
            SessionPhase::Stopped
        } else if self.clock.is_running() {
            SessionPhase::Active
        } else {
            SessionPhase::Countdown
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let repetitions = self.repetition_count();
        let elapsed_ms = self.clock.elapsed_ms();
        let rates = RateMetrics::compute(repetitions, elapsed_ms).rounded();

        SessionSnapshot {
            phase: self.phase(),
            countdown: self.countdown.display(),
            detector: self.detector.kind(),
            repetitions,
            elapsed_ms,
            elapsed_display: format_elapsed(elapsed_ms),
            per_minute: rates.per_minute,
            per_hour: rates.per_hour,
            head_direction: self.head_direction,
            head_on_line: self.head_on_line,
            polls: self.stats,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    pub fn detector(&self) -> &RepetitionDetector {
        &self.detector
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn repetition_count(&self) -> u32 {
        self.detector.repetition_count()
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Most recent frame that produced a usable pose
    pub fn last_frame(&self) -> Option<&PoseFrame> {
        self.last_frame.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReplaySource;
    use crate::types::{FrameSize, Keypoint, KeypointKind, Pose};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn frame(ms: i64, head_y: f64) -> PoseFrame {
        PoseFrame::new(
            t(ms),
            FrameSize::new(640, 480),
            Pose::new(vec![
                Keypoint::new(KeypointKind::Nose, 320.0, head_y, 0.9),
                Keypoint::new(KeypointKind::LeftEye, 330.0, head_y + 10.0, 0.9),
                Keypoint::new(KeypointKind::RightEye, 310.0, head_y + 12.0, 0.9),
            ]),
        )
    }

    fn active_session(config: CounterConfig) -> WorkoutSession {
        let mut session = WorkoutSession::new(config);
        session.start(t(0));
        session
    }

    #[test]
    fn test_countdown_gates_counting() {
        let mut session = WorkoutSession::new(CounterConfig::line_crossing());
        session.begin(t(0));
        assert_eq!(session.phase(), SessionPhase::Countdown);
        assert_eq!(session.snapshot().countdown, Some(3));

        // Touches during the countdown update the readout but never count
        for i in 0..4 {
            session.observe_frame(&frame(i * 100, 144.0));
        }
        assert_eq!(session.repetition_count(), 0);
        assert_eq!(session.snapshot().head_on_line, Some(true));

        assert_eq!(session.tick_second(t(1000)), SessionPhase::Countdown);
        assert_eq!(session.snapshot().countdown, Some(3));
        session.tick_second(t(2000));
        session.tick_second(t(3000));
        assert_eq!(session.snapshot().countdown, Some(1));
        assert_eq!(session.tick_second(t(4000)), SessionPhase::Active);
        assert_eq!(session.clock().started_at(), Some(t(4000)));
        assert_eq!(session.snapshot().countdown, None);
    }

    #[test]
    fn test_direction_reversal_begins_immediately() {
        let mut session = WorkoutSession::new(CounterConfig::direction_reversal());
        session.begin(t(0));
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn test_partial_reversal_config_begins_immediately() {
        let config = CounterConfig::from_json(r#"{"detector":"direction_reversal"}"#).unwrap();
        let mut session = WorkoutSession::new(config);
        session.begin(t(0));
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.snapshot().countdown, None);
    }

    #[test]
    fn test_line_crossing_sequence() {
        let mut session = active_session(CounterConfig::line_crossing());
        let outcomes: Vec<PollOutcome> = [100.0, 140.0, 100.0, 140.0]
            .iter()
            .enumerate()
            .map(|(i, y)| session.observe_frame(&frame(i as i64 * 100, *y)))
            .collect();

        assert_eq!(session.repetition_count(), 1);
        match &outcomes[3] {
            PollOutcome::Observed {
                repetition: Some(event),
                head_on_line: Some(true),
                head_direction: HeadDirection::Up,
            } => assert_eq!(event.index, 1),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_direction_reversal_sequence() {
        let mut session = active_session(CounterConfig::direction_reversal());
        for (i, y) in [200.0, 190.0, 210.0].iter().enumerate() {
            session.observe_frame(&frame(i as i64 * 100, *y));
        }
        assert_eq!(session.repetition_count(), 1);
        assert_eq!(session.snapshot().head_on_line, None);
    }

    #[test]
    fn test_skipped_polls_preserve_state() {
        let mut session = active_session(CounterConfig::line_crossing());
        session.observe_frame(&frame(0, 140.0));

        let mut empty = frame(100, 140.0);
        empty.pose = Some(Pose::default());
        assert_eq!(
            session.observe_frame(&empty),
            PollOutcome::Skipped(SkipReason::MissingKeypoint("pose has no keypoints".to_string()))
        );
        assert_eq!(
            session.observe_frame(&PoseFrame::not_ready(t(200))),
            PollOutcome::Skipped(SkipReason::NotReady)
        );

        match session.detector() {
            RepetitionDetector::LineCrossing(d) => assert_eq!(d.line_touch_count(), 1),
            _ => panic!("expected line crossing detector"),
        }
        assert_eq!(session.stats().observed, 1);
        assert_eq!(session.stats().skipped, 2);
        assert_eq!(session.last_frame().unwrap().timestamp, t(0));
    }

    #[test]
    fn test_zero_height_frame_is_skipped_not_failed() {
        let mut session = active_session(CounterConfig::line_crossing());
        let mut flat = frame(0, 144.0);
        flat.size.height = 0;

        match session.observe_frame(&flat) {
            PollOutcome::Skipped(SkipReason::InvalidFrame(msg)) => {
                assert!(msg.contains("height"))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(session.stats().skipped, 1);
        assert_eq!(session.stats().failed, 0);
    }

    struct FailingSource;

    impl PoseSource for FailingSource {
        fn poll(&mut self) -> Result<Option<PoseFrame>, CounterError> {
            Err(CounterError::InferenceFailed("backend lost".to_string()))
        }
    }

    #[test]
    fn test_inference_failure_is_recovered() {
        let mut session = active_session(CounterConfig::line_crossing());
        let outcome = session.poll(&mut FailingSource);
        assert_eq!(
            outcome,
            PollOutcome::Skipped(SkipReason::InferenceFailed("backend lost".to_string()))
        );
        assert_eq!(session.stats().failed, 1);
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn test_poll_from_source() {
        let mut session = active_session(CounterConfig::line_crossing());
        let mut source = ReplaySource::new(vec![frame(0, 144.0), frame(100, 144.0)]);
        session.poll(&mut source);
        session.poll(&mut source);
        assert_eq!(session.repetition_count(), 1);
        assert_eq!(session.poll(&mut source), PollOutcome::Exhausted);
    }

    #[test]
    fn test_snapshot_rates() {
        let mut session = active_session(CounterConfig::line_crossing());
        for i in 0..6 {
            session.observe_frame(&frame(i * 100, 144.0));
        }
        session.tick_second(t(90_000));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.repetitions, 3);
        assert_eq!(snapshot.elapsed_ms, 90_000);
        assert_eq!(snapshot.elapsed_display, "01:30");
        assert_eq!(snapshot.per_minute, 2.0);
        assert_eq!(snapshot.per_hour, 120.0);
        assert_eq!(snapshot.phase, SessionPhase::Active);
    }

    #[test]
    fn test_snapshot_before_any_tick_has_zero_rates() {
        let mut session = active_session(CounterConfig::line_crossing());
        session.observe_frame(&frame(0, 144.0));
        session.observe_frame(&frame(100, 144.0));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.repetitions, 1);
        assert_eq!(snapshot.per_minute, 0.0);
        assert_eq!(snapshot.per_hour, 0.0);
    }

    #[test]
    fn test_stop_freezes_session() {
        let mut session = active_session(CounterConfig::line_crossing());
        session.tick_second(t(1000));
        session.stop(t(1500));

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert_eq!(session.observe_frame(&frame(1600, 144.0)), PollOutcome::Stopped);
        assert_eq!(session.tick_second(t(2000)), SessionPhase::Stopped);
        assert_eq!(session.snapshot().elapsed_ms, 1500);
        assert_eq!(session.poll(&mut FailingSource), PollOutcome::Stopped);
    }

    #[test]
    fn test_try_new_validates() {
        let mut config = CounterConfig::default();
        config.line_ratio = 0.0;
        assert!(WorkoutSession::try_new(config).is_err());
    }
}
