//! Overlay drawing
//!
//! The canvas is an external collaborator: this module only decides what to
//! draw and issues calls through [`OverlayRenderer`]. Nothing is read back.

use crate::config::CounterConfig;
use crate::detector::reference_line_y;
use crate::session::{SessionPhase, SessionSnapshot};
use crate::types::{Keypoint, KeypointKind, PoseFrame};
use serde::{Deserialize, Serialize};

/// Radius of the highlighted head point
pub const HEAD_POINT_RADIUS: f64 = 5.0;

/// Vertical gap between the head point and its label
pub const HEAD_LABEL_OFFSET: f64 = 10.0;

/// Limb connections drawn by the skeleton pass
pub const SKELETON_EDGES: [(KeypointKind, KeypointKind); 12] = [
    (KeypointKind::LeftShoulder, KeypointKind::RightShoulder),
    (KeypointKind::LeftShoulder, KeypointKind::LeftElbow),
    (KeypointKind::LeftElbow, KeypointKind::LeftWrist),
    (KeypointKind::RightShoulder, KeypointKind::RightElbow),
    (KeypointKind::RightElbow, KeypointKind::RightWrist),
    (KeypointKind::LeftShoulder, KeypointKind::LeftHip),
    (KeypointKind::RightShoulder, KeypointKind::RightHip),
    (KeypointKind::LeftHip, KeypointKind::RightHip),
    (KeypointKind::LeftHip, KeypointKind::LeftKnee),
    (KeypointKind::LeftKnee, KeypointKind::LeftAnkle),
    (KeypointKind::RightHip, KeypointKind::RightKnee),
    (KeypointKind::RightKnee, KeypointKind::RightAnkle),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayColor {
    Red,
    Green,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Drawing primitives offered by the canvas
pub trait OverlayRenderer {
    fn draw_reference_line(&mut self, y: f64, width: f64, color: OverlayColor);
    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f64);
    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f64);
    fn draw_point(&mut self, y: f64, x: f64, radius: f64, color: OverlayColor);
    fn draw_text(&mut self, text: &str, x: f64, y: f64, align: TextAlign, color: OverlayColor);
}

/// Skeleton segments whose endpoints both clear the confidence threshold
pub fn confident_segments(keypoints: &[Keypoint], min_confidence: f64) -> Vec<(Keypoint, Keypoint)> {
    let find = |kind: KeypointKind| {
        keypoints
            .iter()
            .find(|k| k.part == kind && k.is_confident(min_confidence))
            .copied()
    };
    SKELETON_EDGES
        .iter()
        .filter_map(|(a, b)| Some((find(*a)?, find(*b)?)))
        .collect()
}

/// Text readout lines, in display order. While counting down, the countdown
/// value takes the timer's place.
pub fn readout_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    let lead = if snapshot.phase == SessionPhase::Countdown {
        snapshot.countdown.map(|n| n.to_string()).unwrap_or_default()
    } else {
        format!("Timer: {}", snapshot.elapsed_display)
    };
    vec![
        lead,
        format!("Burpee Count: {}", snapshot.repetitions),
        format!("Burpees Per Minute: {:.1}", snapshot.per_minute),
        format!("Burpees Per Hour: {:.1}", snapshot.per_hour),
        format!("Head Direction: {}", snapshot.head_direction.label()),
    ]
}

/// Draw one frame: reference line, pose, head marker, then the metrics text
pub fn render_frame(
    renderer: &mut dyn OverlayRenderer,
    frame: &PoseFrame,
    snapshot: &SessionSnapshot,
    config: &CounterConfig,
) {
    let width = frame.size.width as f64;
    let height = frame.size.height as f64;

    if let Some(on_line) = snapshot.head_on_line {
        let color = if on_line {
            OverlayColor::Green
        } else {
            OverlayColor::Red
        };
        renderer.draw_reference_line(
            reference_line_y(frame.size.height, config.line_ratio),
            width,
            color,
        );
    }

    let Some(pose) = frame.pose.as_ref() else {
        return;
    };

    renderer.draw_keypoints(&pose.keypoints, config.keypoint_confidence);
    renderer.draw_skeleton(&pose.keypoints, config.skeleton_confidence);

    if let Some(head) = pose.nose() {
        let (x, y) = (head.position.x, head.position.y);
        renderer.draw_point(y, x, HEAD_POINT_RADIUS, OverlayColor::Red);
        renderer.draw_text("Head", x, y - HEAD_LABEL_OFFSET, TextAlign::Center, OverlayColor::Red);
    }

    let lines = readout_lines(snapshot);
    // Timer stays hidden until the countdown ends
    if let Some(timer) = lines.first().filter(|_| snapshot.phase != SessionPhase::Countdown) {
        renderer.draw_text(
            timer,
            width / 2.0,
            height + 30.0,
            TextAlign::Center,
            OverlayColor::White,
        );
    }
    for (i, line) in lines.iter().skip(1).take(3).enumerate() {
        renderer.draw_text(
            line,
            10.0,
            height + 60.0 + 30.0 * i as f64,
            TextAlign::Left,
            OverlayColor::White,
        );
    }
    if let Some(direction) = lines.get(4) {
        renderer.draw_text(
            direction,
            width - 10.0,
            height + 60.0,
            TextAlign::Right,
            OverlayColor::White,
        );
    }
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    ReferenceLine {
        y: f64,
        width: f64,
        color: OverlayColor,
    },
    Keypoint {
        part: KeypointKind,
        x: f64,
        y: f64,
    },
    Segment {
        from: KeypointKind,
        to: KeypointKind,
    },
    Point {
        x: f64,
        y: f64,
        radius: f64,
        color: OverlayColor,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        align: TextAlign,
        color: OverlayColor,
    },
}

/// Renderer that records commands instead of painting them
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Hand back the recorded commands and start a fresh frame
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl OverlayRenderer for CommandRecorder {
    fn draw_reference_line(&mut self, y: f64, width: f64, color: OverlayColor) {
        self.commands.push(DrawCommand::ReferenceLine { y, width, color });
    }

    fn draw_keypoints(&mut self, keypoints: &[Keypoint], min_confidence: f64) {
        self.commands.extend(
            keypoints
                .iter()
                .filter(|k| k.is_confident(min_confidence))
                .map(|k| DrawCommand::Keypoint {
                    part: k.part,
                    x: k.position.x,
                    y: k.position.y,
                }),
        );
    }

    fn draw_skeleton(&mut self, keypoints: &[Keypoint], min_confidence: f64) {
        self.commands.extend(
            confident_segments(keypoints, min_confidence)
                .into_iter()
                .map(|(a, b)| DrawCommand::Segment {
                    from: a.part,
                    to: b.part,
                }),
        );
    }

    fn draw_point(&mut self, y: f64, x: f64, radius: f64, color: OverlayColor) {
        self.commands.push(DrawCommand::Point { x, y, radius, color });
    }

    fn draw_text(&mut self, text: &str, x: f64, y: f64, align: TextAlign, color: OverlayColor) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            align,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PollStats;
    use crate::types::{DetectorKind, FrameSize, HeadDirection, Pose};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn snapshot(phase: SessionPhase, head_on_line: Option<bool>) -> SessionSnapshot {
        SessionSnapshot {
            phase,
            countdown: None,
            detector: DetectorKind::LineCrossing,
            repetitions: 4,
            elapsed_ms: 125_000,
            elapsed_display: "02:05".to_string(),
            per_minute: 1.9,
            per_hour: 115.2,
            head_direction: HeadDirection::Down,
            head_on_line,
            polls: PollStats::default(),
        }
    }

    fn body_frame() -> PoseFrame {
        let mut keypoints: Vec<Keypoint> = KeypointKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| Keypoint::new(*kind, 300.0 + i as f64, 140.0 + 10.0 * i as f64, 0.9))
            .collect();
        // Below the skeleton threshold but above the keypoint threshold
        keypoints[KeypointKind::LeftWrist.index()].score = 0.65;
        // Below both
        keypoints[KeypointKind::RightAnkle.index()].score = 0.1;
        PoseFrame::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap(),
            FrameSize::new(640, 480),
            Pose::new(keypoints),
        )
    }

    #[test]
    fn test_confident_segments() {
        let frame = body_frame();
        let segments = confident_segments(&frame.pose.unwrap().keypoints, 0.7);
        // 12 edges minus left elbow-wrist and right knee-ankle
        assert_eq!(segments.len(), 10);
    }

    #[test]
    fn test_render_active_frame() {
        let mut recorder = CommandRecorder::new();
        let config = CounterConfig::line_crossing();
        render_frame(&mut recorder, &body_frame(), &snapshot(SessionPhase::Active, Some(true)), &config);

        let commands = recorder.take();
        assert_eq!(
            commands[0],
            DrawCommand::ReferenceLine {
                y: 144.0,
                width: 640.0,
                color: OverlayColor::Green
            }
        );

        let keypoints = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Keypoint { .. }))
            .count();
        assert_eq!(keypoints, 16);

        assert!(commands.contains(&DrawCommand::Point {
            x: 300.0,
            y: 140.0,
            radius: HEAD_POINT_RADIUS,
            color: OverlayColor::Red
        }));

        let texts: Vec<&str> = commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Head",
                "Timer: 02:05",
                "Burpee Count: 4",
                "Burpees Per Minute: 1.9",
                "Burpees Per Hour: 115.2",
                "Head Direction: Down",
            ]
        );
        assert!(recorder.commands().is_empty());
    }

    #[test]
    fn test_line_is_red_when_not_touching() {
        let mut recorder = CommandRecorder::new();
        render_frame(
            &mut recorder,
            &body_frame(),
            &snapshot(SessionPhase::Active, Some(false)),
            &CounterConfig::line_crossing(),
        );
        assert!(matches!(
            recorder.commands()[0],
            DrawCommand::ReferenceLine {
                color: OverlayColor::Red,
                ..
            }
        ));
    }

    #[test]
    fn test_no_line_without_line_detector() {
        let mut recorder = CommandRecorder::new();
        render_frame(
            &mut recorder,
            &body_frame(),
            &snapshot(SessionPhase::Active, None),
            &CounterConfig::direction_reversal(),
        );
        assert!(!recorder
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCommand::ReferenceLine { .. })));
    }

    #[test]
    fn test_countdown_readout() {
        let mut snap = snapshot(SessionPhase::Countdown, Some(false));
        snap.countdown = Some(2);
        assert_eq!(readout_lines(&snap)[0], "2");
        assert_eq!(readout_lines(&snap)[1], "Burpee Count: 4");

        let mut recorder = CommandRecorder::new();
        render_frame(&mut recorder, &body_frame(), &snap, &CounterConfig::line_crossing());
        let texts: Vec<&str> = recorder
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Head",
                "Burpee Count: 4",
                "Burpees Per Minute: 1.9",
                "Burpees Per Hour: 115.2",
                "Head Direction: Down",
            ]
        );
    }

    #[test]
    fn test_color_names() {
        for (color, name) in [
            (OverlayColor::Red, "red"),
            (OverlayColor::Green, "green"),
            (OverlayColor::White, "white"),
        ] {
            assert_eq!(serde_json::to_value(color).unwrap(), name);
        }
        assert!(serde_json::from_str::<OverlayColor>(r#""aqua""#).is_err());
    }

    #[test]
    fn test_draw_command_json() {
        let json = serde_json::to_value(DrawCommand::Point {
            x: 1.0,
            y: 2.0,
            radius: 5.0,
            color: OverlayColor::Red,
        })
        .unwrap();
        assert_eq!(json["op"], "point");
        assert_eq!(json["color"], "red");
    }
}
