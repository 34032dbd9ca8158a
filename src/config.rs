//! Counter configuration
//!
//! Every tunable of the detector, clock and overlay lives here. The two presets
//! reproduce the line-crossing and direction-reversal front-ends; anything else
//! is loaded from JSON with per-field defaults.

use crate::clock::ClockMode;
use crate::error::CounterError;
use crate::types::DetectorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Reference line position as a fraction of frame height
pub const DEFAULT_LINE_RATIO: f64 = 0.3;

/// Half-width of the band around the reference line that counts as touching
pub const DEFAULT_LINE_TOLERANCE_PX: f64 = 10.0;

/// Minimum head movement between polls to register a direction change
pub const DEFAULT_REVERSAL_THRESHOLD_PX: f64 = 5.0;

/// Line touches that make up one repetition
pub const DEFAULT_TOUCHES_PER_REPETITION: u32 = 2;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

pub const DEFAULT_CLOCK_INTERVAL_MS: u64 = 1000;

pub const DEFAULT_COUNTDOWN_SECS: u32 = 3;

/// Minimum score for a keypoint to be drawn
pub const DEFAULT_KEYPOINT_CONFIDENCE: f64 = 0.6;

/// Minimum score for both ends of a skeleton edge to be drawn
pub const DEFAULT_SKELETON_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    pub detector: DetectorKind,
    pub line_ratio: f64,
    pub line_tolerance_px: f64,
    pub reversal_threshold_px: f64,
    pub touches_per_repetition: u32,
    pub poll_interval_ms: u64,
    pub clock_interval_ms: u64,
    pub countdown_secs: u32,
    pub clock_mode: ClockMode,
    pub keypoint_confidence: f64,
    pub skeleton_confidence: f64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self::line_crossing()
    }
}

impl CounterConfig {
    /// Reference-line counter with a 3-2-1 countdown and a wall-clock timer
    pub fn line_crossing() -> Self {
        Self {
            detector: DetectorKind::LineCrossing,
            line_ratio: DEFAULT_LINE_RATIO,
            line_tolerance_px: DEFAULT_LINE_TOLERANCE_PX,
            reversal_threshold_px: DEFAULT_REVERSAL_THRESHOLD_PX,
            touches_per_repetition: DEFAULT_TOUCHES_PER_REPETITION,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            clock_interval_ms: DEFAULT_CLOCK_INTERVAL_MS,
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            clock_mode: ClockMode::Precise,
            keypoint_confidence: DEFAULT_KEYPOINT_CONFIDENCE,
            skeleton_confidence: DEFAULT_SKELETON_CONFIDENCE,
        }
    }

    /// Up-then-down counter that starts immediately and counts whole ticks
    pub fn direction_reversal() -> Self {
        Self {
            detector: DetectorKind::DirectionReversal,
            countdown_secs: 0,
            clock_mode: ClockMode::Coarse,
            ..Self::line_crossing()
        }
    }

    /// Preset for a detector kind
    pub fn for_detector(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::LineCrossing => Self::line_crossing(),
            DetectorKind::DirectionReversal => Self::direction_reversal(),
        }
    }

    /// Parse a config. Fields the JSON leaves out come from the preset of the
    /// detector it names, or the line-crossing preset if it names none.
    pub fn from_json(json: &str) -> Result<Self, CounterError> {
        Self::from_json_for(json, None)
    }

    /// Like `from_json`, but `detector` (when given) replaces the JSON's own
    /// choice and supplies the preset the JSON fields are laid over
    pub fn from_json_for(json: &str, detector: Option<DetectorKind>) -> Result<Self, CounterError> {
        let Value::Object(mut fields) = serde_json::from_str::<Value>(json)? else {
            return Err(CounterError::InvalidConfig(
                "config must be a JSON object".to_string(),
            ));
        };

        let kind = match (detector, fields.remove("detector")) {
            (Some(kind), _) => kind,
            (None, Some(named)) => serde_json::from_value(named)?,
            (None, None) => DetectorKind::default(),
        };

        let mut merged = serde_json::to_value(Self::for_detector(kind))?;
        if let Value::Object(base) = &mut merged {
            base.extend(fields);
        }
        let config: CounterConfig = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CounterError> {
        Self::load_for(path, None)
    }

    pub fn load_for(path: &Path, detector: Option<DetectorKind>) -> Result<Self, CounterError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CounterError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_for(&content, detector)
    }

    pub fn to_json(&self) -> Result<String, CounterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), CounterError> {
        if !(self.line_ratio > 0.0 && self.line_ratio < 1.0) {
            return Err(CounterError::InvalidConfig(format!(
                "line_ratio must be between 0 and 1, got {}",
                self.line_ratio
            )));
        }
        if self.line_tolerance_px < 0.0 {
            return Err(CounterError::InvalidConfig(
                "line_tolerance_px must not be negative".to_string(),
            ));
        }
        if self.reversal_threshold_px < 0.0 {
            return Err(CounterError::InvalidConfig(
                "reversal_threshold_px must not be negative".to_string(),
            ));
        }
        if self.touches_per_repetition == 0 {
            return Err(CounterError::InvalidConfig(
                "touches_per_repetition must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 || self.clock_interval_ms == 0 {
            return Err(CounterError::InvalidConfig(
                "poll and clock intervals must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("keypoint_confidence", self.keypoint_confidence),
            ("skeleton_confidence", self.skeleton_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CounterError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_presets() {
        let a = CounterConfig::line_crossing();
        assert_eq!(a.detector, DetectorKind::LineCrossing);
        assert_eq!(a.countdown_secs, 3);
        assert_eq!(a.clock_mode, ClockMode::Precise);

        let b = CounterConfig::direction_reversal();
        assert_eq!(b.detector, DetectorKind::DirectionReversal);
        assert_eq!(b.countdown_secs, 0);
        assert_eq!(b.clock_mode, ClockMode::Coarse);
        assert_eq!(b.reversal_threshold_px, 5.0);
        assert_eq!(b.poll_interval_ms, 100);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CounterConfig::from_json(r#"{ "line_tolerance_px": 15.0 }"#).unwrap();
        assert_eq!(config.line_tolerance_px, 15.0);
        assert_eq!(config.line_ratio, DEFAULT_LINE_RATIO);
        assert_eq!(config.detector, DetectorKind::LineCrossing);
    }

    #[test]
    fn test_partial_json_takes_named_detector_preset() {
        let config = CounterConfig::from_json(r#"{ "detector": "direction_reversal" }"#).unwrap();
        assert_eq!(config, CounterConfig::direction_reversal());

        let config = CounterConfig::from_json(
            r#"{ "detector": "direction_reversal", "reversal_threshold_px": 8.0 }"#,
        )
        .unwrap();
        assert_eq!(config.countdown_secs, 0);
        assert_eq!(config.clock_mode, ClockMode::Coarse);
        assert_eq!(config.reversal_threshold_px, 8.0);
    }

    #[test]
    fn test_detector_override_starts_from_its_preset() {
        let json = r#"{ "line_tolerance_px": 12.0 }"#;
        let config =
            CounterConfig::from_json_for(json, Some(DetectorKind::DirectionReversal)).unwrap();
        assert_eq!(config.detector, DetectorKind::DirectionReversal);
        assert_eq!(config.countdown_secs, 0);
        assert_eq!(config.clock_mode, ClockMode::Coarse);
        assert_eq!(config.line_tolerance_px, 12.0);

        // The override wins over the detector named in the file
        let json = r#"{ "detector": "line_crossing" }"#;
        let config =
            CounterConfig::from_json_for(json, Some(DetectorKind::DirectionReversal)).unwrap();
        assert_eq!(config, CounterConfig::direction_reversal());
    }

    #[test]
    fn test_non_object_json_rejected() {
        assert!(matches!(
            CounterConfig::from_json("[1, 2]"),
            Err(CounterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = CounterConfig::direction_reversal();
        let json = config.to_json().unwrap();
        assert_eq!(CounterConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CounterConfig::default();
        config.line_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = CounterConfig::default();
        config.touches_per_repetition = 0;
        assert!(config.validate().is_err());

        let mut config = CounterConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CounterConfig::default();
        config.skeleton_confidence = 1.2;
        assert!(config.validate().is_err());

        assert!(CounterConfig::from_json(r#"{ "line_tolerance_px": -1.0 }"#).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            CounterConfig::from_json("not json"),
            Err(CounterError::JsonError(_))
        ));
    }
}
