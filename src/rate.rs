//! Repetition rate metrics and elapsed-time formatting
//!
//! Rates are pure functions of the repetition count and elapsed time and hold
//! no state of their own.

use serde::{Deserialize, Serialize};

const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RateMetrics {
    pub per_minute: f64,
    pub per_hour: f64,
}

impl RateMetrics {
    /// Compute rates; zero elapsed time yields zero rates rather than NaN/inf
    pub fn compute(repetitions: u32, elapsed_ms: u64) -> Self {
        Self {
            per_minute: rate(repetitions, elapsed_ms as f64 / MS_PER_MINUTE),
            per_hour: rate(repetitions, elapsed_ms as f64 / MS_PER_HOUR),
        }
    }

    /// Rates rounded to one decimal place for display
    pub fn rounded(&self) -> Self {
        Self {
            per_minute: round_to_tenth(self.per_minute),
            per_hour: round_to_tenth(self.per_hour),
        }
    }
}

fn rate(repetitions: u32, units: f64) -> f64 {
    if units <= 0.0 {
        return 0.0;
    }
    let value = repetitions as f64 / units;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Elapsed milliseconds as zero-padded `MM:SS`
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let minutes = elapsed_ms / 60_000;
    let seconds = (elapsed_ms / 1000) % 60;
    format!("{minutes:02}:{seconds:02}")
}
