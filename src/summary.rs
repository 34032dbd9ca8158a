//! End-of-workout summary
//!
//! Encodes a session into a self-describing JSON report carrying producer
//! metadata, timing, the repetition count and derived rates.

use crate::error::CounterError;
use crate::rate::{format_elapsed, RateMetrics};
use crate::session::{PollStats, WorkoutSession};
use crate::types::DetectorKind;
use crate::{COUNTER_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryProducer {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub session_id: String,
    pub producer: SummaryProducer,
    pub detector: DetectorKind,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub elapsed_display: String,
    pub repetitions: u32,
    pub per_minute: f64,
    pub per_hour: f64,
    pub polls: PollStats,
}

impl WorkoutSummary {
    pub fn from_session(session: &WorkoutSession) -> Self {
        let clock = session.clock();
        let repetitions = session.repetition_count();
        let elapsed_ms = clock.elapsed_ms();
        let rates = RateMetrics::compute(repetitions, elapsed_ms).rounded();

        Self {
            session_id: session.id().to_string(),
            producer: SummaryProducer {
                name: PRODUCER_NAME.to_string(),
                version: COUNTER_VERSION.to_string(),
            },
            detector: session.detector().kind(),
            started_at: clock.started_at(),
            ended_at: clock.stopped_at().or(clock.last_tick()),
            elapsed_ms,
            elapsed_display: format_elapsed(elapsed_ms),
            repetitions,
            per_minute: rates.per_minute,
            per_hour: rates.per_hour,
            polls: session.stats(),
        }
    }

    pub fn to_json(&self) -> Result<String, CounterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl WorkoutSession {
    pub fn summary(&self) -> WorkoutSummary {
        WorkoutSummary::from_session(self)
    }
}
