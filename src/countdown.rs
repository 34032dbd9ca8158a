//! Pre-workout countdown
//!
//! Ticked once per second. A 3-second countdown shows 3, 2, 1 on its first
//! three ticks and finishes on the fourth, which is when the workout starts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum CountdownState {
    /// Waiting for the first tick
    Pending,
    /// Value currently displayed
    Counting(u32),
    Finished,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    state: CountdownState,
}

impl Countdown {
    pub fn new(secs: u32) -> Self {
        let state = if secs == 0 {
            CountdownState::Finished
        } else {
            CountdownState::Pending
        };
        Self {
            remaining: secs,
            state,
        }
    }

    pub fn tick(&mut self) -> CountdownState {
        self.state = match self.state {
            CountdownState::Finished => CountdownState::Finished,
            _ if self.remaining == 0 => CountdownState::Finished,
            _ => {
                let shown = self.remaining;
                self.remaining -= 1;
                CountdownState::Counting(shown)
            }
        };
        self.state
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Ticks still to be displayed before the finishing tick
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.state == CountdownState::Finished
    }

    /// Value to display, if any. The starting value shows before the first tick.
    pub fn display(&self) -> Option<u32> {
        match self.state {
            CountdownState::Pending => Some(self.remaining),
            CountdownState::Counting(n) => Some(n),
            CountdownState::Finished => None,
        }
    }
}
