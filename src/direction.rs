//! Head direction classification
//!
//! Compares the nose against both eyes on each poll. Purely informational; the
//! result never feeds the repetition counter.

use crate::types::{HeadDirection, Pose};

/// Nose strictly above both eyes is "Up", strictly below both is "Down"
pub fn classify_head_direction(nose_y: f64, left_eye_y: f64, right_eye_y: f64) -> HeadDirection {
    if nose_y < left_eye_y && nose_y < right_eye_y {
        HeadDirection::Up
    } else if nose_y > left_eye_y && nose_y > right_eye_y {
        HeadDirection::Down
    } else {
        HeadDirection::Neutral
    }
}

impl HeadDirection {
    /// Classify from a pose; neutral when the nose or either eye is missing
    pub fn from_pose(pose: &Pose) -> Self {
        match (pose.nose(), pose.left_eye(), pose.right_eye()) {
            (Some(nose), Some(left), Some(right)) => {
                classify_head_direction(nose.position.y, left.position.y, right.position.y)
            }
            _ => HeadDirection::Neutral,
        }
    }
}
