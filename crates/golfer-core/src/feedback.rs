use serde::{Deserialize, Serialize};

use crate::vision::PixelPoint;

/// Feedback when the locator could not find the ball at all. Distinct from
/// any coordinate-based phrase; the planner has to treat it as a full miss.
pub const BALL_LOST_FEEDBACK: &str =
    "I lost sight of the ball completely. It might be off the course.";

/// Per-axis miss distances (pixels) separating the phrase buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackThresholds {
    pub tiny: f64,
    pub moderate: f64,
    pub large: f64,
}

impl Default for FeedbackThresholds {
    fn default() -> Self {
        // Tuned for the 640x480 course camera.
        Self {
            tiny: 20.0,
            moderate: 80.0,
            large: 150.0,
        }
    }
}

/// Converts precise landing/hole coordinates into vague natural-language
/// feedback, one clause per axis.
///
/// Image coordinates: x grows rightward, y grows downward, tee at the bottom
/// of the frame. Positive `dx` means the ball stopped right of the hole,
/// positive `dy` means it stopped short.
pub fn fuzzy_feedback(
    ball: PixelPoint,
    hole: PixelPoint,
    thresholds: &FeedbackThresholds,
) -> String {
    let dx = ball.x - hole.x;
    let dy = ball.y - hole.y;

    let mut parts: Vec<String> = Vec::new();

    let side = if dx > 0.0 { "right" } else { "left" };
    let abs_dx = dx.abs();
    if abs_dx < thresholds.tiny {
        // Dead center laterally; not worth a clause.
    } else if abs_dx < thresholds.moderate {
        parts.push(format!("a little bit to the {side}"));
    } else if abs_dx < thresholds.large {
        parts.push(format!("too far to the {side}"));
    } else {
        parts.push(format!("way, way too far to the {side}"));
    }

    let length = if dy > 0.0 { "short" } else { "long" };
    let abs_dy = dy.abs();
    if abs_dy < thresholds.tiny {
        // On pace.
    } else if abs_dy < thresholds.moderate {
        parts.push(format!("just a little {length}"));
    } else if abs_dy < thresholds.large {
        parts.push(format!("quite {length}"));
    } else {
        parts.push(format!("way too {length}"));
    }

    if parts.is_empty() {
        return "You were incredibly close, almost in!".to_string();
    }
    format!("You were {}.", parts.join(" and "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> PixelPoint {
        PixelPoint { x, y }
    }

    #[test]
    fn both_axes_under_tiny_is_almost_in() {
        let got = fuzzy_feedback(at(325.0, 245.0), at(320.0, 240.0), &Default::default());
        assert_eq!(got, "You were incredibly close, almost in!");
    }

    #[test]
    fn lateral_misses_mirror_left_right() {
        let hole = at(320.0, 240.0);
        let thresholds = FeedbackThresholds::default();
        for d in [30.0, 100.0, 200.0] {
            let right = fuzzy_feedback(at(hole.x + d, hole.y), hole, &thresholds);
            let left = fuzzy_feedback(at(hole.x - d, hole.y), hole, &thresholds);
            assert_eq!(right.replace("right", "left"), left, "miss distance {d}");
        }
    }

    #[test]
    fn buckets_escalate_with_distance() {
        let hole = at(320.0, 240.0);
        let thresholds = FeedbackThresholds::default();
        assert_eq!(
            fuzzy_feedback(at(350.0, 240.0), hole, &thresholds),
            "You were a little bit to the right."
        );
        assert_eq!(
            fuzzy_feedback(at(420.0, 240.0), hole, &thresholds),
            "You were too far to the right."
        );
        assert_eq!(
            fuzzy_feedback(at(520.0, 240.0), hole, &thresholds),
            "You were way, way too far to the right."
        );
    }

    #[test]
    fn short_and_lateral_clauses_join_with_and() {
        let got = fuzzy_feedback(at(220.0, 330.0), at(320.0, 240.0), &Default::default());
        assert_eq!(got, "You were too far to the left and quite short.");
    }

    #[test]
    fn past_the_hole_reads_long() {
        let got = fuzzy_feedback(at(320.0, 80.0), at(320.0, 240.0), &Default::default());
        assert_eq!(got, "You were way too long.");
    }
}
