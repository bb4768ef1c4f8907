use serde::{Deserialize, Serialize};

use crate::vision::PixelPoint;

/// One completed shot. Immutable once appended; the ordered sequence is the
/// only memory the planner ever sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub index: u32,
    pub aim_degrees: f64,
    pub force_percent: u8,
    /// Where the ball came to rest, `None` when the locator lost it.
    pub landing: Option<PixelPoint>,
    pub feedback: String,
}

impl ShotRecord {
    /// The one-line form used in prompts and in the planner's tool response.
    pub fn summary(&self) -> String {
        format!(
            "Shot {}: Aim {:.1}, Force {}. Result: {}",
            self.index, self.aim_degrees, self.force_percent, self.feedback
        )
    }
}

/// Per-game state: the calibrated hole position and the shot history.
#[derive(Debug, Default)]
pub struct GameMemory {
    /// Established once during calibration, immutable afterwards.
    pub hole: Option<PixelPoint>,
    history: Vec<ShotRecord>,
}

impl GameMemory {
    pub fn history(&self) -> &[ShotRecord] {
        &self.history
    }

    pub fn shots_taken(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn next_shot_index(&self) -> u32 {
        self.shots_taken() + 1
    }

    pub fn record(&mut self, record: ShotRecord) {
        self.history.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_shape() {
        let record = ShotRecord {
            index: 3,
            aim_degrees: 92.0,
            force_percent: 70,
            landing: Some(PixelPoint { x: 300.0, y: 200.0 }),
            feedback: "You were quite short.".to_string(),
        };
        assert_eq!(
            record.summary(),
            "Shot 3: Aim 92.0, Force 70. Result: You were quite short."
        );
    }

    #[test]
    fn shot_index_advances_only_on_record() {
        let mut mem = GameMemory::default();
        assert_eq!(mem.next_shot_index(), 1);
        mem.record(ShotRecord {
            index: 1,
            aim_degrees: 90.0,
            force_percent: 50,
            landing: None,
            feedback: "lost".to_string(),
        });
        assert_eq!(mem.shots_taken(), 1);
        assert_eq!(mem.next_shot_index(), 2);
    }
}
