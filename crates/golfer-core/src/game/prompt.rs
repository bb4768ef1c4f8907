use super::memory::GameMemory;
use super::wire::DecisionLimits;

/// Builds the per-shot planning prompt.
///
/// The hole location is deliberately withheld: the planner has to steer from
/// shot feedback alone. The same memory therefore always rebuilds an
/// equivalent prompt, which is what makes planner retries safe.
pub fn build_shot_prompt(mem: &GameMemory, limits: &DecisionLimits) -> String {
    let history = if mem.history().is_empty() {
        "No previous shots.".to_string()
    } else {
        mem.history()
            .iter()
            .map(|record| record.summary())
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are at the tee. Shot #{}.\n\
         The hole location is unknown to you, rely on feedback.\n\
         History:\n{}\n\
         Choose your shot:\n\
         - aim_degrees (strictly between {} and {})\n\
         - strike_force (0-100)\n\
         - commentary (keep it very short, under 10 words)",
        mem.next_shot_index(),
        history,
        limits.min_aim,
        limits.max_aim,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::memory::ShotRecord;

    #[test]
    fn first_prompt_has_no_history() {
        let prompt = build_shot_prompt(&GameMemory::default(), &DecisionLimits::default());
        assert!(prompt.contains("Shot #1."));
        assert!(prompt.contains("History:\nNo previous shots."));
        assert!(prompt.contains("strictly between 45 and 135"));
    }

    #[test]
    fn later_prompts_replay_every_shot() {
        let mut mem = GameMemory::default();
        for index in 1..=2 {
            mem.record(ShotRecord {
                index,
                aim_degrees: 90.0,
                force_percent: 60,
                landing: None,
                feedback: "You were quite short.".to_string(),
            });
        }
        let prompt = build_shot_prompt(&mem, &DecisionLimits::default());
        assert!(prompt.contains("Shot #3."));
        assert!(prompt.contains("Shot 1: Aim 90.0, Force 60."));
        assert!(prompt.contains("Shot 2: Aim 90.0, Force 60."));
    }
}
