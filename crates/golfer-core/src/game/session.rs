use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{info, warn};

use super::memory::{GameMemory, ShotRecord};
use super::prompt::build_shot_prompt;
use super::rig::{Announcer, BallLocator, GolfRig};
use super::wire::{DecisionLimits, ShotDecision};
use crate::feedback::{BALL_LOST_FEEDBACK, FeedbackThresholds, fuzzy_feedback};
use crate::vision::PixelPoint;

/// A decision the planner committed to, plus the tool-call id its outcome
/// must be reported under.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedShot {
    pub decision: ShotDecision,
    pub call_id: String,
}

/// The external shot planner. One forced tool invocation per planning turn;
/// a failed turn must leave the planner's conversation untouched so the next
/// attempt re-issues an equivalent prompt.
pub trait ShotPlanner: Send + Sync {
    fn plan_shot<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<PlannedShot>> + Send + 'a>>;

    /// Folds the outcome of an executed shot back into the conversation.
    fn record_result(&self, call_id: String, summary: String);

    /// Free-text side remarks (celebration, miss reactions).
    fn banter<'a>(
        &'a self,
        prompt: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Landing within this many pixels of the hole wins the game.
    pub win_radius: f64,
    /// Wall-clock wait for the ball to stop rolling after a strike.
    pub settle: Duration,
    /// Game ends cleanly after this many shots, when set.
    pub max_shots: Option<u32>,
    pub limits: DecisionLimits,
    pub thresholds: FeedbackThresholds,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            win_radius: 25.0,
            settle: Duration::from_secs(10),
            max_shots: None,
            limits: DecisionLimits::default(),
            thresholds: FeedbackThresholds::default(),
        }
    }
}

/// Game phases, advanced one transition per [`GameSession::step`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Homing,
    CalibratingHole,
    AwaitingDecision,
    ExecutingShot(PlannedShot),
    Settling(PlannedShot),
    LocatingBall(PlannedShot),
    Evaluating {
        planned: PlannedShot,
        landing: Option<PixelPoint>,
    },
    Won,
    Finished,
}

/// What a single step did; the driver reacts to a few of these (sleeping on
/// `Settling`, stopping on the terminal outcomes).
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Homed,
    HoleCalibrated {
        hole: PixelPoint,
    },
    /// Planner exchange failed; same phase next step, counter untouched.
    DecisionDeferred {
        reason: String,
    },
    ShotPlanned {
        decision: ShotDecision,
    },
    ShotExecuted,
    /// Ball is rolling; wait this long before stepping again.
    Settling {
        wait: Duration,
    },
    BallLocated {
        landing: Option<PixelPoint>,
    },
    Missed {
        distance: Option<f64>,
        feedback: String,
    },
    Won {
        distance: f64,
    },
    Finished {
        shots: u32,
    },
}

pub struct GameSession {
    pub phase: Phase,
    pub memory: GameMemory,
    cfg: SessionConfig,
}

impl GameSession {
    pub fn new(cfg: SessionConfig) -> Self {
        Self {
            phase: Phase::Homing,
            memory: GameMemory::default(),
            cfg,
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::Won | Phase::Finished)
    }

    /// Advances the game by exactly one phase transition.
    ///
    /// Hardware and calibration errors bubble up; the caller decides whether
    /// they end the run. Planner failures and vision misses do not: they are
    /// recovered in place per the phase rules.
    pub async fn step(
        &mut self,
        rig: &mut dyn GolfRig,
        planner: &dyn ShotPlanner,
        locator: &mut dyn BallLocator,
        announcer: &dyn Announcer,
    ) -> anyhow::Result<StepOutcome> {
        match self.phase.clone() {
            Phase::Homing => {
                rig.home()?;
                self.phase = Phase::CalibratingHole;
                Ok(StepOutcome::Homed)
            }

            Phase::CalibratingHole => {
                // The reference ball sits where the hole is; one locate pass
                // captures it, then the actuator returns the ball to the tee.
                let hole = locator.locate()?.ok_or_else(|| {
                    anyhow::anyhow!("calibration failed: reference ball not visible")
                })?;
                self.memory.hole = Some(hole);
                rig.reset_ball()?;
                info!(x = hole.x, y = hole.y, "hole position calibrated");
                self.phase = Phase::AwaitingDecision;
                Ok(StepOutcome::HoleCalibrated { hole })
            }

            Phase::AwaitingDecision => {
                if let Some(cap) = self.cfg.max_shots
                    && self.memory.shots_taken() >= cap
                {
                    info!(shots = cap, "shot cap reached");
                    self.phase = Phase::Finished;
                    return Ok(StepOutcome::Finished { shots: cap });
                }

                let prompt = build_shot_prompt(&self.memory, &self.cfg.limits);
                match planner.plan_shot(prompt).await {
                    Ok(planned) => {
                        info!(
                            shot = self.memory.next_shot_index(),
                            aim = planned.decision.aim_degrees,
                            force = planned.decision.force_percent,
                            "shot planned"
                        );
                        announcer.say(&planned.decision.commentary);
                        let decision = planned.decision.clone();
                        self.phase = Phase::ExecutingShot(planned);
                        Ok(StepOutcome::ShotPlanned { decision })
                    }
                    Err(err) => {
                        let reason = format!("{err:#}");
                        warn!(error = %reason, "planner call failed, retrying same shot");
                        Ok(StepOutcome::DecisionDeferred { reason })
                    }
                }
            }

            Phase::ExecutingShot(planned) => {
                rig.aim(planned.decision.aim_degrees)?;
                rig.strike(planned.decision.force_percent)?;
                self.phase = Phase::Settling(planned);
                Ok(StepOutcome::ShotExecuted)
            }

            Phase::Settling(planned) => {
                let wait = self.cfg.settle;
                self.phase = Phase::LocatingBall(planned);
                Ok(StepOutcome::Settling { wait })
            }

            Phase::LocatingBall(planned) => {
                let landing = locator.locate()?;
                if landing.is_none() {
                    warn!("ball not found, treating as out of bounds");
                }
                self.phase = Phase::Evaluating { planned, landing };
                Ok(StepOutcome::BallLocated { landing })
            }

            Phase::Evaluating { planned, landing } => {
                self.evaluate(rig, planner, announcer, planned, landing)
                    .await
            }

            Phase::Won => Ok(StepOutcome::Finished {
                shots: self.memory.shots_taken(),
            }),
            Phase::Finished => Ok(StepOutcome::Finished {
                shots: self.memory.shots_taken(),
            }),
        }
    }

    async fn evaluate(
        &mut self,
        rig: &mut dyn GolfRig,
        planner: &dyn ShotPlanner,
        announcer: &dyn Announcer,
        planned: PlannedShot,
        landing: Option<PixelPoint>,
    ) -> anyhow::Result<StepOutcome> {
        let hole = self
            .memory
            .hole
            .ok_or_else(|| anyhow::anyhow!("evaluating a shot with no calibrated hole"))?;

        let (distance, feedback) = match landing {
            Some(ball) => (
                Some(ball.distance_to(hole)),
                fuzzy_feedback(ball, hole, &self.cfg.thresholds),
            ),
            None => (None, BALL_LOST_FEEDBACK.to_string()),
        };

        let record = ShotRecord {
            index: self.memory.next_shot_index(),
            aim_degrees: planned.decision.aim_degrees,
            force_percent: planned.decision.force_percent,
            landing,
            feedback: feedback.clone(),
        };
        let summary = record.summary();
        self.memory.record(record);
        planner.record_result(planned.call_id, summary);

        if let Some(d) = distance
            && d <= self.cfg.win_radius
        {
            info!(distance = d, "ball sunk");
            self.side_remark(
                planner,
                announcer,
                "You just sank the ball! Give me a loud, short celebration line!".to_string(),
            )
            .await;
            self.phase = Phase::Won;
            return Ok(StepOutcome::Won { distance: d });
        }

        info!(?distance, %feedback, "missed, resetting for the next shot");
        self.side_remark(
            planner,
            announcer,
            format!("You missed. Feedback was: {feedback}. Give a 5-word regretful comment."),
        )
        .await;
        rig.reset_ball()?;
        self.phase = Phase::AwaitingDecision;
        Ok(StepOutcome::Missed { distance, feedback })
    }

    async fn side_remark(&self, planner: &dyn ShotPlanner, announcer: &dyn Announcer, prompt: String) {
        match planner.banter(prompt).await {
            Ok(line) => announcer.say(&line),
            Err(err) => warn!(error = %format!("{err:#}"), "banter call failed, skipping remark"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeRig {
        homed: bool,
        aims: Vec<f64>,
        strikes: Vec<u8>,
        resets: u32,
    }

    impl GolfRig for FakeRig {
        fn home(&mut self) -> anyhow::Result<()> {
            self.homed = true;
            Ok(())
        }

        fn aim(&mut self, angle_degrees: f64) -> anyhow::Result<()> {
            self.aims.push(angle_degrees);
            Ok(())
        }

        fn strike(&mut self, force_percent: u8) -> anyhow::Result<()> {
            self.strikes.push(force_percent);
            Ok(())
        }

        fn reset_ball(&mut self) -> anyhow::Result<()> {
            self.resets += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeLocator {
        fixes: VecDeque<anyhow::Result<Option<PixelPoint>>>,
    }

    impl FakeLocator {
        fn push(&mut self, fix: Option<PixelPoint>) {
            self.fixes.push_back(Ok(fix));
        }
    }

    impl BallLocator for FakeLocator {
        fn locate(&mut self) -> anyhow::Result<Option<PixelPoint>> {
            self.fixes
                .pop_front()
                .unwrap_or_else(|| anyhow::bail!("no fix queued"))
        }
    }

    #[derive(Default)]
    struct FakePlanner {
        shots: Mutex<VecDeque<anyhow::Result<PlannedShot>>>,
        prompts: Mutex<Vec<String>>,
        results: Mutex<Vec<(String, String)>>,
        banter_prompts: Mutex<Vec<String>>,
    }

    impl FakePlanner {
        fn push_shot(&self, aim: f64, force: u8) {
            let mut shots = self.shots.lock().unwrap();
            let call_id = format!("call-{}", shots.len());
            shots.push_back(Ok(PlannedShot {
                decision: ShotDecision {
                    aim_degrees: aim,
                    force_percent: force,
                    commentary: "Fore!".to_string(),
                },
                call_id,
            }));
        }

        fn push_failure(&self, msg: &str) {
            self.shots
                .lock()
                .unwrap()
                .push_back(Err(anyhow::anyhow!(msg.to_string())));
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl ShotPlanner for FakePlanner {
        fn plan_shot<'a>(
            &'a self,
            prompt: String,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<PlannedShot>> + Send + 'a>> {
            Box::pin(async move {
                self.prompts.lock().unwrap().push(prompt);
                self.shots
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| anyhow::bail!("no shot queued"))
            })
        }

        fn record_result(&self, call_id: String, summary: String) {
            self.results.lock().unwrap().push((call_id, summary));
        }

        fn banter<'a>(
            &'a self,
            prompt: String,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
            Box::pin(async move {
                self.banter_prompts.lock().unwrap().push(prompt);
                Ok("What a shot.".to_string())
            })
        }
    }

    #[derive(Default)]
    struct RecordingAnnouncer {
        lines: Mutex<Vec<String>>,
    }

    impl Announcer for RecordingAnnouncer {
        fn say(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    fn at(x: f64, y: f64) -> PixelPoint {
        PixelPoint { x, y }
    }

    async fn step(
        session: &mut GameSession,
        rig: &mut FakeRig,
        planner: &FakePlanner,
        locator: &mut FakeLocator,
        announcer: &RecordingAnnouncer,
    ) -> StepOutcome {
        session
            .step(rig, planner, locator, announcer)
            .await
            .expect("step failed")
    }

    #[tokio::test]
    async fn full_game_to_a_win() {
        let mut session = GameSession::new(SessionConfig::default());
        let mut rig = FakeRig::default();
        let mut locator = FakeLocator::default();
        let planner = FakePlanner::default();
        let announcer = RecordingAnnouncer::default();

        locator.push(Some(at(310.0, 805.0))); // calibration
        locator.push(Some(at(300.0, 800.0))); // landing, ~11.18 px off
        planner.push_shot(92.0, 70);

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(out, StepOutcome::Homed);
        assert!(rig.homed);

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(
            out,
            StepOutcome::HoleCalibrated {
                hole: at(310.0, 805.0)
            }
        );
        assert_eq!(rig.resets, 1);

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert!(matches!(out, StepOutcome::ShotPlanned { .. }));
        assert_eq!(announcer.lines.lock().unwrap().as_slice(), ["Fore!"]);

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(out, StepOutcome::ShotExecuted);
        assert_eq!(rig.aims, [92.0]);
        assert_eq!(rig.strikes, [70]);

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(
            out,
            StepOutcome::Settling {
                wait: Duration::from_secs(10)
            }
        );

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(
            out,
            StepOutcome::BallLocated {
                landing: Some(at(300.0, 800.0))
            }
        );

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        match out {
            StepOutcome::Won { distance } => assert!((distance - 11.18).abs() < 0.01),
            other => panic!("expected win, got {other:?}"),
        }
        assert!(session.is_over());

        // The win never resets the ball again, and the shot is on record.
        assert_eq!(rig.resets, 1);
        assert_eq!(session.memory.shots_taken(), 1);
        let results = planner.results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].1.starts_with("Shot 1: Aim 92.0, Force 70."));
        // Commentary plus the celebration line.
        assert_eq!(announcer.lines.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn planner_failure_retries_without_advancing() {
        let mut session = GameSession::new(SessionConfig::default());
        let mut rig = FakeRig::default();
        let mut locator = FakeLocator::default();
        let planner = FakePlanner::default();
        let announcer = RecordingAnnouncer::default();

        locator.push(Some(at(408.0, 112.0)));
        planner.push_failure("connection refused");
        planner.push_shot(90.0, 50);

        step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert!(matches!(out, StepOutcome::DecisionDeferred { .. }));
        assert_eq!(session.memory.shots_taken(), 0);
        assert!(session.memory.history().is_empty());
        assert_eq!(session.phase, Phase::AwaitingDecision);

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert!(matches!(out, StepOutcome::ShotPlanned { .. }));

        // The retried prompt is equivalent to the failed one.
        let prompts = planner.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], prompts[1]);
        assert!(prompts[0].contains("Shot #1."));
    }

    #[tokio::test]
    async fn lost_ball_is_a_miss_not_a_crash() {
        let mut session = GameSession::new(SessionConfig::default());
        let mut rig = FakeRig::default();
        let mut locator = FakeLocator::default();
        let planner = FakePlanner::default();
        let announcer = RecordingAnnouncer::default();

        locator.push(Some(at(408.0, 112.0)));
        locator.push(None); // ball lost after the strike
        planner.push_shot(135.0, 100);

        for _ in 0..5 {
            step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        }
        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(out, StepOutcome::BallLocated { landing: None });

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(
            out,
            StepOutcome::Missed {
                distance: None,
                feedback: BALL_LOST_FEEDBACK.to_string()
            }
        );
        assert!(!session.is_over());
        assert_eq!(session.phase, Phase::AwaitingDecision);
        // Calibration reset plus the post-miss reset.
        assert_eq!(rig.resets, 2);
        assert_eq!(session.memory.history()[0].landing, None);
    }

    #[tokio::test]
    async fn shot_cap_finishes_the_run() {
        let cfg = SessionConfig {
            max_shots: Some(1),
            ..SessionConfig::default()
        };
        let mut session = GameSession::new(cfg);
        let mut rig = FakeRig::default();
        let mut locator = FakeLocator::default();
        let planner = FakePlanner::default();
        let announcer = RecordingAnnouncer::default();

        locator.push(Some(at(408.0, 112.0)));
        locator.push(Some(at(100.0, 400.0))); // far miss
        planner.push_shot(60.0, 40);

        loop {
            let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
            if let StepOutcome::Missed { .. } = out {
                break;
            }
        }

        let out = step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        assert_eq!(out, StepOutcome::Finished { shots: 1 });
        assert!(session.is_over());
    }

    #[tokio::test]
    async fn calibration_without_a_ball_is_fatal() {
        let mut session = GameSession::new(SessionConfig::default());
        let mut rig = FakeRig::default();
        let mut locator = FakeLocator::default();
        let planner = FakePlanner::default();
        let announcer = RecordingAnnouncer::default();

        locator.push(None);

        step(&mut session, &mut rig, &planner, &mut locator, &announcer).await;
        let err = session
            .step(&mut rig, &planner, &mut locator, &announcer)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("calibration failed"));
    }
}
