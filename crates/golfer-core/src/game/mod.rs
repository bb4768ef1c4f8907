//! Shot-planning game loop: the tool-call wire contract, prompt building,
//! shot history, the seams toward the physical machine, and the phase
//! machine that ties planner, rig and locator together.
//!
//! Everything here is deterministic and testable with fakes; the runner
//! supplies the real planner, rig and locator.

pub mod memory;
pub mod prompt;
pub mod rig;
pub mod session;
pub mod wire;

pub use session::{GameSession, Phase, PlannedShot, SessionConfig, ShotPlanner, StepOutcome};
pub use wire::{DecisionLimits, ShotDecision, parse_shot_arguments};
