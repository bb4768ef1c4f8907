use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

/// The single tool offered to the planner; every planning turn must come
/// back as one call to it.
pub const EXECUTE_SHOT_TOOL: &str = "execute_shot";

/// Commentary fallback when the planner leaves the field empty.
pub const DEFAULT_COMMENTARY: &str = "Here we go.";

/// A validated planner decision, consumed immediately by the actuation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotDecision {
    pub aim_degrees: f64,
    pub force_percent: u8,
    pub commentary: String,
}

/// Aim window the planner is allowed to use. Narrower than the mechanical
/// 0..=180 travel; the prompt states the same bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionLimits {
    pub min_aim: f64,
    pub max_aim: f64,
}

impl Default for DecisionLimits {
    fn default() -> Self {
        Self {
            min_aim: 45.0,
            max_aim: 135.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionParseError {
    InvalidJson(String),
    MissingAim,
    AimOutOfRange { aim: f64, min: f64, max: f64 },
}

impl fmt::Display for DecisionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionParseError::InvalidJson(msg) => {
                write!(f, "invalid shot arguments json: {msg}")
            }
            DecisionParseError::MissingAim => write!(f, "shot arguments missing aim_degrees"),
            DecisionParseError::AimOutOfRange { aim, min, max } => {
                write!(f, "aim_degrees {aim} outside allowed {min}..={max}")
            }
        }
    }
}

impl Error for DecisionParseError {}

#[derive(Deserialize)]
struct ShotArgsWire {
    #[serde(default)]
    aim_degrees: Option<f64>,
    #[serde(default)]
    strike_force: Option<f64>,
    #[serde(default)]
    commentary: Option<String>,
}

/// Parses the JSON `arguments` payload of an `execute_shot` tool call.
///
/// Aim outside the window is rejected, never clamped, so a bad decision can
/// not command mechanical overtravel; the failed turn is simply retried.
/// Force is clamped into the percent range and commentary falls back to a
/// stock line.
pub fn parse_shot_arguments(
    raw: &str,
    limits: &DecisionLimits,
) -> Result<ShotDecision, DecisionParseError> {
    let wire: ShotArgsWire =
        serde_json::from_str(raw).map_err(|e| DecisionParseError::InvalidJson(e.to_string()))?;

    let aim = wire.aim_degrees.ok_or(DecisionParseError::MissingAim)?;
    if !(limits.min_aim..=limits.max_aim).contains(&aim) {
        return Err(DecisionParseError::AimOutOfRange {
            aim,
            min: limits.min_aim,
            max: limits.max_aim,
        });
    }

    let force_percent = wire.strike_force.unwrap_or(50.0).clamp(0.0, 100.0).round() as u8;
    let commentary = wire
        .commentary
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COMMENTARY.to_string());

    Ok(ShotDecision {
        aim_degrees: aim,
        force_percent,
        commentary,
    })
}
