use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use golfer_core::feedback::FeedbackThresholds;
use golfer_core::game::{DecisionLimits, SessionConfig};
use golfer_core::vision::VisionConfig;
use golfer_rig::RigConfig;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rig: RigConfig,
    pub vision: VisionConfig,
    pub game: GameConfig,
    pub planner: PlannerConfig,
    pub camera: CameraConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub win_radius: f64,
    pub settle_secs: f64,
    pub max_shots: Option<u32>,
    pub limits: DecisionLimits,
    pub feedback: FeedbackThresholds,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            win_radius: 25.0,
            settle_secs: 10.0,
            max_shots: None,
            limits: DecisionLimits::default(),
            feedback: FeedbackThresholds::default(),
        }
    }
}

impl GameConfig {
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            win_radius: self.win_radius,
            settle: Duration::from_secs_f64(self.settle_secs),
            max_shots: self.max_shots,
            limits: self.limits,
            thresholds: self.feedback,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub endpoint: String,
    pub model: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub program: String,
    pub width: u32,
    pub height: u32,
    /// When set, frames are replayed from this file instead of a camera.
    pub frame_file: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            program: "libcamera-still".to_string(),
            width: 640,
            height: 480,
            frame_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "espeak-ng".to_string(),
            args: Vec::new(),
        }
    }
}

/// Config loader for the golfer binary.
///
/// Search order:
/// 1) `GOLFER_CONFIG_DIR/<relative_path>`
/// 2) `./<relative_path>`
/// 3) `<repo_root>/config/<relative_path>` (repo-local convenience)
///
/// A missing file is not an error; compiled-in defaults apply. Env vars
/// override the planner endpoint/model and the replay frame either way.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(relative_path: &str) -> anyhow::Result<Config> {
        let mut cfg = match Self::resolve_path(relative_path) {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config at {}", path.display()))?;
                info!(path = %path.display(), "config loaded");
                toml::from_str(&text).with_context(|| "Failed to parse TOML")?
            }
            None => {
                info!("no config file found, using defaults");
                Config::default()
            }
        };
        Self::apply_env(&mut cfg, |name| env::var(name).ok());
        Ok(cfg)
    }

    fn resolve_path(relative_path: &str) -> Option<PathBuf> {
        let rel = Path::new(relative_path);

        if let Some(root) = env::var_os("GOLFER_CONFIG_DIR") {
            let candidate = PathBuf::from(root).join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if let Ok(cwd) = env::current_dir() {
            let candidate = cwd.join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // Repo convenience: <repo_root>/config/<relative_path>. This crate
        // lives at <repo_root>/crates/runner.
        let candidate = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .ancestors()
            .nth(2)?
            .join("config")
            .join(rel);
        candidate.is_file().then_some(candidate)
    }

    fn apply_env(cfg: &mut Config, var: impl Fn(&str) -> Option<String>) {
        let set = |target: &mut String, name: &str| {
            if let Some(value) = var(name)
                && !value.trim().is_empty()
            {
                *target = value;
            }
        };
        set(&mut cfg.planner.endpoint, "GOLFER_LLM_ENDPOINT");
        set(&mut cfg.planner.model, "GOLFER_LLM_MODEL");
        if let Some(path) = var("GOLFER_FRAME_FILE")
            && !path.trim().is_empty()
        {
            cfg.camera.frame_file = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_converts_durations() {
        let game = GameConfig {
            settle_secs: 2.5,
            ..GameConfig::default()
        };
        let session = game.session();
        assert_eq!(session.settle, Duration::from_millis(2500));
        assert_eq!(session.win_radius, 25.0);
    }

    #[test]
    fn env_overrides_beat_file_values() {
        let mut cfg = Config::default();
        ConfigLoader::apply_env(&mut cfg, |name| match name {
            "GOLFER_LLM_ENDPOINT" => Some("http://127.0.0.1:11434/v1/chat/completions".to_string()),
            "GOLFER_LLM_MODEL" => Some(String::new()), // blank is ignored
            "GOLFER_FRAME_FILE" => Some("/tmp/course.png".to_string()),
            _ => None,
        });
        assert_eq!(
            cfg.planner.endpoint,
            "http://127.0.0.1:11434/v1/chat/completions"
        );
        assert_eq!(cfg.planner.model, "gpt-4o");
        assert_eq!(cfg.camera.frame_file.as_deref(), Some(Path::new("/tmp/course.png")));
    }

    #[test]
    fn full_config_file_parses() {
        let cfg: Config = toml::from_str(
            r#"
            [game]
            win_radius = 30.0
            max_shots = 12

            [game.limits]
            min_aim = 30.0
            max_aim = 150.0

            [vision]
            rotate_180 = true
            min_area = 500

            [rig.stepper]
            total_steps = 350

            [planner]
            model = "gpt-4o-mini"

            [audio]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.game.win_radius, 30.0);
        assert_eq!(cfg.game.max_shots, Some(12));
        assert_eq!(cfg.game.limits.min_aim, 30.0);
        assert!(cfg.vision.rotate_180);
        assert_eq!(cfg.vision.min_area, 500);
        assert_eq!(cfg.rig.stepper.total_steps, 350);
        assert_eq!(cfg.planner.model, "gpt-4o-mini");
        assert!(!cfg.audio.enabled);
    }
}
