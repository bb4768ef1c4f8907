mod config;

use std::env;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use golfer_core::game::rig::{Announcer, NullAnnouncer};
use golfer_core::game::{GameSession, StepOutcome};
use golfer_core::llm::{OpenAiConfig, OpenAiPlanner};
use golfer_core::vision::{CameraLocator, FrameSource};
use golfer_rig::LinuxRig;
use golfer_rig::audio::SpeechAnnouncer;
use golfer_rig::camera::{FileFrameSource, StillCamera};

use crate::config::ConfigLoader;

/// Breather between planner retries; the failure is usually transient.
const DECISION_RETRY_PAUSE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = ConfigLoader::load("golfer.toml")?;
    let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?;

    let planner = OpenAiPlanner::new(
        OpenAiConfig {
            endpoint: cfg.planner.endpoint.clone(),
            api_key,
            model: cfg.planner.model.clone(),
        },
        cfg.game.limits,
    );

    let announcer: Box<dyn Announcer> = if cfg.audio.enabled {
        Box::new(SpeechAnnouncer::new(
            cfg.audio.program.clone(),
            cfg.audio.args.clone(),
        ))
    } else {
        Box::new(NullAnnouncer)
    };

    let source: Box<dyn FrameSource> = match &cfg.camera.frame_file {
        Some(path) => Box::new(FileFrameSource::new(path)),
        None => Box::new(StillCamera::new(
            cfg.camera.program.clone(),
            cfg.camera.width,
            cfg.camera.height,
        )),
    };
    let mut locator = CameraLocator::new(source, cfg.vision.clone());

    let mut rig = LinuxRig::connect(&cfg.rig)?;
    let mut session = GameSession::new(cfg.game.session());

    info!("starting game");
    let result = tokio::select! {
        res = drive(&mut session, &mut rig, &planner, &mut locator, announcer.as_ref()) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping game");
            Ok(())
        }
    };

    // Same release on every exit path: win, cap, error or interrupt.
    rig.shutdown();
    result
}

async fn drive(
    session: &mut GameSession,
    rig: &mut LinuxRig,
    planner: &OpenAiPlanner,
    locator: &mut CameraLocator,
    announcer: &dyn Announcer,
) -> anyhow::Result<()> {
    loop {
        match session.step(rig, planner, locator, announcer).await? {
            StepOutcome::Settling { wait } => {
                info!(secs = wait.as_secs_f64(), "waiting for the ball to settle");
                tokio::time::sleep(wait).await;
            }
            StepOutcome::DecisionDeferred { .. } => {
                tokio::time::sleep(DECISION_RETRY_PAUSE).await;
            }
            StepOutcome::Won { distance } => {
                info!(distance, "ball sunk, game over");
                return Ok(());
            }
            StepOutcome::Finished { shots } => {
                info!(shots, "shot limit reached, game over");
                return Ok(());
            }
            _ => {}
        }
    }
}
