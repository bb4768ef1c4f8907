//! Stepper-driven aiming mechanism.

use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use gpiod::{Bias, Chip, Input, Lines, Options, Output};
use tracing::{debug, info};

use golfer_core::aim::map_angle_to_steps;

use crate::config::StepperConfig;

const CLOCKWISE: bool = true;
const COUNTER_CLOCKWISE: bool = false;

/// The four lines the stepper needs, behind a seam so motion logic can be
/// exercised without a GPIO chip.
pub trait StepperPins {
    fn set_step(&mut self, high: bool) -> anyhow::Result<()>;
    /// `true` drives clockwise (toward larger step positions).
    fn set_dir(&mut self, clockwise: bool) -> anyhow::Result<()>;
    /// Energizes or releases the motor driver.
    fn set_enabled(&mut self, enabled: bool) -> anyhow::Result<()>;
    fn limit_pressed(&mut self) -> anyhow::Result<bool>;
}

/// Real pins on a character-device GPIO chip.
pub struct CdevStepperPins {
    step: Lines<Output>,
    dir: Lines<Output>,
    enable: Lines<Output>,
    limit: Lines<Input>,
}

impl CdevStepperPins {
    pub fn new(chip: &Chip, cfg: &StepperConfig) -> anyhow::Result<Self> {
        let step = chip
            .request_lines(
                Options::output([cfg.step_pin])
                    .values([false])
                    .consumer("golfer-step"),
            )
            .context("request step line")?;
        let dir = chip
            .request_lines(
                Options::output([cfg.dir_pin])
                    .values([false])
                    .consumer("golfer-dir"),
            )
            .context("request dir line")?;
        // Enable is active-low; start released.
        let enable = chip
            .request_lines(
                Options::output([cfg.enable_pin])
                    .values([true])
                    .consumer("golfer-enable"),
            )
            .context("request enable line")?;
        let limit = chip
            .request_lines(
                Options::input([cfg.limit_switch_pin])
                    .bias(Bias::PullUp)
                    .consumer("golfer-limit"),
            )
            .context("request limit switch line")?;
        Ok(Self {
            step,
            dir,
            enable,
            limit,
        })
    }
}

impl StepperPins for CdevStepperPins {
    fn set_step(&mut self, high: bool) -> anyhow::Result<()> {
        self.step.set_values([high]).context("write step line")
    }

    fn set_dir(&mut self, clockwise: bool) -> anyhow::Result<()> {
        self.dir.set_values([clockwise]).context("write dir line")
    }

    fn set_enabled(&mut self, enabled: bool) -> anyhow::Result<()> {
        self.enable
            .set_values([!enabled])
            .context("write enable line")
    }

    fn limit_pressed(&mut self) -> anyhow::Result<bool> {
        // Pull-up input: the switch pulls the line low when hit.
        let values = self.limit.get_values([false])?;
        Ok(!values[0])
    }
}

/// Tracks the current step position and issues relative motion toward
/// targets produced by the angle map. Position is only trustworthy after a
/// successful [`Stepper::home`].
pub struct Stepper<P: StepperPins> {
    pins: P,
    cfg: StepperConfig,
    position: u32,
}

impl<P: StepperPins> Stepper<P> {
    pub fn new(pins: P, cfg: StepperConfig) -> Self {
        Self {
            pins,
            cfg,
            position: 0,
        }
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    fn pulse(&mut self, half_period: Duration) -> anyhow::Result<()> {
        self.pins.set_step(true)?;
        thread::sleep(half_period);
        self.pins.set_step(false)?;
        thread::sleep(half_period);
        Ok(())
    }

    /// Seeks the limit switch and defines step 0 just off it.
    ///
    /// The raw pulse count is bounded so a dead switch surfaces as an error
    /// instead of an endless crawl into the end stop.
    pub fn home(&mut self) -> anyhow::Result<()> {
        info!("homing stepper");
        let half_period = Duration::from_secs_f64(self.cfg.homing_step_secs);
        self.pins.set_enabled(true)?;
        self.pins.set_dir(COUNTER_CLOCKWISE)?;

        let mut pulses = 0u32;
        while !self.pins.limit_pressed()? {
            if pulses >= self.cfg.max_homing_steps {
                let _ = self.pins.set_enabled(false);
                bail!(
                    "limit switch never tripped after {} steps",
                    self.cfg.max_homing_steps
                );
            }
            self.pulse(half_period)?;
            pulses += 1;
        }

        thread::sleep(Duration::from_millis(100));
        // Back off to release the switch; that spot is step 0.
        self.pins.set_dir(CLOCKWISE)?;
        for _ in 0..self.cfg.homing_backoff_steps {
            self.pulse(half_period)?;
        }
        self.position = 0;
        self.pins.set_enabled(false)?;
        info!(pulses, "stepper homed");
        Ok(())
    }

    /// Moves to the step position for `angle_degrees` via the easing map.
    pub fn aim(&mut self, angle_degrees: f64) -> anyhow::Result<()> {
        let target = map_angle_to_steps(angle_degrees, self.cfg.total_steps)?;
        if target == self.position {
            return Ok(());
        }

        let half_period = Duration::from_secs_f64(self.cfg.move_step_secs);
        let (steps, direction) = if target > self.position {
            (target - self.position, CLOCKWISE)
        } else {
            (self.position - target, COUNTER_CLOCKWISE)
        };

        self.pins.set_enabled(true)?;
        self.pins.set_dir(direction)?;
        for _ in 0..steps {
            self.pulse(half_period)?;
        }
        self.pins.set_enabled(false)?;
        self.position = target;
        debug!(angle_degrees, target, "stepper moved");
        Ok(())
    }

    /// Releases the driver and parks the step line low. Errors are ignored;
    /// this runs on teardown paths.
    pub fn de_energize(&mut self) {
        let _ = self.pins.set_step(false);
        let _ = self.pins.set_enabled(false);
    }
}
