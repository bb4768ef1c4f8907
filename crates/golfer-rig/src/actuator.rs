//! Linear-actuator ball return.

use std::thread;
use std::time::Duration;

use anyhow::Context;
use gpiod::{Chip, Lines, Options, Output};
use tracing::info;

use crate::config::ActuatorConfig;
use crate::pwm::PwmChannel;

/// Drives the course-tilting actuator: full-duty extend, then retract, then
/// everything off. The travel times are open-loop; the actuator stalls
/// harmlessly at its end stops.
pub struct BallReturn {
    in1: Lines<Output>,
    in2: Lines<Output>,
    pwm: PwmChannel,
    cfg: ActuatorConfig,
}

impl BallReturn {
    pub fn new(chip: &Chip, pwm: PwmChannel, cfg: ActuatorConfig) -> anyhow::Result<Self> {
        let in1 = chip
            .request_lines(
                Options::output([cfg.in1_pin])
                    .values([false])
                    .consumer("golfer-actuator-in1"),
            )
            .context("request actuator in1 line")?;
        let in2 = chip
            .request_lines(
                Options::output([cfg.in2_pin])
                    .values([false])
                    .consumer("golfer-actuator-in2"),
            )
            .context("request actuator in2 line")?;
        Ok(Self {
            in1,
            in2,
            pwm,
            cfg,
        })
    }

    /// One full extend/retract cycle.
    pub fn cycle(&mut self) -> anyhow::Result<()> {
        info!("resetting ball");
        self.pwm.set_duty_ns(self.pwm.period_ns());

        self.in1.set_values([true]).context("actuator extend")?;
        self.in2.set_values([false]).context("actuator extend")?;
        thread::sleep(Duration::from_secs_f64(self.cfg.extend_secs));

        self.in1.set_values([false]).context("actuator retract")?;
        self.in2.set_values([true]).context("actuator retract")?;
        thread::sleep(Duration::from_secs_f64(self.cfg.retract_secs));

        self.halt();
        Ok(())
    }

    /// Stops motion and zeroes the duty cycle. Errors are ignored; this also
    /// runs on teardown paths.
    pub fn halt(&mut self) {
        let _ = self.in1.set_values([false]);
        let _ = self.in2.set_values([false]);
        self.pwm.set_duty_ns(0);
    }

    pub fn pwm_mut(&mut self) -> &mut PwmChannel {
        &mut self.pwm
    }
}
