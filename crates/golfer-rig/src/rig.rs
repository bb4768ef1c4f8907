//! The owned hardware context for the whole machine.

use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use golfer_core::game::rig::GolfRig;

use crate::actuator::BallReturn;
use crate::config::RigConfig;
use crate::gpio;
use crate::pwm::{self, PwmChannel};
use crate::servo::StrikeServo;
use crate::stepper::{CdevStepperPins, Stepper};

/// Every line and PWM channel the machine uses, requested once at startup
/// and released together on every exit path.
pub struct LinuxRig {
    stepper: Stepper<CdevStepperPins>,
    servo: StrikeServo,
    ball_return: BallReturn,
    released: bool,
}

impl LinuxRig {
    /// Opens the chip, requests every line and brings both PWM channels up.
    /// Any failure here is fatal to startup.
    pub fn connect(cfg: &RigConfig) -> anyhow::Result<Self> {
        let chip = gpio::open_chip(&cfg.gpio_chip)?;
        let pins = CdevStepperPins::new(&chip, &cfg.stepper)?;
        let stepper = Stepper::new(pins, cfg.stepper.clone());

        let pwm_chip = pwm::resolve_pwm_chip(cfg.pwm_chip, 2).context("locate pwm chip")?;
        let servo_pwm = PwmChannel::export(pwm_chip, cfg.servo.pwm_channel, cfg.servo.frequency_hz)
            .context("bring up servo pwm")?;
        // The kernel needs a moment between exports on the same chip.
        thread::sleep(Duration::from_millis(200));
        let actuator_pwm = PwmChannel::export(
            pwm_chip,
            cfg.actuator.pwm_channel,
            cfg.actuator.frequency_hz,
        )
        .context("bring up actuator pwm")?;

        let servo = StrikeServo::new(servo_pwm, cfg.servo.clone());
        let ball_return = BallReturn::new(&chip, actuator_pwm, cfg.actuator.clone())?;

        info!("rig connected");
        Ok(Self {
            stepper,
            servo,
            ball_return,
            released: false,
        })
    }

    /// Best-effort teardown: de-energizes every output, zeroes both PWM
    /// channels and unexports them. Every step runs regardless of earlier
    /// failures; errors are collected and logged. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.stepper.de_energize();
        self.ball_return.halt();
        self.servo.rest();
        thread::sleep(Duration::from_millis(500));

        let mut errors = Vec::new();
        errors.extend(self.servo.pwm_mut().release());
        errors.extend(self.ball_return.pwm_mut().release());
        for err in errors {
            warn!(error = %format!("{err:#}"), "teardown step failed");
        }
        info!("rig released");
    }
}

impl GolfRig for LinuxRig {
    fn home(&mut self) -> anyhow::Result<()> {
        self.stepper.home()
    }

    fn aim(&mut self, angle_degrees: f64) -> anyhow::Result<()> {
        self.stepper.aim(angle_degrees)
    }

    fn strike(&mut self, force_percent: u8) -> anyhow::Result<()> {
        self.servo.strike(force_percent);
        Ok(())
    }

    fn reset_ball(&mut self) -> anyhow::Result<()> {
        self.ball_return.cycle()
    }
}

impl Drop for LinuxRig {
    fn drop(&mut self) {
        self.shutdown();
    }
}
