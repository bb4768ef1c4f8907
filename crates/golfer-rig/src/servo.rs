//! Servo-driven striking mechanism.

use std::thread;
use std::time::Duration;

use tracing::info;

use crate::config::ServoConfig;
use crate::pwm::PwmChannel;

/// Backswing pulse width for a force percentage.
///
/// With `boost_force` the percentage is remapped onto the upper half of the
/// nominal range; below ~50% backswing the club cannot move the ball at all.
pub fn backswing_ns(cfg: &ServoConfig, force_percent: u8) -> u64 {
    let force = f64::from(force_percent.min(100));
    let pct = if cfg.boost_force {
        50.0 + force / 2.0
    } else {
        force
    };
    let swing_range = (cfg.max_swing_ns - cfg.rest_ns) as f64;
    cfg.rest_ns + (pct / 100.0 * swing_range) as u64
}

pub struct StrikeServo {
    pwm: PwmChannel,
    cfg: ServoConfig,
}

impl StrikeServo {
    pub fn new(pwm: PwmChannel, cfg: ServoConfig) -> Self {
        let servo = Self { pwm, cfg };
        servo.rest();
        servo
    }

    pub fn rest(&self) {
        self.pwm.set_duty_ns(self.cfg.rest_ns);
    }

    /// One full swing: settle at rest, pull back, release, recover.
    ///
    /// All holds are fixed wall-clock delays, not motion-completion signals;
    /// the servo has no feedback channel.
    pub fn strike(&self, force_percent: u8) {
        info!(force_percent, "striking");
        self.rest();
        thread::sleep(Duration::from_secs_f64(self.cfg.pre_swing_secs));
        self.pwm.set_duty_ns(backswing_ns(&self.cfg, force_percent));
        thread::sleep(Duration::from_secs_f64(self.cfg.swing_hold_secs));
        self.rest();
        thread::sleep(Duration::from_secs_f64(self.cfg.recover_secs));
    }

    pub fn pwm_mut(&mut self) -> &mut PwmChannel {
        &mut self.pwm
    }
}
