use serde::Deserialize;

/// Stepper aiming mechanism: step/dir/enable lines plus the homing switch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    pub step_pin: u32,
    pub dir_pin: u32,
    pub enable_pin: u32,
    pub limit_switch_pin: u32,
    /// Full travel for the 0..=180 degree aiming range.
    pub total_steps: u32,
    /// Half-period of one homing pulse, seconds.
    pub homing_step_secs: f64,
    /// Half-period of one positioning pulse, seconds.
    pub move_step_secs: f64,
    /// Steps driven back off the switch after it trips.
    pub homing_backoff_steps: u32,
    /// Raw pulse budget before homing is declared failed.
    pub max_homing_steps: u32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            step_pin: 20,
            dir_pin: 21,
            enable_pin: 22,
            limit_switch_pin: 4,
            total_steps: 300,
            homing_step_secs: 0.002,
            move_step_secs: 0.001,
            homing_backoff_steps: 10,
            max_homing_steps: 1000,
        }
    }
}

/// Servo striking mechanism on a sysfs PWM channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub pwm_channel: u32,
    pub frequency_hz: u32,
    /// Pulse width at rest, nanoseconds.
    pub rest_ns: u64,
    /// Pulse width at full backswing, nanoseconds.
    pub max_swing_ns: u64,
    /// Remap force onto the 50-100% band; below half range the club cannot
    /// move the ball at all.
    pub boost_force: bool,
    pub pre_swing_secs: f64,
    pub swing_hold_secs: f64,
    pub recover_secs: f64,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            pwm_channel: 0,
            frequency_hz: 50,
            rest_ns: 1_100_000,
            max_swing_ns: 1_900_000,
            boost_force: true,
            pre_swing_secs: 0.5,
            swing_hold_secs: 0.5,
            recover_secs: 1.0,
        }
    }
}

/// Linear actuator that tilts the course to return the ball.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    pub pwm_channel: u32,
    pub frequency_hz: u32,
    pub in1_pin: u32,
    pub in2_pin: u32,
    pub extend_secs: f64,
    pub retract_secs: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            pwm_channel: 1,
            frequency_hz: 1000,
            in1_pin: 17,
            in2_pin: 27,
            extend_secs: 20.0,
            retract_secs: 20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Character device of the GPIO chip; alternatives are scanned when it
    /// does not exist.
    pub gpio_chip: String,
    /// Sysfs PWM chip index shared by servo and actuator channels.
    pub pwm_chip: u32,
    pub stepper: StepperConfig,
    pub servo: ServoConfig,
    pub actuator: ActuatorConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            gpio_chip: "/dev/gpiochip4".to_string(),
            pwm_chip: 0,
            stepper: StepperConfig::default(),
            servo: ServoConfig::default(),
            actuator: ActuatorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let cfg: RigConfig = toml::from_str(
            r#"
            gpio_chip = "/dev/gpiochip0"

            [stepper]
            total_steps = 350

            [servo]
            boost_force = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gpio_chip, "/dev/gpiochip0");
        assert_eq!(cfg.stepper.total_steps, 350);
        assert_eq!(cfg.stepper.step_pin, 20);
        assert!(!cfg.servo.boost_force);
        assert_eq!(cfg.servo.rest_ns, 1_100_000);
    }
}
