use std::{error::Error, fmt};

/// Full stepper travel for the 0..=180 degree aiming range.
pub const TOTAL_STEPS_FOR_180_DEGREES: u32 = 300;

const EASING_EXPONENT: f64 = 1.5;

/// Aim angle outside the mechanical 0..=180 range. Rejected, never clamped:
/// clamping would silently command travel against the end stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleOutOfRange {
    pub angle: f64,
}

impl fmt::Display for AngleOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aim angle {}° outside 0..=180", self.angle)
    }
}

impl Error for AngleOutOfRange {}

/// Maps an aim angle in `[0, 180]` to a step position in `[0, total_steps]`.
///
/// The signed power-law easing gives finer step resolution near the center of
/// the travel range, where the mount is most sensitive. Larger angles map to
/// smaller step counts (orientation of the physical mount), so the result is
/// monotonic non-increasing with `map(0) == total_steps` and `map(180) == 0`.
pub fn map_angle_to_steps(angle: f64, total_steps: u32) -> Result<u32, AngleOutOfRange> {
    if !(0.0..=180.0).contains(&angle) {
        return Err(AngleOutOfRange { angle });
    }
    let normalized = angle / 90.0 - 1.0;
    let eased = if normalized == 0.0 {
        0.0
    } else {
        normalized.signum() * normalized.abs().powf(EASING_EXPONENT)
    };
    let target = (eased + 1.0) / 2.0 * f64::from(total_steps);
    Ok((f64::from(total_steps) - target).trunc() as u32)
}
