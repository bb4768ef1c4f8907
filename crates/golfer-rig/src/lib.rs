//! Linux hardware side of the mini-golf machine: character-device GPIO
//! lines, sysfs PWM channels, still-camera capture and the speech side
//! channel. Implements the seams `golfer-core` defines.

pub mod actuator;
pub mod audio;
pub mod camera;
pub mod config;
pub mod gpio;
pub mod pwm;
pub mod rig;
pub mod servo;
pub mod stepper;

pub use config::RigConfig;
pub use rig::LinuxRig;
