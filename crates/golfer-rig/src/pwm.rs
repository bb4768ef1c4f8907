//! Sysfs PWM plumbing: chip probing, channel export, duty writes, teardown.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{debug, warn};

/// Outcome of scanning `/sys/class/pwm` for a usable chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmProbe {
    Found { chip: u32, channels: u32 },
    NotFound,
}

/// Scans pwmchip0..=7 for the first chip advertising at least
/// `min_channels` channels.
pub fn probe_pwm_chip(min_channels: u32) -> PwmProbe {
    for chip in 0..8 {
        let Ok(raw) = fs::read_to_string(format!("/sys/class/pwm/pwmchip{chip}/npwm")) else {
            continue;
        };
        if let Ok(channels) = raw.trim().parse::<u32>()
            && channels >= min_channels
        {
            return PwmProbe::Found { chip, channels };
        }
    }
    PwmProbe::NotFound
}

/// Uses the configured chip when present, otherwise falls back to the probe.
/// No usable chip at all is a fatal setup error.
pub fn resolve_pwm_chip(configured: u32, min_channels: u32) -> anyhow::Result<u32> {
    if Path::new(&format!("/sys/class/pwm/pwmchip{configured}")).exists() {
        return Ok(configured);
    }
    match probe_pwm_chip(min_channels) {
        PwmProbe::Found { chip, channels } => {
            warn!(configured, chip, channels, "configured pwm chip missing, using probed chip");
            Ok(chip)
        }
        PwmProbe::NotFound => {
            bail!("no sysfs pwm chip with at least {min_channels} channels found")
        }
    }
}

/// One exported sysfs PWM channel.
///
/// Setup failures are fatal; steady-state duty writes are logged and
/// swallowed, because one missed write must not end a game in progress.
pub struct PwmChannel {
    chip: u32,
    channel: u32,
    period_ns: u64,
    exported: bool,
}

impl PwmChannel {
    pub fn export(chip: u32, channel: u32, frequency_hz: u32) -> anyhow::Result<Self> {
        let dir = format!("/sys/class/pwm/pwmchip{chip}/pwm{channel}");
        if !Path::new(&dir).exists() {
            // An EBUSY here usually means somebody else raced the export;
            // whether the directory appears is what decides success.
            let _ = fs::write(
                format!("/sys/class/pwm/pwmchip{chip}/export"),
                channel.to_string(),
            );
            for _ in 0..10 {
                if Path::new(&dir).exists() {
                    break;
                }
                thread::sleep(Duration::from_millis(100));
            }
            if !Path::new(&dir).exists() {
                bail!("pwmchip{chip}/pwm{channel} did not appear after export");
            }
        }

        let period_ns = 1_000_000_000u64 / u64::from(frequency_hz);
        let ch = Self {
            chip,
            channel,
            period_ns,
            exported: true,
        };
        ch.write_attr("period", &period_ns.to_string())
            .context("set pwm period")?;
        ch.write_attr("enable", "1").context("enable pwm")?;
        debug!(chip, channel, period_ns, "pwm channel up");
        Ok(ch)
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    fn write_attr(&self, file: &str, value: &str) -> anyhow::Result<()> {
        let path = format!(
            "/sys/class/pwm/pwmchip{}/pwm{}/{file}",
            self.chip, self.channel
        );
        fs::write(&path, value).with_context(|| format!("write {value} to {path}"))
    }

    /// Steady-state duty write. A duty above the period is invalid at the
    /// kernel boundary and is dropped with a warning instead of written.
    pub fn set_duty_ns(&self, duty_ns: u64) {
        if duty_ns > self.period_ns {
            warn!(
                duty_ns,
                period_ns = self.period_ns,
                "duty cycle above period, dropping write"
            );
            return;
        }
        if let Err(err) = self.write_attr("duty_cycle", &duty_ns.to_string()) {
            warn!(error = %format!("{err:#}"), "pwm duty write failed");
        }
    }

    /// Best-effort teardown: every release step runs regardless of earlier
    /// failures, and the errors are collected for the caller to log. Safe to
    /// call more than once.
    pub fn release(&mut self) -> Vec<anyhow::Error> {
        let mut errors = Vec::new();
        if !self.exported {
            return errors;
        }
        self.exported = false;

        for (file, value) in [("duty_cycle", "0"), ("enable", "0")] {
            if let Err(err) = self.write_attr(file, value) {
                errors.push(err);
            }
        }
        let unexport = format!("/sys/class/pwm/pwmchip{}/unexport", self.chip);
        if let Err(err) = fs::write(&unexport, self.channel.to_string()) {
            errors.push(anyhow::Error::new(err).context(format!("unexport pwm{}", self.channel)));
        }
        errors
    }
}

impl Drop for PwmChannel {
    fn drop(&mut self) {
        for err in self.release() {
            warn!(error = %format!("{err:#}"), "pwm release on drop failed");
        }
    }
}
