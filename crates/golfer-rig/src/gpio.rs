use std::path::PathBuf;

use anyhow::Context;
use gpiod::Chip;
use tracing::{info, warn};

/// Opens the configured GPIO chip.
///
/// When the configured device does not exist, `/dev/gpiochip0..=5` are
/// scanned and the first present chip is used instead; some Pi kernels move
/// the header controller between chip indices.
pub fn open_chip(configured: &str) -> anyhow::Result<Chip> {
    let path = resolve_chip_path(configured);
    info!(chip = %path.display(), "opening gpio chip");
    Chip::new(&path).with_context(|| format!("open gpio chip {}", path.display()))
}

fn resolve_chip_path(configured: &str) -> PathBuf {
    let configured_path = PathBuf::from(configured);
    if configured_path.exists() {
        return configured_path;
    }
    warn!(configured, "gpio chip not found, scanning for alternatives");
    for i in 0..6 {
        let candidate = PathBuf::from(format!("/dev/gpiochip{i}"));
        if candidate.exists() {
            return candidate;
        }
    }
    // Nothing found; let the open fail with the configured path in the error.
    configured_path
}
