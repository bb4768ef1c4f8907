//! Frame sources for the ball locator.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, bail};
use image::RgbImage;
use tracing::debug;

use golfer_core::vision::FrameSource;

/// Captures one still per locate call by spawning an external capture
/// command (`libcamera-still` on the Pi) into a scratch file.
pub struct StillCamera {
    program: String,
    width: u32,
    height: u32,
}

impl StillCamera {
    pub fn new(program: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            program: program.into(),
            width,
            height,
        }
    }
}

impl FrameSource for StillCamera {
    fn capture(&mut self) -> anyhow::Result<RgbImage> {
        let dir = tempfile::tempdir().context("create capture scratch dir")?;
        let path = dir.path().join("frame.png");

        let status = Command::new(&self.program)
            .args(["--immediate", "--nopreview", "-t", "1"])
            .args(["--width", &self.width.to_string()])
            .args(["--height", &self.height.to_string()])
            .args(["-e", "png", "-o"])
            .arg(&path)
            .status()
            .with_context(|| format!("spawn capture command {}", self.program))?;
        if !status.success() {
            bail!("capture command {} exited with {status}", self.program);
        }

        let frame = image::open(&path).context("decode captured frame")?.to_rgb8();
        debug!(
            width = frame.width(),
            height = frame.height(),
            "frame captured"
        );
        Ok(frame)
    }
}

/// Replays a frame from disk; the bench/development variant.
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FrameSource for FileFrameSource {
    fn capture(&mut self) -> anyhow::Result<RgbImage> {
        let frame = image::open(&self.path)
            .with_context(|| format!("load frame from {}", self.path.display()))?;
        Ok(frame.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn file_source_round_trips_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.png");
        let frame = RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]));
        frame.save(&path).unwrap();

        let mut source = FileFrameSource::new(&path);
        let got = source.capture().unwrap();
        assert_eq!(got.dimensions(), (8, 6));
        assert_eq!(got.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut source = FileFrameSource::new("/nonexistent/frame.png");
        assert!(source.capture().is_err());
    }
}
