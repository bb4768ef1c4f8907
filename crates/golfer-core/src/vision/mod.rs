//! Camera-frame ball locator: color threshold, de-speckle, largest blob,
//! centroid, optional playing-field gate.

pub mod mask;

use image::{RgbImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::rig::BallLocator;
use mask::Mask;

/// A coordinate in camera space. `x` grows rightward, `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn distance_to(self, other: PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Inclusive HSV bound, OpenCV 8-bit scaling (hue 0..=179).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvBound {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Flip the frame to match the upside-down physical camera mount.
    pub rotate_180: bool,
    /// Gaussian blur sigma; non-positive skips the blur.
    pub blur_sigma: f32,
    pub lower: HsvBound,
    pub upper: HsvBound,
    /// Accepted blob area band, in pixels.
    pub min_area: u32,
    pub max_area: u32,
    /// Playing-field polygon; a centroid outside it is not a ball.
    pub field: Option<Vec<PixelPoint>>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        // Near-white threshold: only bright, unsaturated pixels survive, so
        // the felt and the floor drop out before blob analysis.
        Self {
            rotate_180: false,
            blur_sigma: 1.5,
            lower: HsvBound { h: 0, s: 0, v: 200 },
            upper: HsvBound {
                h: 180,
                s: 25,
                v: 255,
            },
            min_area: 100,
            max_area: 60_000,
            field: None,
        }
    }
}

/// A located ball: blob centroid plus the area that qualified it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallFix {
    pub centroid: PixelPoint,
    pub area: u32,
}

/// One frame per locate call, 640x480 in every deployed configuration.
pub trait FrameSource: Send {
    fn capture(&mut self) -> anyhow::Result<RgbImage>;
}

/// Finds the ball in a single frame, or `None` when nothing qualifies.
pub fn find_ball(frame: &RgbImage, cfg: &VisionConfig) -> Option<BallFix> {
    let frame = if cfg.rotate_180 {
        imageops::rotate180(frame)
    } else {
        frame.clone()
    };
    let frame = if cfg.blur_sigma > 0.0 {
        imageops::blur(&frame, cfg.blur_sigma)
    } else {
        frame
    };

    let (width, height) = frame.dimensions();
    let mut mask = Mask::new(width, height);
    for (x, y, px) in frame.enumerate_pixels() {
        let [r, g, b] = px.0;
        let (h, s, v) = rgb_to_hsv(r, g, b);
        let hit = (cfg.lower.h..=cfg.upper.h).contains(&h)
            && (cfg.lower.s..=cfg.upper.s).contains(&s)
            && (cfg.lower.v..=cfg.upper.v).contains(&v);
        if hit {
            mask.set(x, y, true);
        }
    }

    let mask = mask.opened().closed();
    let blob = mask.largest_blob()?;
    if blob.area < cfg.min_area || blob.area > cfg.max_area {
        debug!(
            area = blob.area,
            min = cfg.min_area,
            max = cfg.max_area,
            "largest blob outside area band"
        );
        return None;
    }

    let (cx, cy) = blob.centroid();
    let centroid = PixelPoint { x: cx, y: cy };
    if let Some(field) = &cfg.field
        && !point_in_polygon(centroid, field)
    {
        debug!(x = cx, y = cy, "blob centroid outside playing field");
        return None;
    }

    Some(BallFix {
        centroid,
        area: blob.area,
    })
}

/// Locator that captures from a [`FrameSource`] and runs [`find_ball`].
pub struct CameraLocator {
    source: Box<dyn FrameSource>,
    cfg: VisionConfig,
}

impl CameraLocator {
    pub fn new(source: Box<dyn FrameSource>, cfg: VisionConfig) -> Self {
        Self { source, cfg }
    }
}

impl BallLocator for CameraLocator {
    fn locate(&mut self) -> anyhow::Result<Option<PixelPoint>> {
        let frame = self.source.capture()?;
        Ok(find_ball(&frame, &self.cfg).map(|fix| fix.centroid))
    }
}

/// HSV with OpenCV 8-bit scaling: hue halved into 0..=179, saturation and
/// value in 0..=255.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };
    let h = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * ((gf - bf) / delta)
    } else if max == gf {
        120.0 + 60.0 * ((bf - rf) / delta)
    } else {
        240.0 + 60.0 * ((rf - gf) / delta)
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    (
        ((h / 2.0).round() as u16 % 180) as u8,
        s.round() as u8,
        v.round() as u8,
    )
}

fn point_in_polygon(p: PixelPoint, polygon: &[PixelPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
