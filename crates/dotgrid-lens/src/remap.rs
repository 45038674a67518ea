//! Per-pixel forward and inverse remap tables.

use dotgrid_core::RgbImage;
use log::debug;
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{DistortionModel, RemapParams};

/// Rectified-to-raw pixel correspondence for one camera.
///
/// `forward[y * width + x]` is the raw pixel index sampled for rectified
/// pixel `(x, y)`. `inverse[i]` is the rectified pixel written from raw pixel
/// `i`. Pixels that map outside the raw image are holes (`None`) in both.
#[derive(Clone, Debug, PartialEq)]
pub struct RemapTable {
    width: usize,
    height: usize,
    forward: Vec<Option<usize>>,
    inverse: Vec<Option<(usize, usize)>>,
}

/// Image size plus the rotation and scale applied after radial correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RemapGeometry {
    pub width: usize,
    pub height: usize,
    /// Camera rotation in radians; the table turns by its negative.
    pub rotation: f64,
    pub scale: f64,
}

impl RemapGeometry {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

/// Raw-image position sampled for rectified point `p`: radial distortion
/// about the model centre, then uniform scale and a rotation by `-rotation`
/// about the image centre.
pub fn source_position(
    model: &DistortionModel,
    geometry: &RemapGeometry,
    p: Point2<f64>,
    params: &RemapParams,
) -> Point2<f64> {
    let d = p - model.centre;
    let r = d.norm();
    let src = if r >= params.min_radius {
        model.centre + d * (model.curve.eval(r) / r)
    } else {
        p
    };

    let half = Vector2::new(0.5 * geometry.width as f64, 0.5 * geometry.height as f64);
    let v = (src.coords - half) * geometry.scale;
    let (s, c) = geometry.rotation.sin_cos();
    let rotated = Vector2::new(v.x * c + v.y * s, -v.x * s + v.y * c);
    Point2::from(rotated + half)
}

impl RemapTable {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(model, params), fields(w = geometry.width, h = geometry.height))
    )]
    pub fn build(model: &DistortionModel, geometry: RemapGeometry, params: &RemapParams) -> Self {
        let (width, height) = (geometry.width, geometry.height);
        let n = width * height;
        let mut forward = vec![None; n];
        let mut inverse = vec![None; n];
        for y in 0..height {
            for x in 0..width {
                let src =
                    source_position(model, &geometry, Point2::new(x as f64, y as f64), params);
                let (sx, sy) = (src.x.round(), src.y.round());
                if !(sx >= 0.0 && sy >= 0.0 && sx < width as f64 && sy < height as f64) {
                    continue;
                }
                let raw = sy as usize * width + sx as usize;
                forward[y * width + x] = Some(raw);
                inverse[raw] = Some((x, y));
            }
        }
        let table = Self {
            width,
            height,
            forward,
            inverse,
        };
        debug!("remap {}x{}: {} holes", width, height, table.hole_count());
        table
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw pixel sampled for rectified pixel `(x, y)`.
    pub fn forward(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.forward[y * self.width + x].map(|i| (i % self.width, i / self.width))
    }

    /// Rectified pixel fed from raw pixel `(x, y)`.
    pub fn inverse(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.inverse[y * self.width + x]
    }

    /// Rectified position of a raw point, via the inverse table at the
    /// nearest pixel.
    pub fn rectify_pixel(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let (x, y) = (p.x.round(), p.y.round());
        if x < 0.0 || y < 0.0 {
            return None;
        }
        self.inverse(x as usize, y as usize)
            .map(|(rx, ry)| Point2::new(rx as f64, ry as f64))
    }

    /// Number of rectified pixels without a raw source.
    pub fn hole_count(&self) -> usize {
        self.forward.iter().filter(|f| f.is_none()).count()
    }

    /// Resample a raw image into rectified geometry. Holes stay black and
    /// forward entries past the end of `raw` copy nothing.
    pub fn rectify_image(&self, raw: &RgbImage) -> RgbImage {
        const CH: usize = RgbImage::CHANNELS;
        let mut out = RgbImage::new(self.width, self.height);
        for (i, src) in self.forward.iter().enumerate() {
            let Some(src) = *src else {
                continue;
            };
            let from = src * CH;
            if from + CH > raw.data.len() {
                continue;
            }
            out.data[i * CH..i * CH + CH].copy_from_slice(&raw.data[from..from + CH]);
        }
        out
    }
}
