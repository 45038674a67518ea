//! Reference dot detector: dark blobs on a light target.

use dotgrid_core::{Dot, GrayImageView};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Source of dot observations for one image.
///
/// Implementations return every candidate dot with its centroid, radius and
/// whether it is the distinguished centre marker. Grid coordinates are left
/// unassigned.
pub trait DotDetector {
    fn detect(&self, image: &GrayImageView<'_>) -> Vec<Dot>;
}

/// Parameters for [`BlobDotDetector`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DotDetectorParams {
    /// Smallest blob area in pixels.
    pub min_area: usize,
    /// Largest blob area in pixels.
    pub max_area: usize,
    /// The centre marker must be larger than this multiple of the median
    /// blob area.
    pub centre_area_ratio: f64,
    /// Drop blobs that touch the image border.
    pub reject_border: bool,
    /// Fixed threshold; Otsu's threshold is used when unset.
    pub threshold: Option<u8>,
}

impl Default for DotDetectorParams {
    fn default() -> Self {
        Self {
            min_area: 4,
            max_area: 20_000,
            centre_area_ratio: 2.0,
            reject_border: true,
            threshold: None,
        }
    }
}

/// Dark connected components of a binarised image.
#[derive(Clone, Debug, Default)]
pub struct BlobDotDetector {
    pub params: DotDetectorParams,
}

impl BlobDotDetector {
    pub fn new(params: DotDetectorParams) -> Self {
        Self { params }
    }
}

/// Otsu threshold of an 8-bit histogram. Flat images return their only
/// value.
pub fn otsu_threshold(pixels: &[u8]) -> u8 {
    if pixels.is_empty() {
        return 127;
    }
    let mut hist = [0u64; 256];
    for &v in pixels {
        hist[v as usize] += 1;
    }
    let min_v = hist.iter().position(|&h| h > 0).unwrap_or(0);
    let max_v = hist.iter().rposition(|&h| h > 0).unwrap_or(255);
    if min_v == max_v {
        return min_v as u8;
    }

    let total = pixels.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0.0;
    let mut w_b = 0.0;
    let mut best_var = -1.0;
    let mut best_t = min_v as u8;
    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }
    best_t
}

#[derive(Clone, Copy, Debug)]
struct Blob {
    area: usize,
    sum_x: f64,
    sum_y: f64,
    touches_border: bool,
}

/// 4-connected components of pixels at or below `threshold`.
fn dark_components(image: &GrayImageView<'_>, threshold: u8) -> Vec<Blob> {
    let (w, h) = (image.width, image.height);
    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut blobs = Vec::new();

    for start in 0..w * h {
        if visited[start] || image.data[start] > threshold {
            continue;
        }
        visited[start] = true;
        stack.push(start);
        let mut blob = Blob {
            area: 0,
            sum_x: 0.0,
            sum_y: 0.0,
            touches_border: false,
        };
        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            blob.area += 1;
            blob.sum_x += x as f64;
            blob.sum_y += y as f64;
            if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                blob.touches_border = true;
            }
            let neighbours = [
                (x > 0).then(|| i - 1),
                (x + 1 < w).then(|| i + 1),
                (y > 0).then(|| i - w),
                (y + 1 < h).then(|| i + w),
            ];
            for n in neighbours.into_iter().flatten() {
                if !visited[n] && image.data[n] <= threshold {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }
        blobs.push(blob);
    }
    blobs
}

fn median_area(blobs: &[Blob]) -> f64 {
    let mut areas: Vec<usize> = blobs.iter().map(|b| b.area).collect();
    areas.sort_unstable();
    match areas.len() {
        0 => 0.0,
        n if n % 2 == 1 => areas[n / 2] as f64,
        n => 0.5 * (areas[n / 2 - 1] + areas[n / 2]) as f64,
    }
}

impl DotDetector for BlobDotDetector {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip_all, fields(w = image.width, h = image.height))
    )]
    fn detect(&self, image: &GrayImageView<'_>) -> Vec<Dot> {
        if image.width == 0 || image.height == 0 {
            return Vec::new();
        }
        let p = &self.params;
        let threshold = p.threshold.unwrap_or_else(|| otsu_threshold(image.data));
        let blobs: Vec<Blob> = dark_components(image, threshold)
            .into_iter()
            .filter(|b| b.area >= p.min_area && b.area <= p.max_area)
            .filter(|b| !(p.reject_border && b.touches_border))
            .collect();

        let median = median_area(&blobs);
        let centre = blobs
            .iter()
            .enumerate()
            .filter(|(_, b)| b.area as f64 > p.centre_area_ratio * median)
            .max_by_key(|(_, b)| b.area)
            .map(|(i, _)| i);

        let dots: Vec<Dot> = blobs
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let n = b.area as f64;
                let radius = (n / std::f64::consts::PI).sqrt();
                let (x, y) = (b.sum_x / n, b.sum_y / n);
                if Some(i) == centre {
                    Dot::centre(x, y, radius)
                } else {
                    Dot::new(x, y, radius)
                }
            })
            .collect();
        debug!(
            "blobs: threshold {threshold}, {} dots, median area {median:.1}, centre {}",
            dots.len(),
            centre.is_some()
        );
        dots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotgrid_core::GrayImage;

    fn disk(img: &mut GrayImage, cx: f64, cy: f64, r: f64) {
        for y in 0..img.height {
            for x in 0..img.width {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x, y, 10);
                }
            }
        }
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut pixels = vec![20u8; 100];
        pixels.extend(std::iter::repeat_n(220u8, 300));
        let t = otsu_threshold(&pixels);
        assert!((20..220).contains(&t), "threshold {t}");
        assert_eq!(otsu_threshold(&[9, 9, 9]), 9);
    }

    #[test]
    fn finds_dots_and_the_large_centre_marker() {
        let mut img = GrayImage::new(120, 100, 230);
        let spots = [(20.0, 20.0), (60.0, 20.0), (100.0, 20.0), (20.0, 60.0), (100.0, 60.0)];
        for &(x, y) in &spots {
            disk(&mut img, x, y, 4.0);
        }
        disk(&mut img, 60.0, 60.0, 9.0);

        let dots = BlobDotDetector::default().detect(&img.view());
        assert_eq!(dots.len(), 6);
        let centres: Vec<&Dot> = dots.iter().filter(|d| d.is_centre).collect();
        assert_eq!(centres.len(), 1);
        assert!((centres[0].position.x - 60.0).abs() < 0.5);
        assert!((centres[0].position.y - 60.0).abs() < 0.5);
        for d in dots.iter().filter(|d| !d.is_centre) {
            assert!((d.radius - 4.0).abs() < 1.0, "radius {}", d.radius);
        }
    }

    #[test]
    fn border_blobs_and_specks_are_dropped() {
        let mut img = GrayImage::new(60, 60, 230);
        disk(&mut img, 0.0, 30.0, 5.0);
        img.put_pixel(40, 40, 10);
        disk(&mut img, 30.0, 30.0, 4.0);
        let dots = BlobDotDetector::default().detect(&img.view());
        assert_eq!(dots.len(), 1);
        // a single dot is its own median, so nothing qualifies as the centre
        assert!(!dots[0].is_centre);
    }
}
