//! Radial distortion model and the centre-of-distortion search.
//!
//! The model maps a rectified radius `r` (distance of an ideal grid
//! intercept from the centre of distortion) to the observed radius of the
//! matching dot. For one candidate centre the curve is a plain least-squares
//! polynomial fit; the centre itself is found by an annealing loop that
//! repeatedly samples a disk of candidate centres, moves to their
//! inverse-error-weighted centroid and shrinks or grows the disk depending on
//! whether the refit improved.

use dotgrid_core::{FittedPolynomial, Polynomial, PolynomialFit};
use log::debug;
use nalgebra::{Point2, Vector2};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::DistortionFitParams;

/// One regression sample: an ideal grid intercept and the dot observed for it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadialSample {
    pub ideal: Point2<f64>,
    pub observed: Point2<f64>,
}

/// Fit `observed radius = curve(ideal radius)` about `centre`.
pub fn fit_curve_at(
    samples: &[RadialSample],
    centre: Point2<f64>,
    degree: usize,
) -> Option<FittedPolynomial> {
    let mut fit = PolynomialFit::new(degree);
    for s in samples {
        fit.add_point((s.ideal - centre).norm(), (s.observed - centre).norm());
    }
    fit.solve()
}

/// Reject curves whose outward deviation from the identity at `max_radius`
/// exceeds the deviation at `max_radius / 2`.
pub fn valid_curve(curve: &Polynomial, max_radius: f64) -> bool {
    let half = 0.5 * max_radius;
    curve.eval(max_radius) - max_radius <= curve.eval(half) - half
}

/// A fitted radial curve about a centre of distortion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistortionModel {
    pub curve: Polynomial,
    pub centre: Point2<f64>,
}

impl DistortionModel {
    /// Model that leaves every point where it is.
    pub fn identity(centre: Point2<f64>) -> Self {
        Self {
            curve: Polynomial::identity(),
            centre,
        }
    }

    /// Observed position of a rectified point.
    pub fn distort_point(&self, p: Point2<f64>) -> Point2<f64> {
        let d = p - self.centre;
        let r = d.norm();
        if r < 1e-12 {
            return p;
        }
        self.centre + d * (self.curve.eval(r) / r)
    }

    /// Rectified position of an observed point.
    ///
    /// Inverts the curve with Newton's method and falls back to bisection;
    /// `None` if the observed radius is not reached by the curve.
    pub fn rectify_point(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let d = p - self.centre;
        let actual = d.norm();
        if actual < 1e-12 {
            return Some(p);
        }
        let r = self.invert_radius(actual)?;
        Some(self.centre + d * (r / actual))
    }

    /// Rectified radius `r >= 0` with `curve(r) == actual`.
    pub fn invert_radius(&self, actual: f64) -> Option<f64> {
        let derivative = self.curve.derivative();
        let mut r = actual;
        for _ in 0..50 {
            let f = self.curve.eval(r) - actual;
            if f.abs() < 1e-10 {
                return (r >= 0.0 && r.is_finite()).then_some(r);
            }
            let df = derivative.eval(r);
            if df.abs() < 1e-12 || !df.is_finite() {
                break;
            }
            r -= f / df;
            if !r.is_finite() {
                break;
            }
        }

        let mut lo = 0.0;
        if self.curve.eval(lo) > actual {
            return None;
        }
        let mut hi = actual.max(1.0);
        let mut grown = 0;
        while self.curve.eval(hi) < actual {
            hi *= 2.0;
            grown += 1;
            if grown > 60 {
                return None;
            }
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if self.curve.eval(mid) < actual {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(0.5 * (lo + hi))
    }

    /// Uniform scale that keeps the horizontal half-width of a `width` px
    /// image at the same raw radius after rectification.
    pub fn scale_for_width(&self, width: usize) -> f64 {
        let half = 0.5 * width as f64;
        let mapped = self.curve.eval(half);
        if !mapped.is_finite() || mapped <= 1e-9 {
            return 1.0;
        }
        half / mapped
    }
}

/// Result of the centre-of-distortion search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistortionFit {
    pub model: DistortionModel,
    pub rms_error: f64,
    pub mean_error: f64,
    /// Largest rectified radius among the samples.
    pub max_radius: f64,
    /// Passes where the refit improved and the search cooled.
    pub cooled: usize,
    /// Passes where it did not and the search heated up.
    pub heated: usize,
}

/// Uniform offset in `[-noise, noise]²`, or zero when that range cannot be
/// sampled (zero, non-finite or overflowing width).
fn jitter<R: Rng>(rng: &mut R, noise: f64) -> Vector2<f64> {
    let n = noise.abs();
    if n == 0.0 || !(2.0 * n).is_finite() {
        return Vector2::zeros();
    }
    Vector2::new(rng.random_range(-n..=n), rng.random_range(-n..=n))
}

/// Inverse-error-weighted centroid of valid candidate centres sampled on a
/// `increment`-spaced lattice inside a disk of `radius` around `centre`.
fn weighted_centroid<R: Rng>(
    samples: &[RadialSample],
    centre: Point2<f64>,
    radius: f64,
    increment: f64,
    noise: f64,
    params: &DistortionFitParams,
    rng: &mut R,
) -> Option<Point2<f64>> {
    let n = if increment > 0.0 && increment.is_finite() && radius.is_finite() {
        (radius / increment).floor().clamp(0.0, 256.0) as i64
    } else {
        0
    };
    let step = if n > 0 { increment } else { 0.0 };

    let mut sum = Vector2::zeros();
    let mut weight = 0.0;
    for gy in -n..=n {
        for gx in -n..=n {
            let offset = Vector2::new(gx as f64 * step, gy as f64 * step);
            if offset.norm() > radius {
                continue;
            }
            let candidate = centre + offset + jitter(rng, noise);
            let Some(fit) = fit_curve_at(samples, candidate, params.degree) else {
                continue;
            };
            if !valid_curve(&fit.polynomial, fit.max_x) {
                continue;
            }
            let e = fit.mean_error;
            if e * e <= params.error_floor {
                continue;
            }
            let w = 1.0 / e;
            sum += candidate.coords * w;
            weight += w;
        }
    }
    (weight > 0.0).then(|| Point2::from(sum / weight))
}

/// Search extent and comparison baseline carried from pass to pass.
#[derive(Clone, Debug, PartialEq)]
struct Annealing {
    radius: f64,
    increment: f64,
    noise: f64,
    /// Error a refit has to beat to count as an improvement.
    min_error: f64,
    /// Earlier baselines, restored one per heat-up.
    history: Vec<f64>,
}

impl Annealing {
    fn new(params: &DistortionFitParams) -> Self {
        Self {
            radius: params.search_radius,
            increment: params.increment,
            noise: params.noise,
            min_error: f64::INFINITY,
            history: Vec::new(),
        }
    }

    fn improves(&self, error: f64, epsilon: f64) -> bool {
        error < self.min_error - epsilon
    }

    fn rescale(&mut self, factor: f64) {
        self.radius *= factor;
        self.increment *= factor;
        self.noise *= factor;
    }

    /// Accept `error` as the new baseline and shrink the search.
    fn cool(&mut self, error: f64, factor: f64) {
        if self.min_error.is_finite() {
            self.history.push(self.min_error);
        }
        self.min_error = error;
        self.rescale(factor);
    }

    /// Grow the search and fall back to the previous baseline, if any.
    fn heat(&mut self, factor: f64) {
        self.rescale(1.0 / factor);
        if let Some(previous) = self.history.pop() {
            self.min_error = previous;
        }
    }
}

/// Search for the centre of distortion starting at `initial` and return the
/// best curve seen over the fixed pass budget.
///
/// Returns `None` if no candidate centre yields a solvable fit. Parameters
/// are expected to pass [`DistortionFitParams::validate`]; out-of-range
/// sampling widths only disable the random jitter.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(samples, params, rng), fields(samples = samples.len()))
)]
pub fn fit_distortion<R: Rng>(
    samples: &[RadialSample],
    initial: Point2<f64>,
    params: &DistortionFitParams,
    rng: &mut R,
) -> Option<DistortionFit> {
    let cooling = params.cooling_factor;
    let mut state = Annealing::new(params);

    let mut centre = initial;
    let mut best = fit_curve_at(samples, initial, params.degree).map(|fit| (fit, initial));
    let mut best_error = best
        .as_ref()
        .map_or(f64::INFINITY, |(fit, _)| fit.mean_error);
    let mut best_centre = initial;
    let (mut cooled, mut heated) = (0, 0);

    for _ in 0..params.passes {
        let next = weighted_centroid(
            samples,
            centre,
            state.radius,
            state.increment,
            state.noise,
            params,
            rng,
        )
        .unwrap_or(centre);
        match fit_curve_at(samples, next, params.degree) {
            Some(fit) if state.improves(fit.mean_error, params.improvement_epsilon) => {
                state.cool(fit.mean_error, cooling);
                centre = next;
                cooled += 1;
                if fit.mean_error < best_error {
                    best_error = fit.mean_error;
                    best_centre = next;
                    best = Some((fit, next));
                }
            }
            _ => {
                state.heat(cooling);
                centre = best_centre + jitter(rng, state.noise);
                heated += 1;
            }
        }
    }

    let (fit, centre) = best?;
    debug!(
        "distortion fit: centre ({:.2}, {:.2}), rms {:.4}, mean {:.4}, cooled {cooled}, heated {heated}",
        centre.x, centre.y, fit.rms_error, fit.mean_error
    );
    Some(DistortionFit {
        model: DistortionModel {
            curve: fit.polynomial,
            centre,
        },
        rms_error: fit.rms_error,
        mean_error: fit.mean_error,
        max_radius: fit.max_x,
        cooled,
        heated,
    })
}
