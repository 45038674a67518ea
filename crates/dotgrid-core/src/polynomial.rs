//! One-dimensional polynomial least-squares regression.
//!
//! Used for the radial distortion curve (degree 3) and for the pan/tilt servo
//! curves (degree 1). Samples are accumulated with [`PolynomialFit::add_point`]
//! and solved via the normal equations on an `x` axis normalised by
//! `max |x|`, which keeps the system well conditioned when `x` spans hundreds
//! of pixels.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Polynomial `c0 + c1·x + c2·x² + …` in raw (unnormalised) units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    pub coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// The identity `y = x`.
    pub fn identity() -> Self {
        Self::new(vec![0.0, 1.0])
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficient of `x^i`, zero past the degree.
    pub fn coefficient(&self, i: usize) -> f64 {
        self.coefficients.get(i).copied().unwrap_or(0.0)
    }

    pub fn derivative(&self) -> Polynomial {
        if self.coefficients.len() <= 1 {
            return Polynomial::new(vec![0.0]);
        }
        Polynomial::new(
            self.coefficients
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| c * i as f64)
                .collect(),
        )
    }
}

/// Sample accumulator for a least-squares polynomial fit.
#[derive(Clone, Debug)]
pub struct PolynomialFit {
    degree: usize,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl PolynomialFit {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            xs: Vec::new(),
            ys: Vec::new(),
        }
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        self.xs.push(x);
        self.ys.push(y);
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Solve the least-squares system.
    ///
    /// Returns `None` with fewer than `degree + 1` samples, non-finite input or
    /// a singular normal matrix.
    pub fn solve(&self) -> Option<FittedPolynomial> {
        let n = self.xs.len();
        let terms = self.degree + 1;
        if n < terms {
            return None;
        }
        if self
            .xs
            .iter()
            .chain(self.ys.iter())
            .any(|v| !v.is_finite())
        {
            return None;
        }

        let max_x = self.xs.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        let s = if max_x > 0.0 { max_x } else { 1.0 };

        let mut ata = DMatrix::<f64>::zeros(terms, terms);
        let mut atb = DVector::<f64>::zeros(terms);
        let mut row = vec![0.0; terms];
        for (&x, &y) in self.xs.iter().zip(self.ys.iter()) {
            let u = x / s;
            let mut p = 1.0;
            for r in row.iter_mut() {
                *r = p;
                p *= u;
            }
            for i in 0..terms {
                atb[i] += row[i] * y;
                for j in 0..terms {
                    ata[(i, j)] += row[i] * row[j];
                }
            }
        }

        let b = ata.lu().solve(&atb)?;
        if b.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let mut coefficients = Vec::with_capacity(terms);
        let mut scale = 1.0;
        for i in 0..terms {
            coefficients.push(b[i] / scale);
            scale *= s;
        }
        let polynomial = Polynomial::new(coefficients);

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (&x, &y) in self.xs.iter().zip(self.ys.iter()) {
            let r = y - polynomial.eval(x);
            abs_sum += r.abs();
            sq_sum += r * r;
        }

        Some(FittedPolynomial {
            polynomial,
            mean_error: abs_sum / n as f64,
            rms_error: (sq_sum / n as f64).sqrt(),
            max_x,
            samples: n,
        })
    }
}

/// A solved fit together with its residual statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedPolynomial {
    pub polynomial: Polynomial,
    /// Mean absolute residual over the samples.
    pub mean_error: f64,
    /// Root mean squared residual over the samples.
    pub rms_error: f64,
    /// Largest `|x|` among the samples.
    pub max_x: f64,
    pub samples: usize,
}

impl FittedPolynomial {
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.polynomial.eval(x)
    }

    pub fn degree(&self) -> usize {
        self.polynomial.degree()
    }

    pub fn coefficient(&self, i: usize) -> f64 {
        self.polynomial.coefficient(i)
    }

    pub fn mean_error(&self) -> f64 {
        self.mean_error
    }

    pub fn rms_error(&self) -> f64 {
        self.rms_error
    }
}
