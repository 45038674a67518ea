use serde::{Deserialize, Serialize};

/// Parameters for the ideal grid overlay search.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayParams {
    /// Largest symmetric inset, in cells, tried from the left/right edges
    /// when looking for a populated grid rectangle.
    pub max_inset_x: usize,
    /// Largest symmetric inset, in cells, from the top/bottom edges.
    pub max_inset_y: usize,
    /// Number of discrete perimeter scale factors.
    pub scale_steps: usize,
    /// Total span of the scale factors around 1.0.
    pub scale_span: f64,
    /// Relative jitter applied to the left and right perimeter edges.
    pub edge_jitter: f64,
    /// Horizontal translation range in whole pixels (`±`).
    pub translate_x: i32,
    /// Vertical translation range in whole pixels (`±`).
    pub translate_y: i32,
    /// Cell offset range tried by the best-fit matcher (`±`).
    pub offset_range: i64,
    /// Seed for the per-image random generator.
    pub seed: u64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            max_inset_x: 5,
            max_inset_y: 3,
            scale_steps: 100,
            scale_span: 0.2,
            edge_jitter: 0.05,
            translate_x: 10,
            translate_y: 5,
            offset_range: 1,
            seed: 0,
        }
    }
}

/// Parameters for the centre-of-distortion search.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DistortionFitParams {
    /// Degree of the radial polynomial.
    pub degree: usize,
    /// Fixed number of annealing passes.
    pub passes: usize,
    /// Multiplier applied to radius/increment/noise when cooling; its
    /// inverse is applied when heating.
    pub cooling_factor: f64,
    /// Candidates with `mean_error²` at or below this are left out of the
    /// weighted centroid.
    pub error_floor: f64,
    /// Minimum drop in mean error that counts as an improvement.
    pub improvement_epsilon: f64,
    /// Initial radius of the sampled disk around the current centre (px).
    pub search_radius: f64,
    /// Initial sample spacing inside the disk (px).
    pub increment: f64,
    /// Initial uniform jitter added to every sample (px).
    pub noise: f64,
}

/// A [`DistortionFitParams`] value the annealing search cannot run with.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("cooling_factor must be in (0, 1], got {0}")]
    CoolingFactor(f64),

    #[error("{name} must be finite and non-negative, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

impl DistortionFitParams {
    /// Check the values that feed the sampling ranges of the search.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let c = self.cooling_factor;
        if !(c > 0.0 && c <= 1.0) {
            return Err(ParamsError::CoolingFactor(c));
        }
        for (name, value) in [
            ("search_radius", self.search_radius),
            ("increment", self.increment),
            ("noise", self.noise),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParamsError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}

impl Default for DistortionFitParams {
    fn default() -> Self {
        Self {
            degree: 3,
            passes: 1000,
            cooling_factor: 0.99999999999999,
            error_floor: 0.001,
            improvement_epsilon: 1e-9,
            search_radius: 20.0,
            increment: 4.0,
            noise: 1.0,
        }
    }
}

/// Parameters for remap table construction.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemapParams {
    /// Rectified pixels closer than this to the centre of distortion are
    /// mapped without radial correction.
    pub min_radius: f64,
}

impl Default for RemapParams {
    fn default() -> Self {
        Self { min_radius: 0.01 }
    }
}
