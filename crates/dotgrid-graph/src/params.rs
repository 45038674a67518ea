use serde::{Deserialize, Serialize};

/// Parameters for adjacency linking.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkParams {
    /// Acceptance radius around a predicted neighbour, as a fraction of the
    /// step vector length along the searched axis.
    pub tolerance: f64,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self { tolerance: 0.3 }
    }
}
