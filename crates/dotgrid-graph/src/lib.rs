//! Topological grid recovery for dot-grid calibration targets.
//!
//! Pipeline:
//! 1. Find the centre marker and the four dots around it (the centre square).
//! 2. Seed those four dots with grid coordinates `(-1,1)`, `(0,1)`, `(0,0)`,
//!    `(-1,0)` and derive initial horizontal/vertical step vectors.
//! 3. Link neighbours outward by predicting each cardinal neighbour from the
//!    step vectors and accepting the first dot within tolerance.
//! 4. Propagate integer grid coordinates depth-first over the links.
//! 5. Pack assigned dots into a dense array indexed by grid coordinate.

mod assign;
mod centre;
mod coords;
mod dense;
mod graph;
mod linking;
mod params;

pub use assign::{build_grid, GridAssignment, GridError};
pub use centre::{find_centre_square, CentreSquare, StepVectors};
pub use coords::{assign_grid_coordinates, propagate_coordinates};
pub use dense::DenseGrid;
pub use graph::{DotGraph, DotLink};
pub use linking::{link_dots, link_from};
pub use params::LinkParams;
