use dotgrid_core::Dot;
use log::info;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    assign_grid_coordinates, find_centre_square, CentreSquare, DenseGrid, DotGraph, LinkParams,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("no dots to build a grid from")]
    NoDots,
    #[error("no centre dot among {0} dots")]
    NoCentreDot(usize),
    #[error("centre square incomplete: need one dot strictly inside each quadrant around the centre")]
    IncompleteCentreSquare,
}

/// Outcome of grid assignment for one image.
#[derive(Clone, Debug)]
pub struct GridAssignment {
    pub graph: DotGraph,
    pub square: CentreSquare,
    /// Number of dots that received a grid coordinate.
    pub assigned: usize,
    pub dense: DenseGrid,
}

/// Run centre-square identification, adjacency linking, coordinate
/// propagation and dense grid construction over one image's dots.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(dots, params), fields(dots = dots.len()))
)]
pub fn build_grid(dots: Vec<Dot>, params: &LinkParams) -> Result<GridAssignment, GridError> {
    if dots.is_empty() {
        return Err(GridError::NoDots);
    }
    if !dots.iter().any(|d| d.is_centre) {
        return Err(GridError::NoCentreDot(dots.len()));
    }
    let square = find_centre_square(&dots).ok_or(GridError::IncompleteCentreSquare)?;

    let mut graph = DotGraph::from_dots(dots);
    let assigned = assign_grid_coordinates(&mut graph, &square, params);
    // the seeds are always assigned, so the dense grid is never empty here
    let dense = DenseGrid::from_graph(&graph).ok_or(GridError::IncompleteCentreSquare)?;
    info!(
        "grid: {} of {} dots assigned, dense {}x{}",
        assigned,
        graph.len(),
        dense.width(),
        dense.height()
    );
    Ok(GridAssignment {
        graph,
        square,
        assigned,
        dense,
    })
}
