//! Grid coordinate propagation over the link graph.

use dotgrid_core::GridCoords;
use log::debug;

use crate::{link_dots, CentreSquare, DotGraph, DotLink, LinkParams};

/// Coordinate of `neighbour` relative to an assigned `current` dot across a
/// link. Grid `y` grows upwards, so a neighbour higher in the image (smaller
/// pixel `y`) gets `+1`.
fn neighbour_coords(
    graph: &DotGraph,
    current: usize,
    neighbour: usize,
    horizontal: bool,
) -> Option<GridCoords> {
    let base = graph.node(current).grid?;
    let here = graph.node(current).position;
    let there = graph.node(neighbour).position;
    Some(if horizontal {
        base.offset(if there.x < here.x { -1 } else { 1 }, 0)
    } else {
        base.offset(0, if there.y < here.y { 1 } else { -1 })
    })
}

/// Depth-first propagation from an assigned dot through its incoming links.
///
/// Already assigned dots are never re-entered, so cycles in the link graph
/// terminate. Returns the number of dots newly assigned.
pub fn propagate_coordinates(graph: &mut DotGraph, current: usize) -> usize {
    let links: Vec<DotLink> = graph.incoming(current).copied().collect();
    let mut assigned = 0;
    for link in links {
        let neighbour = link.from;
        if graph.node(neighbour).is_assigned() {
            continue;
        }
        let Some(coords) = neighbour_coords(graph, current, neighbour, link.horizontal) else {
            continue;
        };
        graph.node_mut(neighbour).grid = Some(coords);
        assigned += 1 + propagate_coordinates(graph, neighbour);
    }
    assigned
}

/// Seed the centre square, link the lattice outward from it and propagate
/// grid coordinates. Returns the total number of assigned dots.
pub fn assign_grid_coordinates(
    graph: &mut DotGraph,
    square: &CentreSquare,
    params: &LinkParams,
) -> usize {
    let steps = square.steps(graph.nodes());
    square.seed(graph);
    let seeds = square.corners();
    link_dots(graph, &seeds, steps, params);
    for seed in seeds {
        propagate_coordinates(graph, seed);
    }
    let assigned = graph.assigned_count();
    debug!("assigned grid coordinates to {}/{} dots", assigned, graph.len());
    assigned
}
