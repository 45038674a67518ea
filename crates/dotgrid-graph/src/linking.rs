//! Adjacency linking by step-vector prediction.
//!
//! From a dot and the current step estimate, each unsearched cardinal
//! direction predicts where the neighbour should be. The first non-centre dot
//! (in list order) within tolerance of the prediction is accepted, linked back
//! to the searching dot and searched from recursively with the refined step.

use dotgrid_core::{Direction, SearchState};
use log::debug;
use nalgebra::{Point2, Vector2};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{DotGraph, LinkParams, StepVectors};

fn predicted(position: Point2<f64>, dir: Direction, steps: &StepVectors) -> Point2<f64> {
    match dir {
        Direction::Up => position - steps.vertical,
        Direction::Right => position + steps.horizontal,
        Direction::Down => position + steps.vertical,
        Direction::Left => position - steps.horizontal,
    }
}

/// First dot in list order within `tolerance` of `target`, skipping `current`
/// and centre markers. A dot exactly at the tolerance distance is accepted.
fn first_within(
    graph: &DotGraph,
    current: usize,
    target: Point2<f64>,
    tolerance: f64,
) -> Option<usize> {
    graph
        .nodes()
        .iter()
        .enumerate()
        .find(|(i, d)| *i != current && !d.is_centre && d.distance_to(target) <= tolerance)
        .map(|(i, _)| i)
}

/// Flip `delta` so it points the same way as `reference` along `x`
/// (horizontal) or `y` (vertical).
fn sign_corrected(delta: Vector2<f64>, reference: Vector2<f64>, horizontal: bool) -> Vector2<f64> {
    let (d, r) = if horizontal {
        (delta.x, reference.x)
    } else {
        (delta.y, reference.y)
    };
    if d * r < 0.0 {
        -delta
    } else {
        delta
    }
}

/// Search from `current` in every unsearched direction, starting at
/// `start_index` and wrapping. Returns the number of links created.
pub fn link_from(
    graph: &mut DotGraph,
    current: usize,
    steps: StepVectors,
    start_index: usize,
    params: &LinkParams,
) -> usize {
    if graph.node(current).is_centre {
        return 0;
    }

    let mut created = 0;
    for k in 0..4 {
        let dir = Direction::from_index(start_index + k);
        if graph.node(current).search_state(dir) != SearchState::Unsearched {
            continue;
        }
        graph
            .node_mut(current)
            .set_search_state(dir, SearchState::Searching);

        let horizontal = dir.is_horizontal();
        let step = if horizontal {
            steps.horizontal
        } else {
            steps.vertical
        };
        let tolerance = params.tolerance * step.norm();
        let position = graph.node(current).position;
        let target = predicted(position, dir, &steps);

        if let Some(found) = first_within(graph, current, target, tolerance) {
            let delta = graph.node(current).offset_to(graph.node(found));
            let mut next = steps;
            if horizontal {
                next.horizontal = sign_corrected(delta, steps.horizontal, true);
            } else {
                next.vertical = sign_corrected(delta, steps.vertical, false);
            }

            graph.link(found, current, horizontal);
            graph
                .node_mut(found)
                .set_search_state(dir.opposite(), SearchState::Searched);
            created += 1;
            created += link_from(graph, found, next, (start_index + 1) % 4, params);
        }

        graph
            .node_mut(current)
            .set_search_state(dir, SearchState::Searched);
    }
    created
}

/// Link outward from each seed dot with the same initial step estimate.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(graph, steps, params), fields(dots = graph.len()))
)]
pub fn link_dots(
    graph: &mut DotGraph,
    seeds: &[usize],
    steps: StepVectors,
    params: &LinkParams,
) -> usize {
    let created = seeds
        .iter()
        .map(|&seed| link_from(graph, seed, steps, 0, params))
        .sum();
    debug!(
        "linked {} dots with {} links from {} seeds",
        graph.len(),
        created,
        seeds.len()
    );
    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotgrid_core::Dot;

    fn steps(h: f64, v: f64) -> StepVectors {
        StepVectors {
            horizontal: Vector2::new(h, 0.0),
            vertical: Vector2::new(0.0, v),
        }
    }

    #[test]
    fn neighbour_exactly_at_tolerance_links() {
        let mut g = DotGraph::from_dots([Dot::new(100.0, 100.0, 2.0), Dot::new(152.0, 100.0, 2.0)]);
        let created = link_from(&mut g, 0, steps(40.0, 40.0), 0, &LinkParams::default());
        assert_eq!(created, 1);
        let link = g.links()[0];
        assert_eq!((link.from, link.to, link.horizontal), (1, 0, true));
    }

    #[test]
    fn neighbour_just_beyond_tolerance_does_not_link() {
        let mut g = DotGraph::from_dots([Dot::new(100.0, 100.0, 2.0), Dot::new(152.12, 100.0, 2.0)]);
        let created = link_from(&mut g, 0, steps(40.0, 40.0), 0, &LinkParams::default());
        assert_eq!(created, 0);
        assert!(g.links().is_empty());
    }

    #[test]
    fn vertical_tolerance_uses_vertical_step() {
        // horizontal step is large but the vertical one is short
        let mut g = DotGraph::from_dots([Dot::new(100.0, 100.0, 2.0), Dot::new(100.0, 114.0, 2.0)]);
        let created = link_from(&mut g, 0, steps(100.0, 10.0), 0, &LinkParams::default());
        assert_eq!(created, 0);
    }

    #[test]
    fn first_match_in_list_order_wins() {
        let mut g = DotGraph::from_dots([
            Dot::new(100.0, 100.0, 2.0),
            Dot::new(145.0, 100.0, 2.0),
            Dot::new(140.0, 100.0, 2.0),
        ]);
        link_from(&mut g, 0, steps(40.0, 40.0), 0, &LinkParams::default());
        let from_origin: Vec<usize> = g.incoming(0).map(|l| l.from).collect();
        assert_eq!(from_origin, vec![1]);
    }

    #[test]
    fn centre_dots_are_never_linked() {
        let mut g = DotGraph::from_dots([Dot::new(100.0, 100.0, 2.0), Dot::centre(140.0, 100.0, 4.0)]);
        assert_eq!(link_from(&mut g, 0, steps(40.0, 40.0), 0, &LinkParams::default()), 0);
        assert_eq!(link_from(&mut g, 1, steps(40.0, 40.0), 0, &LinkParams::default()), 0);
    }

    #[test]
    fn every_direction_ends_searched() {
        let mut g = DotGraph::from_dots([
            Dot::new(100.0, 100.0, 2.0),
            Dot::new(140.0, 100.0, 2.0),
            Dot::new(100.0, 140.0, 2.0),
            Dot::new(140.0, 140.0, 2.0),
        ]);
        link_from(&mut g, 0, steps(40.0, 40.0), 0, &LinkParams::default());
        for dot in g.nodes() {
            for dir in Direction::ALL {
                assert_eq!(dot.search_state(dir), SearchState::Searched);
            }
        }
        // the square closes into a cycle back onto the start dot
        assert_eq!(g.links().len(), 4);
    }

    #[test]
    fn step_sign_follows_reference() {
        let d = sign_corrected(Vector2::new(-38.0, 2.0), Vector2::new(40.0, 0.0), true);
        assert_eq!(d, Vector2::new(38.0, -2.0));
        let d = sign_corrected(Vector2::new(1.0, 41.0), Vector2::new(0.0, 40.0), false);
        assert_eq!(d, Vector2::new(1.0, 41.0));
    }
}
