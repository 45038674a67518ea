use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Integer grid coordinate of a dot, relative to the centre marker.
///
/// `x` grows to the right and `y` grows *upwards* in the image: the four dots
/// around the centre marker are `(-1, 1)`, `(0, 1)`, `(0, 0)` and `(-1, 0)`
/// (top-left, top-right, bottom-right, bottom-left).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GridCoords {
    pub x: i32,
    pub y: i32,
}

impl GridCoords {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// One of the four cardinal search directions, in image space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Directions in search order; `index()` is the position in this array.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    /// Direction at `index` modulo 4.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Progress of the adjacency search in one direction of one dot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchState {
    #[default]
    Unsearched,
    /// The search from this dot in this direction is on the recursion stack.
    Searching,
    Searched,
}

/// A detected calibration dot.
///
/// Produced by a dot detector, then mutated in place by adjacency linking
/// (`search`) and grid coordinate propagation (`grid`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dot {
    /// Sub-pixel centre in image coordinates.
    pub position: Point2<f64>,
    /// Radius in pixels.
    pub radius: f64,
    /// The distinguished centre marker of the target.
    pub is_centre: bool,
    /// Grid coordinate once assigned.
    #[serde(default)]
    pub grid: Option<GridCoords>,
    /// Per-direction adjacency search state, indexed by [`Direction::index`].
    #[serde(default)]
    pub search: [SearchState; 4],
}

impl Dot {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            radius,
            is_centre: false,
            grid: None,
            search: [SearchState::Unsearched; 4],
        }
    }

    /// Construct the distinguished centre marker.
    pub fn centre(x: f64, y: f64, radius: f64) -> Self {
        Self {
            is_centre: true,
            ..Self::new(x, y, radius)
        }
    }

    #[inline]
    pub fn distance_to(&self, p: Point2<f64>) -> f64 {
        (self.position - p).norm()
    }

    #[inline]
    pub fn offset_to(&self, other: &Dot) -> Vector2<f64> {
        other.position - self.position
    }

    #[inline]
    pub fn search_state(&self, dir: Direction) -> SearchState {
        self.search[dir.index()]
    }

    #[inline]
    pub fn set_search_state(&mut self, dir: Direction, state: SearchState) {
        self.search[dir.index()] = state;
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.grid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_round_trip_through_index() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_index(dir.index()), dir);
            assert_eq!(Direction::from_index(dir.index() + 4), dir);
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.is_horizontal(), dir.opposite().is_horizontal());
        }
    }

    #[test]
    fn new_dot_is_unassigned_and_unsearched() {
        let dot = Dot::new(10.0, 20.0, 3.0);
        assert!(!dot.is_centre);
        assert!(!dot.is_assigned());
        assert!(Direction::ALL
            .iter()
            .all(|&d| dot.search_state(d) == SearchState::Unsearched));
        assert!(Dot::centre(0.0, 0.0, 5.0).is_centre);
    }
}
