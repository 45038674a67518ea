use serde::{Deserialize, Serialize};

/// Owned row-major 2D array with signed, bounds-checked indexing.
///
/// Out-of-range indices (including negative ones) return `None` instead of
/// panicking, so callers can probe neighbours and offsets freely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid2D<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid2D<T> {
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }
}

impl<T> Grid2D<T> {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Wrap a row-major vector. Returns `None` if the length does not match.
    pub fn from_vec(width: usize, height: usize, cells: Vec<T>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.index(x, y).is_some()
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<&T> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    #[inline]
    pub fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut T> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    /// Store `value` at `(x, y)`. Returns `false` when out of range.
    pub fn set(&mut self, x: i64, y: i64, value: T) -> bool {
        match self.get_mut(x, y) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Iterate `(x, y, &cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        let w = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (i % w, i / w, c))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.cells.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

impl<T> Grid2D<Option<T>> {
    /// `true` if `(x, y)` is in range and holds a value.
    #[inline]
    pub fn is_populated(&self, x: i64, y: i64) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// The value at `(x, y)`, flattening the range check and the hole.
    #[inline]
    pub fn value(&self, x: i64, y: i64) -> Option<&T> {
        self.get(x, y).and_then(Option::as_ref)
    }

    pub fn populated_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_access_is_none() {
        let mut g = Grid2D::new(3, 2, 0u8);
        assert!(g.set(2, 1, 7));
        assert_eq!(g.get(2, 1), Some(&7));
        assert_eq!(g.get(3, 0), None);
        assert_eq!(g.get(-1, 0), None);
        assert_eq!(g.get(0, 2), None);
        assert!(!g.set(0, -1, 1));
    }

    #[test]
    fn iter_visits_row_major() {
        let g = Grid2D::from_fn(3, 2, |x, y| x + 10 * y);
        let v: Vec<(usize, usize, usize)> = g.iter().map(|(x, y, c)| (x, y, *c)).collect();
        assert_eq!(v[0], (0, 0, 0));
        assert_eq!(v[2], (2, 0, 2));
        assert_eq!(v[3], (0, 1, 10));
        assert_eq!(v.len(), 6);
        assert!(Grid2D::from_vec(2, 2, vec![0; 3]).is_none());
        let g = Grid2D::from_vec(2, 1, vec![1, 2]).expect("2x1");
        assert_eq!(g.get(1, 0), Some(&2));
    }

    #[test]
    fn option_grid_helpers() {
        let mut g: Grid2D<Option<usize>> = Grid2D::new(2, 2, None);
        g.set(1, 0, Some(4));
        assert!(g.is_populated(1, 0));
        assert!(!g.is_populated(0, 0));
        assert!(!g.is_populated(5, 5));
        assert_eq!(g.value(1, 0), Some(&4));
        assert_eq!(g.populated_count(), 1);
    }
}
