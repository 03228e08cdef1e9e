// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{EikonalError, Result};

/// Grid geometry access. Provides shape, spacing, bounds checking,
/// neighbor enumeration, and index conversion utilities.
pub trait GridData<const N: usize> {
    /// Get the grid shape (number of nodes along each axis).
    fn shape(&self) -> [usize; N];

    /// Get the grid spacing along each axis.
    fn spacing(&self) -> [f64; N];

    /// Get the total number of nodes in the grid.
    fn num_nodes(&self) -> usize;

    /// Whether an N-dimensional index lies inside the grid.
    fn is_in_bounds(&self, idx: [usize; N]) -> bool;

    /// Convert a flat index to an N-dimensional index.
    fn flat_to_nd(&self, flat: usize) -> [usize; N];

    /// Convert an N-dimensional index to a flat index.
    fn nd_to_flat(&self, idx: [usize; N]) -> usize;

    /// Flat index of the neighbor one step along `axis`, or `None` when it
    /// falls outside the grid. `upper` selects the +1 side.
    fn axis_neighbor(&self, flat: usize, axis: usize, upper: bool) -> Option<usize>;

    /// The in-bounds axis-aligned neighbors of `flat`, tagged with their axis.
    fn neighbors(&self, flat: usize) -> Neighbors<'_, Self, N>
    where
        Self: Sized,
    {
        Neighbors {
            grid: self,
            flat,
            step: 0,
        }
    }
}

/// Iterator over the (at most 2·N) axis-aligned neighbors of a node.
pub struct Neighbors<'a, G, const N: usize> {
    grid: &'a G,
    flat: usize,
    step: usize,
}

impl<G: GridData<N>, const N: usize> Iterator for Neighbors<'_, G, N> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        while self.step < 2 * N {
            let axis = self.step / 2;
            let upper = self.step % 2 == 1;
            self.step += 1;
            if let Some(n) = self.grid.axis_neighbor(self.flat, axis, upper) {
                return Some((axis, n));
            }
        }
        None
    }
}

/// A grid index paired with a scalar value.
///
/// Used for seeds (known arrival times), targets, and reported results.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node<const N: usize> {
    /// Grid index.
    pub index: [usize; N],
    /// Arrival time (or tentative arrival time for trial seeds).
    pub value: f64,
}

impl<const N: usize> Node<N> {
    /// Create a node at `index` with `value`.
    pub fn new(index: [usize; N], value: f64) -> Self {
        Node { index, value }
    }
}

/// Source of propagation speed values.
#[derive(Debug, Clone, PartialEq)]
pub enum Speed {
    /// The same speed everywhere.
    Constant(f64),
    /// One speed value per node in row-major order.
    Field(Vec<f64>),
}

impl Speed {
    /// Raw speed at a flat index.
    #[inline]
    pub fn at(&self, flat: usize) -> f64 {
        match self {
            Speed::Constant(v) => *v,
            Speed::Field(values) => values[flat],
        }
    }
}

/// A structured Cartesian grid with per-axis spacing.
///
/// Holds only geometry; the generic parameter `N` is the number of spatial
/// dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianGrid<const N: usize> {
    shape: [usize; N],
    strides: [usize; N],
    spacing: [f64; N],
}

impl<const N: usize> CartesianGrid<N> {
    /// Create a new Cartesian grid with the given shape and per-axis spacing.
    ///
    /// # Errors
    /// Returns an error if any axis is empty or any spacing is not positive
    /// and finite.
    pub fn new(shape: [usize; N], spacing: [f64; N]) -> Result<Self> {
        assert!(N >= 1, "CartesianGrid needs at least one dimension");

        for (axis, &size) in shape.iter().enumerate() {
            if size == 0 {
                return Err(EikonalError::InvalidGridShape { axis, size });
            }
        }
        for (axis, &value) in spacing.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(EikonalError::InvalidGridSpacing { axis, value });
            }
        }

        let mut strides = [0usize; N];
        strides[N - 1] = 1;
        for d in (0..N - 1).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }

        Ok(CartesianGrid {
            shape,
            strides,
            spacing,
        })
    }

    /// Create a grid with the same spacing `h` along every axis.
    ///
    /// # Errors
    /// See [`CartesianGrid::new`].
    pub fn uniform(shape: [usize; N], h: f64) -> Result<Self> {
        Self::new(shape, [h; N])
    }
}

#[allow(clippy::needless_range_loop)]
impl<const N: usize> GridData<N> for CartesianGrid<N> {
    fn shape(&self) -> [usize; N] {
        self.shape
    }

    fn spacing(&self) -> [f64; N] {
        self.spacing
    }

    fn num_nodes(&self) -> usize {
        self.shape.iter().product()
    }

    fn is_in_bounds(&self, idx: [usize; N]) -> bool {
        idx.iter().zip(self.shape.iter()).all(|(&i, &n)| i < n)
    }

    fn flat_to_nd(&self, flat: usize) -> [usize; N] {
        let mut idx = [0usize; N];
        let mut remainder = flat;
        for d in 0..N {
            idx[d] = remainder / self.strides[d];
            remainder %= self.strides[d];
        }
        idx
    }

    fn nd_to_flat(&self, idx: [usize; N]) -> usize {
        let mut flat = 0;
        for d in 0..N {
            flat += idx[d] * self.strides[d];
        }
        flat
    }

    #[inline]
    fn axis_neighbor(&self, flat: usize, axis: usize, upper: bool) -> Option<usize> {
        let coord = (flat / self.strides[axis]) % self.shape[axis];
        if upper {
            (coord + 1 < self.shape[axis]).then(|| flat + self.strides[axis])
        } else {
            (coord > 0).then(|| flat - self.strides[axis])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_nd_roundtrip_2d() {
        let grid = CartesianGrid::<2>::uniform([12, 8], 1.0).unwrap();
        for flat in 0..96 {
            let nd = grid.flat_to_nd(flat);
            assert_eq!(grid.nd_to_flat(nd), flat, "flat={} nd={:?}", flat, nd);
        }
    }

    #[test]
    fn flat_nd_roundtrip_3d() {
        let grid = CartesianGrid::<3>::uniform([4, 5, 6], 1.0).unwrap();
        for flat in 0..120 {
            let nd = grid.flat_to_nd(flat);
            assert_eq!(grid.nd_to_flat(nd), flat);
        }
    }

    #[test]
    fn bounds_check() {
        let grid = CartesianGrid::<2>::uniform([4, 6], 1.0).unwrap();
        assert!(grid.is_in_bounds([0, 0]));
        assert!(grid.is_in_bounds([3, 5]));
        assert!(!grid.is_in_bounds([4, 0]));
        assert!(!grid.is_in_bounds([0, 6]));
        assert!(!grid.is_in_bounds([200, 200]));
    }

    #[test]
    fn interior_node_has_all_neighbors() {
        let grid = CartesianGrid::<3>::uniform([5, 5, 5], 1.0).unwrap();
        let flat = grid.nd_to_flat([2, 2, 2]);
        let mut got: Vec<(usize, [usize; 3])> = grid
            .neighbors(flat)
            .map(|(axis, n)| (axis, grid.flat_to_nd(n)))
            .collect();
        got.sort();
        assert_eq!(
            got,
            vec![
                (0, [1, 2, 2]),
                (0, [3, 2, 2]),
                (1, [2, 1, 2]),
                (1, [2, 3, 2]),
                (2, [2, 2, 1]),
                (2, [2, 2, 3]),
            ]
        );
    }

    #[test]
    fn corner_neighbors_do_not_wrap() {
        let grid = CartesianGrid::<2>::uniform([3, 4], 1.0).unwrap();
        // [0, 3] is the last node of the first row; [1, 0] is flat+1 but not a neighbor.
        let flat = grid.nd_to_flat([0, 3]);
        let got: Vec<[usize; 2]> = grid
            .neighbors(flat)
            .map(|(_, n)| grid.flat_to_nd(n))
            .collect();
        assert_eq!(got, vec![[1, 3], [0, 2]]);
    }

    #[test]
    fn single_node_axis_has_no_neighbors_along_it() {
        let grid = CartesianGrid::<2>::uniform([1, 3], 1.0).unwrap();
        let flat = grid.nd_to_flat([0, 1]);
        let axes: Vec<usize> = grid.neighbors(flat).map(|(axis, _)| axis).collect();
        assert_eq!(axes, vec![1, 1]);
    }

    #[test]
    fn invalid_grid_shape() {
        let result = CartesianGrid::<2>::uniform([0, 10], 1.0);
        assert!(matches!(
            result,
            Err(EikonalError::InvalidGridShape { axis: 0, size: 0 })
        ));
    }

    #[test]
    fn invalid_grid_spacing() {
        let result = CartesianGrid::<2>::new([4, 4], [1.0, 0.0]);
        assert!(matches!(
            result,
            Err(EikonalError::InvalidGridSpacing { axis: 1, .. })
        ));
        let result = CartesianGrid::<2>::new([4, 4], [f64::NAN, 1.0]);
        assert!(matches!(
            result,
            Err(EikonalError::InvalidGridSpacing { axis: 0, .. })
        ));
    }

    #[test]
    fn speed_lookup() {
        assert_eq!(Speed::Constant(2.5).at(17), 2.5);
        let field = Speed::Field(vec![1.0, 2.0, 3.0]);
        assert_eq!(field.at(1), 2.0);
    }
}
