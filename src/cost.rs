// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::Grid;
use crate::error::{EikonalError, Result};

/// Local traversal cost (inverse propagation speed) over the world domain.
///
/// A cost of `1` means unit speed; larger values slow the wavefront down and
/// `+inf` marks terrain that can never be crossed. Zero, negative and NaN
/// costs are contract violations and abort the computation.
///
/// Time-varying costs advertise changes through [`CostFunction::epoch`]: a
/// solver remembers the epoch its field was computed against and recomputes
/// on `update()` only when the epoch has moved.
pub trait CostFunction {
    /// Cost at a world position.
    fn cost_at(&self, point: [f64; 2]) -> f64;

    /// Counter bumped every time the cost values change.
    fn epoch(&self) -> u64 {
        0
    }
}

impl<C: CostFunction + ?Sized> CostFunction for Box<C> {
    fn cost_at(&self, point: [f64; 2]) -> f64 {
        (**self).cost_at(point)
    }

    fn epoch(&self) -> u64 {
        (**self).epoch()
    }
}

/// Query a cost function and reject non-positive or NaN answers.
pub fn checked_cost<C: CostFunction + ?Sized>(cost: &C, point: [f64; 2]) -> Result<f64> {
    let value = cost.cost_at(point);
    // Written so that NaN also fails.
    if !(value > 0.0) {
        return Err(EikonalError::InvalidCost { point, value });
    }
    Ok(value)
}

/// The same cost everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformCost {
    value: f64,
    epoch: u64,
}

impl UniformCost {
    /// Uniform cost with the given value.
    pub fn new(value: f64) -> Self {
        UniformCost { value, epoch: 0 }
    }

    /// Change the cost everywhere and bump the epoch.
    pub fn set(&mut self, value: f64) {
        self.value = value;
        self.epoch += 1;
    }
}

impl CostFunction for UniformCost {
    fn cost_at(&self, _point: [f64; 2]) -> f64 {
        self.value
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Per-node costs sampled on a regular lattice.
///
/// Queries return the cost of the nearest lattice node; positions outside the
/// lattice take the value of the closest edge node. Every mutation bumps the
/// epoch, so a solver owning a `GridCost` notices edits made through
/// `cost_mut()`.
#[derive(Debug, Clone)]
pub struct GridCost {
    num_points: [usize; 2],
    resolution: f64,
    origin: [f64; 2],
    values: Vec<f64>,
    epoch: u64,
}

impl GridCost {
    /// Build a cost lattice with the same geometry as `grid`.
    ///
    /// # Errors
    /// Returns an error if `values` does not hold one entry per node, or if
    /// any value is zero, negative or NaN.
    pub fn new(grid: &Grid, values: Vec<f64>) -> Result<Self> {
        let [nx, ny] = grid.num_points();
        if values.len() != nx * ny {
            return Err(EikonalError::ShapeMismatch {
                expected: vec![ny, nx],
                got: vec![values.len()],
            });
        }
        for (index, &value) in values.iter().enumerate() {
            if !(value > 0.0) {
                return Err(EikonalError::InvalidCost {
                    point: grid.point_to_coord(grid.node(index)),
                    value,
                });
            }
        }
        Ok(GridCost {
            num_points: [nx, ny],
            resolution: grid.resolution(),
            origin: grid.origin(),
            values,
            epoch: 0,
        })
    }

    /// A lattice with one value everywhere.
    pub fn uniform(grid: &Grid, value: f64) -> Result<Self> {
        Self::new(grid, vec![value; grid.num_nodes()])
    }

    fn flat_index(&self, node: [usize; 2]) -> Option<usize> {
        let [nx, ny] = self.num_points;
        (node[0] < nx && node[1] < ny).then(|| node[1] * nx + node[0])
    }

    /// Cost stored at a node, `None` outside the lattice.
    pub fn get(&self, node: [usize; 2]) -> Option<f64> {
        self.flat_index(node).map(|i| self.values[i])
    }

    /// Set the cost of a single node and bump the epoch.
    ///
    /// # Errors
    /// Returns an error if the node lies outside the lattice or the value is
    /// zero, negative or NaN. The lattice is left unchanged on error.
    pub fn set(&mut self, node: [usize; 2], value: f64) -> Result<()> {
        let i = self.flat_index(node).ok_or(EikonalError::NodeOutOfBounds {
            node,
            num_points: self.num_points,
        })?;
        if !(value > 0.0) {
            let point = [
                self.origin[0] + node[0] as f64 * self.resolution,
                self.origin[1] + node[1] as f64 * self.resolution,
            ];
            return Err(EikonalError::InvalidCost { point, value });
        }
        self.values[i] = value;
        self.epoch += 1;
        Ok(())
    }

    /// Set the cost of every node inside the world-space box `[min, max]`.
    ///
    /// Returns the number of nodes changed. The epoch is bumped once if any
    /// node changed.
    ///
    /// # Errors
    /// Returns an error if the value is zero, negative or NaN.
    pub fn fill_rect(&mut self, min: [f64; 2], max: [f64; 2], value: f64) -> Result<usize> {
        if !(value > 0.0) {
            return Err(EikonalError::InvalidCost { point: min, value });
        }
        let mut changed = 0;
        for y in 0..self.num_points[1] {
            let py = self.origin[1] + y as f64 * self.resolution;
            if py < min[1] || py > max[1] {
                continue;
            }
            for x in 0..self.num_points[0] {
                let px = self.origin[0] + x as f64 * self.resolution;
                if px < min[0] || px > max[0] {
                    continue;
                }
                self.values[y * self.num_points[0] + x] = value;
                changed += 1;
            }
        }
        if changed > 0 {
            self.epoch += 1;
        }
        Ok(changed)
    }

}

impl CostFunction for GridCost {
    fn cost_at(&self, point: [f64; 2]) -> f64 {
        let mut node = [0usize; 2];
        for d in 0..2 {
            let local = ((point[d] - self.origin[d]) / self.resolution).round().max(0.0);
            node[d] = (local as usize).min(self.num_points[d] - 1);
        }
        self.values[node[1] * self.num_points[0] + node[0]]
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// A cost given by a closure, with a manually driven epoch.
pub struct FnCost<F> {
    f: F,
    epoch: u64,
}

impl<F: Fn([f64; 2]) -> f64> FnCost<F> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        FnCost { f, epoch: 0 }
    }

    /// Signal that the closure's values have changed.
    pub fn invalidate(&mut self) {
        self.epoch += 1;
    }
}

impl<F: Fn([f64; 2]) -> f64> CostFunction for FnCost<F> {
    fn cost_at(&self, point: [f64; 2]) -> f64 {
        (self.f)(point)
    }

    fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_cost_rejects_non_positive() {
        assert_eq!(checked_cost(&UniformCost::new(2.0), [0.0, 0.0]).unwrap(), 2.0);
        for bad in [0.0, -1.0, f64::NAN] {
            let result = checked_cost(&UniformCost::new(bad), [1.0, 1.0]);
            assert!(matches!(result, Err(EikonalError::InvalidCost { .. })));
        }
        // Impassable terrain is a valid answer
        assert!(checked_cost(&UniformCost::new(f64::INFINITY), [0.0, 0.0])
            .unwrap()
            .is_infinite());
    }

    #[test]
    fn uniform_epoch_moves_on_set() {
        let mut cost = UniformCost::new(1.0);
        assert_eq!(cost.epoch(), 0);
        cost.set(3.0);
        assert_eq!(cost.epoch(), 1);
        assert_eq!(cost.cost_at([5.0, 5.0]), 3.0);
    }

    #[test]
    fn grid_cost_nearest_lookup() {
        let grid = Grid::new([3, 3], 0.5, [1.0, 1.0]).unwrap();
        let values: Vec<f64> = (1..=9).map(|v| v as f64).collect();
        let cost = GridCost::new(&grid, values).unwrap();
        assert_eq!(cost.cost_at([1.0, 1.0]), 1.0);
        assert_eq!(cost.cost_at([1.5, 1.0]), 2.0);
        assert_eq!(cost.cost_at([1.0, 1.5]), 4.0);
        assert_eq!(cost.cost_at([1.9, 1.9]), 9.0);
        // Outside the lattice clamps to the nearest edge node
        assert_eq!(cost.cost_at([-10.0, 10.0]), 7.0);
    }

    #[test]
    fn grid_cost_validation() {
        let grid = Grid::new([2, 2], 1.0, [0.0, 0.0]).unwrap();
        assert!(matches!(
            GridCost::new(&grid, vec![1.0; 3]),
            Err(EikonalError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            GridCost::new(&grid, vec![1.0, 1.0, 0.0, 1.0]),
            Err(EikonalError::InvalidCost { point, .. }) if point == [0.0, 1.0]
        ));
    }

    #[test]
    fn grid_cost_mutation_bumps_epoch() {
        let grid = Grid::new([5, 5], 1.0, [0.0, 0.0]).unwrap();
        let mut cost = GridCost::uniform(&grid, 1.0).unwrap();
        cost.set([1, 1], 4.0).unwrap();
        assert_eq!(cost.epoch(), 1);
        assert_eq!(cost.get([1, 1]), Some(4.0));

        let changed = cost.fill_rect([1.0, 1.0], [2.0, 3.0], 5.0).unwrap();
        assert_eq!(changed, 6);
        assert_eq!(cost.epoch(), 2);

        let none = cost.fill_rect([10.0, 10.0], [11.0, 11.0], 5.0).unwrap();
        assert_eq!(none, 0);
        assert_eq!(cost.epoch(), 2);

        assert!(cost.set([0, 0], -1.0).is_err());
        assert_eq!(cost.epoch(), 2);
    }

    #[test]
    fn grid_cost_rejects_nodes_off_the_lattice() {
        let grid = Grid::new([4, 4], 1.0, [0.0, 0.0]).unwrap();
        let mut cost = GridCost::uniform(&grid, 1.0).unwrap();

        // [4, 0] would alias [0, 1] in row-major order
        let result = cost.set([4, 0], 9.0);
        assert!(matches!(
            result,
            Err(EikonalError::NodeOutOfBounds { node: [4, 0], num_points: [4, 4] })
        ));
        assert!(cost.set([0, 4], 9.0).is_err());
        assert_eq!(cost.get([0, 1]), Some(1.0));
        assert_eq!(cost.epoch(), 0);

        assert_eq!(cost.get([4, 0]), None);
        assert_eq!(cost.get([0, 4]), None);
        assert_eq!(cost.get([3, 3]), Some(1.0));
    }

    #[test]
    fn fn_cost_invalidate() {
        let mut cost = FnCost::new(|p: [f64; 2]| 1.0 + p[0]);
        assert_eq!(cost.cost_at([2.0, 0.0]), 3.0);
        cost.invalidate();
        assert_eq!(cost.epoch(), 1);
    }
}
