// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::Array2;

use crate::error::{EikonalError, Result};

/// Lattice offsets of the 4-connected neighborhood, as `(dx, dy)`.
pub const LATTICE_NEIGHBORS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Progress tag of a single grid node.
///
/// Tags only ever move forward, `Undefined -> Reachable -> Reached`, within a
/// computation cycle. `Target` and `Obstacle` are terminal and set before
/// marching starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellTag {
    /// Not yet touched by the wavefront.
    Undefined,
    /// In the narrow band with a tentative potential.
    Reachable,
    /// Frozen; the potential is final for this cycle.
    Reached,
    /// Seeded destination with potential zero.
    Target,
    /// Impassable node, never relaxed.
    Obstacle,
}

impl CellTag {
    /// Whether the node's potential is final and may feed an upwind update.
    #[inline]
    pub fn is_frozen(self) -> bool {
        matches!(self, CellTag::Reached | CellTag::Target)
    }
}

/// Potential and tag stored for each grid node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellState {
    /// Travel time to the nearest target, `+inf` while unknown.
    pub potential: f64,
    /// Progress tag.
    pub tag: CellTag,
}

impl CellState {
    /// Initial state of every non-seeded node.
    pub const UNDEFINED: CellState = CellState {
        potential: f64::INFINITY,
        tag: CellTag::Undefined,
    };

    /// State of a seeded target node.
    pub const TARGET: CellState = CellState {
        potential: 0.0,
        tag: CellTag::Target,
    };

    /// State of an impassable node.
    pub const OBSTACLE: CellState = CellState {
        potential: f64::INFINITY,
        tag: CellTag::Obstacle,
    };
}

impl Default for CellState {
    fn default() -> Self {
        CellState::UNDEFINED
    }
}

/// A regular 2D grid of nodes covering a rectangular world-space domain.
///
/// Node `[x, y]` sits at world position `origin + [x, y] * resolution` and is
/// stored at flat index `y * nx + x`. The grid is plain data: it is owned and
/// mutated by exactly one solver.
#[derive(Debug, Clone)]
pub struct Grid {
    num_points: [usize; 2],
    resolution: f64,
    origin: [f64; 2],
    cells: Vec<CellState>,
}

impl Grid {
    /// Create a grid with the given number of nodes per axis.
    ///
    /// # Parameters
    /// - `num_points`: Number of nodes along x and y (each must be >= 2)
    /// - `resolution`: World distance between adjacent nodes (positive, finite)
    /// - `origin`: World position of node `[0, 0]`
    ///
    /// # Errors
    /// Returns an error if the shape, resolution or origin is invalid.
    pub fn new(num_points: [usize; 2], resolution: f64, origin: [f64; 2]) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(EikonalError::InvalidResolution(resolution));
        }
        for (axis, &size) in num_points.iter().enumerate() {
            if size < 2 {
                return Err(EikonalError::InvalidGridShape { axis, size });
            }
        }
        for &value in &origin {
            if !value.is_finite() {
                return Err(EikonalError::InvalidExtent {
                    name: "origin",
                    value,
                });
            }
        }

        Ok(Grid {
            num_points,
            resolution,
            origin,
            cells: vec![CellState::UNDEFINED; num_points[0] * num_points[1]],
        })
    }

    /// Create a grid covering `width x height` world units.
    ///
    /// The node count per axis is `floor(extent / resolution) + 1`, so a
    /// domain of width 4 at resolution 1 has 5 nodes along x.
    ///
    /// # Errors
    /// Returns an error if an extent is not finite, the resolution is invalid,
    /// or the domain is smaller than one cell.
    pub fn from_extent(width: f64, height: f64, resolution: f64, origin: [f64; 2]) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(EikonalError::InvalidResolution(resolution));
        }
        let mut num_points = [0usize; 2];
        for (axis, (name, extent)) in [("width", width), ("height", height)]
            .into_iter()
            .enumerate()
        {
            if !extent.is_finite() || extent < 0.0 {
                return Err(EikonalError::InvalidExtent {
                    name,
                    value: extent,
                });
            }
            num_points[axis] = (extent / resolution).floor() as usize + 1;
        }
        Self::new(num_points, resolution, origin)
    }

    /// Number of nodes along x and y.
    pub fn num_points(&self) -> [usize; 2] {
        self.num_points
    }

    /// Total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.cells.len()
    }

    /// World distance between adjacent nodes.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World position of node `[0, 0]`.
    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    /// World-space extent covered by the nodes, `[width, height]`.
    pub fn extent(&self) -> [f64; 2] {
        [
            (self.num_points[0] - 1) as f64 * self.resolution,
            (self.num_points[1] - 1) as f64 * self.resolution,
        ]
    }

    /// Flat storage index of a node.
    #[inline]
    pub fn index(&self, node: [usize; 2]) -> usize {
        node[1] * self.num_points[0] + node[0]
    }

    /// Node of a flat storage index.
    #[inline]
    pub fn node(&self, index: usize) -> [usize; 2] {
        [index % self.num_points[0], index / self.num_points[0]]
    }

    /// Whether a (possibly negative) lattice coordinate lies on the grid.
    #[inline]
    pub fn is_valid(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.num_points[0] && (y as usize) < self.num_points[1]
    }

    /// The node displaced by `(dx, dy)`, or `None` if that leaves the grid.
    #[inline]
    pub fn offset(&self, node: [usize; 2], dx: isize, dy: isize) -> Option<[usize; 2]> {
        let x = node[0] as isize + dx;
        let y = node[1] as isize + dy;
        if self.is_valid(x, y) {
            Some([x as usize, y as usize])
        } else {
            None
        }
    }

    /// In-domain 4-connected neighbors of a node.
    pub fn neighbors(&self, node: [usize; 2]) -> impl Iterator<Item = [usize; 2]> + '_ {
        LATTICE_NEIGHBORS
            .iter()
            .filter_map(move |&(dx, dy)| self.offset(node, dx, dy))
    }

    /// Whether a node borders the domain edge or an obstacle.
    pub fn is_near_boundary(&self, node: [usize; 2]) -> bool {
        LATTICE_NEIGHBORS
            .iter()
            .any(|&(dx, dy)| match self.offset(node, dx, dy) {
                Some(n) => self.tag(n) == CellTag::Obstacle,
                None => true,
            })
    }

    /// World position of a node.
    #[inline]
    pub fn point_to_coord(&self, node: [usize; 2]) -> [f64; 2] {
        [
            self.origin[0] + node[0] as f64 * self.resolution,
            self.origin[1] + node[1] as f64 * self.resolution,
        ]
    }

    /// Whether a world position lies inside the domain covered by the nodes.
    pub fn contains_point(&self, point: [f64; 2]) -> bool {
        let extent = self.extent();
        (0..2).all(|d| {
            let local = point[d] - self.origin[d];
            local >= 0.0 && local <= extent[d]
        })
    }

    /// The node closest to a world position, or `None` outside the domain.
    pub fn nearest_node(&self, point: [f64; 2]) -> Option<[usize; 2]> {
        if !self.contains_point(point) {
            return None;
        }
        let mut node = [0usize; 2];
        for d in 0..2 {
            let i = ((point[d] - self.origin[d]) / self.resolution).round() as usize;
            node[d] = i.min(self.num_points[d] - 1);
        }
        Some(node)
    }

    /// Lower-left node of the cell enclosing a world position.
    ///
    /// The position is clamped into the domain and the node is clamped so
    /// that its `+x`/`+y` neighbors exist, making it a valid interpolation
    /// anchor everywhere.
    pub fn node_towards_origin(&self, point: [f64; 2]) -> [usize; 2] {
        let mut node = [0usize; 2];
        for d in 0..2 {
            let local = ((point[d] - self.origin[d]) / self.resolution).max(0.0);
            node[d] = (local.floor() as usize).min(self.num_points[d] - 2);
        }
        node
    }

    /// State of a node.
    #[inline]
    pub fn state(&self, node: [usize; 2]) -> CellState {
        self.cells[self.index(node)]
    }

    /// Potential of a node.
    #[inline]
    pub fn potential(&self, node: [usize; 2]) -> f64 {
        self.cells[self.index(node)].potential
    }

    /// Tag of a node.
    #[inline]
    pub fn tag(&self, node: [usize; 2]) -> CellTag {
        self.cells[self.index(node)].tag
    }

    /// Overwrite the state of a node.
    #[inline]
    pub fn set_state(&mut self, node: [usize; 2], state: CellState) {
        let i = self.index(node);
        self.cells[i] = state;
    }

    /// Read-only view of all node states in row-major order.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Mark a node as a target with potential zero.
    ///
    /// # Errors
    /// Returns an error if the node lies outside the grid.
    pub fn mark_target(&mut self, node: [usize; 2]) -> Result<()> {
        self.check_node(node)?;
        self.set_state(node, CellState::TARGET);
        Ok(())
    }

    /// Mark a node as impassable. Target nodes are left untouched.
    ///
    /// # Errors
    /// Returns an error if the node lies outside the grid.
    pub fn mark_obstacle(&mut self, node: [usize; 2]) -> Result<()> {
        self.check_node(node)?;
        if self.tag(node) != CellTag::Target {
            self.set_state(node, CellState::OBSTACLE);
        }
        Ok(())
    }

    /// Return every node to its pre-march state.
    ///
    /// Reachable and reached nodes become undefined, targets are re-zeroed,
    /// obstacles stay as they are.
    pub fn reset(&mut self) {
        for cell in self.cells.iter_mut() {
            match cell.tag {
                CellTag::Target => *cell = CellState::TARGET,
                CellTag::Obstacle => *cell = CellState::OBSTACLE,
                CellTag::Undefined | CellTag::Reachable | CellTag::Reached => {
                    *cell = CellState::UNDEFINED
                }
            }
        }
    }

    /// All target nodes in storage order.
    pub fn target_nodes(&self) -> Vec<[usize; 2]> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.tag == CellTag::Target)
            .map(|(i, _)| self.node(i))
            .collect()
    }

    /// Number of nodes carrying a given tag.
    pub fn count_tag(&self, tag: CellTag) -> usize {
        self.cells.iter().filter(|c| c.tag == tag).count()
    }

    /// Snapshot of the potentials as an array of shape `[ny, nx]`.
    pub fn to_array(&self) -> Array2<f64> {
        let [nx, ny] = self.num_points;
        Array2::from_shape_fn((ny, nx), |(y, x)| self.potential([x, y]))
    }

    fn check_node(&self, node: [usize; 2]) -> Result<()> {
        if node[0] < self.num_points[0] && node[1] < self.num_points[1] {
            Ok(())
        } else {
            Err(EikonalError::TargetOutOfBounds { node })
        }
    }
}
