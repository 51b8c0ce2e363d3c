// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::{Duration, Instant};

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::core::{CellState, CellTag, Grid, LATTICE_NEIGHBORS};
use crate::cost::{checked_cost, CostFunction};
use crate::error::{EikonalError, Result};
use crate::geometry::{Shape, TargetGeometry};
use crate::narrow_band::{NarrowBand, QueueStrategy};
use crate::update_kernels::{interpolate_potential, relax_node};

/// Default penalty added per unit of unknown interpolation weight.
pub const DEFAULT_UNKNOWN_PENALTY: f64 = 0.1;

/// Information passed to the progress callback each time a node freezes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezeEvent {
    /// The node that was frozen.
    pub node: [usize; 2],
    /// Its final potential for this cycle.
    pub potential: f64,
    /// Number of nodes frozen so far in this cycle, this one included.
    pub frozen: usize,
    /// Entries left in the narrow band.
    pub band_len: usize,
}

/// Counters describing one marching cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarchStats {
    /// Nodes frozen (targets excluded).
    pub frozen: usize,
    /// Entries pushed into the narrow band.
    pub pushes: usize,
    /// Entries popped from the narrow band.
    pub pops: usize,
    /// Popped entries discarded without freezing.
    pub stale_pops: usize,
    /// Wall time of the cycle.
    pub elapsed: Duration,
}

/// Callback receiving a [`FreezeEvent`] for every frozen node.
pub type ProgressCallback = Box<dyn Fn(FreezeEvent) + Send + Sync>;

/// Fast marching solver for the eikonal equation on a regular 2D grid.
///
/// The queue discipline is selected once through [`QueueStrategy`]; the
/// seeding, Godunov relaxation and interpolation are shared by both.
///
/// Each call to [`initialize`](Self::initialize) or a dirty
/// [`update`](Self::update) recomputes the whole field on a scratch copy of
/// the grid and swaps it in only when marching succeeded, so queries never
/// observe a half-computed field.
pub struct EikonalSolver<C> {
    grid: Grid,
    cost: C,
    strategy: QueueStrategy,
    high_accuracy: bool,
    unknown_penalty: f64,
    targets: TargetGeometry,
    progress_callback: Option<ProgressCallback>,
    solved_epoch: Option<u64>,
    geometry_dirty: bool,
    last_stats: Option<MarchStats>,
}

impl<C: CostFunction> EikonalSolver<C> {
    /// Create a solver owning `grid` and `cost`.
    ///
    /// Targets and obstacles already marked on the grid are kept.
    pub fn new(grid: Grid, cost: C, strategy: QueueStrategy) -> Self {
        EikonalSolver {
            grid,
            cost,
            strategy,
            high_accuracy: false,
            unknown_penalty: DEFAULT_UNKNOWN_PENALTY,
            targets: TargetGeometry::default(),
            progress_callback: None,
            solved_epoch: None,
            geometry_dirty: false,
            last_stats: None,
        }
    }

    /// Enable or disable the second-order upwind correction (builder method).
    pub fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    /// Set the penalty used for unknown corners in [`get_value`](Self::get_value)
    /// (builder method).
    ///
    /// # Errors
    /// Returns an error if the penalty is negative or not finite.
    pub fn with_unknown_penalty(mut self, penalty: f64) -> Result<Self> {
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(EikonalError::InvalidUnknownPenalty(penalty));
        }
        self.unknown_penalty = penalty;
        Ok(self)
    }

    /// Set a callback invoked every time a node freezes (builder method).
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Mark a grid node as a target.
    ///
    /// # Errors
    /// Returns an error if the node lies outside the grid.
    pub fn add_target_node(&mut self, node: [usize; 2]) -> Result<()> {
        self.grid.mark_target(node)?;
        self.geometry_dirty = true;
        Ok(())
    }

    /// Mark the grid node nearest to a world position as a target.
    ///
    /// # Errors
    /// Returns an error if the position lies outside the grid domain.
    pub fn add_target_point(&mut self, point: [f64; 2]) -> Result<()> {
        let node = self
            .grid
            .nearest_node(point)
            .ok_or(EikonalError::InvalidTargetPoint { point })?;
        self.add_target_node(node)
    }

    /// Add a target region.
    ///
    /// Every node inside the shape becomes a target, and the shape's distance
    /// query refines the initial potentials of the nodes around it. Returns
    /// the number of nodes marked.
    pub fn add_target_shape<S: Shape + 'static>(&mut self, shape: S) -> usize {
        let marked = self.mark_where(|point| shape.contains(point), CellState::TARGET);
        if marked == 0 {
            warn!("target shape covers no grid node; it only refines seeding distances");
        }
        self.targets.add_shape(Box::new(shape));
        self.geometry_dirty = true;
        marked
    }

    /// Define targets through a signed-distance function.
    ///
    /// Nodes where `sdf <= 0` become targets; positive values seed the
    /// initial potentials around them. Returns the number of nodes marked.
    pub fn set_target_distance<F>(&mut self, sdf: F) -> usize
    where
        F: Fn([f64; 2]) -> f64 + Send + Sync + 'static,
    {
        let marked = self.mark_where(|point| sdf(point) <= 0.0, CellState::TARGET);
        self.targets.set_signed_distance(Box::new(sdf));
        self.geometry_dirty = true;
        marked
    }

    /// Mark every node inside `shape` as impassable. Targets are kept.
    ///
    /// Returns the number of nodes marked. Like every target edit, this only
    /// tags nodes; the field is recomputed by the next
    /// [`update`](Self::update).
    pub fn add_obstacle_shape(&mut self, shape: &dyn Shape) -> usize {
        let marked = self.mark_where(|point| shape.contains(point), CellState::OBSTACLE);
        if marked > 0 {
            self.geometry_dirty = true;
        }
        marked
    }

    fn mark_where<P: Fn([f64; 2]) -> bool>(&mut self, predicate: P, state: CellState) -> usize {
        let [nx, ny] = self.grid.num_points();
        let mut marked = 0;
        for y in 0..ny {
            for x in 0..nx {
                let node = [x, y];
                if self.grid.tag(node) == CellTag::Target {
                    continue;
                }
                if predicate(self.grid.point_to_coord(node)) {
                    self.grid.set_state(node, state);
                    marked += 1;
                }
            }
        }
        marked
    }

    /// The grid holding the most recently committed field.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The cost function.
    pub fn cost(&self) -> &C {
        &self.cost
    }

    /// Mutable access to the cost function, e.g. to edit a [`GridCost`].
    ///
    /// [`GridCost`]: crate::cost::GridCost
    pub fn cost_mut(&mut self) -> &mut C {
        &mut self.cost
    }

    /// The queue discipline in use.
    pub fn strategy(&self) -> QueueStrategy {
        self.strategy
    }

    /// Whether the second-order correction is enabled.
    pub fn is_high_accuracy(&self) -> bool {
        self.high_accuracy
    }

    /// Penalty applied to unknown interpolation corners.
    pub fn unknown_penalty(&self) -> f64 {
        self.unknown_penalty
    }

    /// Counters of the most recent successful cycle.
    pub fn last_stats(&self) -> Option<MarchStats> {
        self.last_stats
    }

    /// Compute the field from scratch.
    ///
    /// # Errors
    /// Returns [`EikonalError::NoTargets`] if no target is marked and
    /// [`EikonalError::InvalidCost`] if the cost function returns a
    /// non-positive value. On error the previous field is left untouched.
    pub fn initialize(&mut self) -> Result<MarchStats> {
        info!(
            "Initializing {:?} field on {}x{} grid, resolution={}, high_accuracy={}",
            self.strategy,
            self.grid.num_points()[0],
            self.grid.num_points()[1],
            self.grid.resolution(),
            self.high_accuracy
        );
        self.compute()
    }

    /// Whether the cost, targets or obstacles changed since the field was
    /// computed.
    ///
    /// True before the first successful computation.
    pub fn needs_update(&self) -> bool {
        self.geometry_dirty || self.solved_epoch != Some(self.cost.epoch())
    }

    /// Recompute the whole field if [`needs_update`](Self::needs_update).
    ///
    /// Returns whether a recomputation happened.
    ///
    /// # Errors
    /// Same as [`initialize`](Self::initialize).
    pub fn update(&mut self) -> Result<bool> {
        if !self.needs_update() {
            return Ok(false);
        }
        info!(
            "Recomputing {:?} field: cost epoch {:?} -> {}, geometry changed={}",
            self.strategy,
            self.solved_epoch,
            self.cost.epoch(),
            self.geometry_dirty
        );
        self.compute()?;
        Ok(true)
    }

    /// Potential at a world position, `+inf` if no path exists.
    pub fn get_value(&self, x: f64, y: f64) -> f64 {
        interpolate_potential(&self.grid, [x, y], self.unknown_penalty)
    }

    /// Snapshot of the node potentials, shape `[ny, nx]`.
    pub fn potential_field(&self) -> Array2<f64> {
        self.grid.to_array()
    }

    fn compute(&mut self) -> Result<MarchStats> {
        let start = Instant::now();
        let epoch = self.cost.epoch();

        let mut scratch = self.grid.clone();
        scratch.reset();

        let targets = scratch.target_nodes();
        if targets.is_empty() {
            return Err(EikonalError::NoTargets);
        }

        let mut band = NarrowBand::new(self.strategy, scratch.num_nodes());
        let mut stats = MarchStats::default();
        self.seed(&mut scratch, &mut band, &targets, &mut stats)?;
        if band.is_empty() {
            warn!("no passable node borders a target; only targets will be reached");
        }
        self.march(&mut scratch, &mut band, &mut stats)?;
        stats.elapsed = start.elapsed();

        debug!(
            "{:?} march done: targets={} frozen={} pushes={} pops={} stale={} elapsed={:.3}ms",
            self.strategy,
            targets.len(),
            stats.frozen,
            stats.pushes,
            stats.pops,
            stats.stale_pops,
            stats.elapsed.as_secs_f64() * 1e3
        );

        self.grid = scratch;
        self.solved_epoch = Some(epoch);
        self.geometry_dirty = false;
        self.last_stats = Some(stats);
        Ok(stats)
    }

    /// Give the lattice neighbors of every target their initial distance.
    fn seed(
        &self,
        grid: &mut Grid,
        band: &mut NarrowBand,
        targets: &[[usize; 2]],
        stats: &mut MarchStats,
    ) -> Result<()> {
        let h = grid.resolution();
        for &target in targets {
            for &(dx, dy) in &LATTICE_NEIGHBORS {
                let Some(node) = grid.offset(target, dx, dy) else {
                    continue;
                };
                if grid.tag(node) != CellTag::Undefined {
                    continue;
                }
                let point = grid.point_to_coord(node);
                let cost = checked_cost(&self.cost, point)?;
                if cost.is_infinite() {
                    continue;
                }
                let potential = self.targets.seed_distance(point, h) * cost;
                grid.set_state(
                    node,
                    CellState {
                        potential,
                        tag: CellTag::Reachable,
                    },
                );
                band.push(grid.index(node), potential);
                stats.pushes += 1;
            }
        }
        Ok(())
    }

    /// Freeze nodes in increasing potential until the band is empty.
    fn march(&self, grid: &mut Grid, band: &mut NarrowBand, stats: &mut MarchStats) -> Result<()> {
        while let Some((index, carried)) = band.pop() {
            stats.pops += 1;
            let node = grid.node(index);
            let state = grid.state(node);

            // Frozen nodes and outdated duplicates (lazy strategy only)
            if state.tag.is_frozen() || carried > state.potential {
                stats.stale_pops += 1;
                continue;
            }

            grid.set_state(
                node,
                CellState {
                    potential: state.potential,
                    tag: CellTag::Reached,
                },
            );
            stats.frozen += 1;

            if let Some(cb) = &self.progress_callback {
                cb(FreezeEvent {
                    node,
                    potential: state.potential,
                    frozen: stats.frozen,
                    band_len: band.len(),
                });
            }

            for &(dx, dy) in &LATTICE_NEIGHBORS {
                let Some(neighbor) = grid.offset(node, dx, dy) else {
                    continue;
                };
                let current = grid.state(neighbor);
                if !matches!(current.tag, CellTag::Undefined | CellTag::Reachable) {
                    continue;
                }

                let cost = checked_cost(&self.cost, grid.point_to_coord(neighbor))?;
                let Some(candidate) = relax_node(grid, neighbor, cost, self.high_accuracy) else {
                    continue;
                };
                if !candidate.is_finite() {
                    continue;
                }

                let neighbor_index = grid.index(neighbor);
                match current.tag {
                    CellTag::Undefined => {
                        grid.set_state(
                            neighbor,
                            CellState {
                                potential: candidate,
                                tag: CellTag::Reachable,
                            },
                        );
                        band.push(neighbor_index, candidate);
                        stats.pushes += 1;
                    }
                    CellTag::Reachable if candidate < current.potential => {
                        grid.set_state(
                            neighbor,
                            CellState {
                                potential: candidate,
                                tag: CellTag::Reachable,
                            },
                        );
                        band.improve(neighbor_index, candidate);
                        stats.pushes += 1;
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Initialize independent solvers concurrently.
///
/// Each solver owns its grid, so instances share no state; every individual
/// march stays sequential. `threads` defaults to the number of available
/// cores.
///
/// # Errors
/// Returns the first error reported by any solver, or an error if the thread
/// pool cannot be built.
pub fn initialize_all<C>(solvers: &mut [EikonalSolver<C>], threads: Option<usize>) -> Result<()>
where
    C: CostFunction + Send,
{
    let pool = build_pool(threads)?;
    pool.install(|| {
        solvers
            .par_iter_mut()
            .try_for_each(|solver| solver.initialize().map(|_| ()))
    })
}

/// Run [`EikonalSolver::update`] on independent solvers concurrently.
///
/// Returns how many solvers recomputed their field.
///
/// # Errors
/// Returns the first error reported by any solver, or an error if the thread
/// pool cannot be built.
pub fn update_all<C>(solvers: &mut [EikonalSolver<C>], threads: Option<usize>) -> Result<usize>
where
    C: CostFunction + Send,
{
    let pool = build_pool(threads)?;
    pool.install(|| {
        solvers
            .par_iter_mut()
            .map(|solver| solver.update().map(usize::from))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    })
}

fn build_pool(threads: Option<usize>) -> Result<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| EikonalError::Other(e.to_string()))
}
