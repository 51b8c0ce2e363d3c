// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Grid-based eikonal solvers using the Fast Marching Method (FMM) and the
//! Simplified Fast Marching Method (SFMM).
//!
//! This library computes arrival-time potentials on regular 2D grids by
//! solving the eikonal equation |∇u| = c, where u is the potential and c is a
//! positive traversal cost (inverse speed). Nodes are frozen in increasing
//! order of potential from a set of targets; the two methods differ only in
//! how the narrow band of tentative nodes is managed.

#![warn(missing_docs)]

/// Core grid data structures.
pub mod core;
/// Traversal cost functions.
pub mod cost;
/// Error types for the library.
pub mod error;
/// Target and obstacle shapes.
pub mod geometry;
/// File I/O for loading cost fields and saving potentials.
pub mod io;
/// Narrow band priority queues.
pub mod narrow_band;
/// Fast marching solver.
pub mod solver;
/// Godunov update and interpolation kernels.
pub mod update_kernels;

pub use crate::core::{CellState, CellTag, Grid};
pub use crate::cost::{CostFunction, FnCost, GridCost, UniformCost};
pub use crate::error::{EikonalError, Result};
pub use crate::geometry::{Circle, Rectangle, Shape};
pub use crate::narrow_band::QueueStrategy;
pub use crate::solver::{
    initialize_all, update_all, EikonalSolver, FreezeEvent, MarchStats, ProgressCallback,
    DEFAULT_UNKNOWN_PENALTY,
};
