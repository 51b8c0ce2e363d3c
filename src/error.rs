// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur during solver setup, field computation, or I/O.
#[derive(Debug)]
pub enum EikonalError {
    /// Grid shape is invalid (too few nodes along an axis).
    InvalidGridShape {
        /// The axis index (0 = x, 1 = y).
        axis: usize,
        /// The number of nodes provided.
        size: usize,
    },
    /// Grid resolution is not positive and finite.
    InvalidResolution(f64),
    /// A world-space extent or origin component is not finite.
    InvalidExtent {
        /// Human-readable name of the offending parameter.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// The solver was asked to compute a field without any target node.
    NoTargets,
    /// A target node index lies outside the grid.
    TargetOutOfBounds {
        /// The offending node index.
        node: [usize; 2],
    },
    /// A node index lies outside a lattice of the given size.
    NodeOutOfBounds {
        /// The offending node index.
        node: [usize; 2],
        /// Nodes per axis of the lattice.
        num_points: [usize; 2],
    },
    /// A target or obstacle point lies outside the grid domain.
    InvalidTargetPoint {
        /// The offending world coordinates.
        point: [f64; 2],
    },
    /// The cost function returned a non-positive or NaN value.
    InvalidCost {
        /// The world coordinates that were queried.
        point: [f64; 2],
        /// The value returned.
        value: f64,
    },
    /// The unknown-node penalty used by interpolation is negative or not finite.
    InvalidUnknownPenalty(f64),
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for EikonalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EikonalError::InvalidGridShape { axis, size } => {
                write!(
                    f,
                    "invalid grid shape: axis {} has {} nodes (must be >= 2)",
                    axis, size
                )
            }
            EikonalError::InvalidResolution(h) => {
                write!(
                    f,
                    "invalid grid resolution: {} (must be positive and finite)",
                    h
                )
            }
            EikonalError::InvalidExtent { name, value } => {
                write!(f, "invalid {}: {} (must be finite)", name, value)
            }
            EikonalError::NoTargets => {
                write!(f, "no target nodes: at least one target must be seeded")
            }
            EikonalError::TargetOutOfBounds { node } => {
                write!(f, "target node {:?} lies outside the grid", node)
            }
            EikonalError::NodeOutOfBounds { node, num_points } => {
                write!(
                    f,
                    "node {:?} lies outside a {}x{} lattice",
                    node, num_points[0], num_points[1]
                )
            }
            EikonalError::InvalidTargetPoint { point } => {
                write!(f, "point {:?} lies outside the grid domain", point)
            }
            EikonalError::InvalidCost { point, value } => {
                write!(
                    f,
                    "invalid cost at {:?}: {} (must be positive)",
                    point, value
                )
            }
            EikonalError::InvalidUnknownPenalty(p) => {
                write!(
                    f,
                    "invalid unknown penalty: {} (must be non-negative and finite)",
                    p
                )
            }
            EikonalError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            EikonalError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            EikonalError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            EikonalError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            EikonalError::IoError(e) => write!(f, "I/O error: {}", e),
            EikonalError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for EikonalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EikonalError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EikonalError {
    fn from(e: std::io::Error) -> Self {
        EikonalError::IoError(e)
    }
}

/// Convenience type alias for Results with EikonalError.
pub type Result<T> = std::result::Result<T, EikonalError>;
