// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

/// A closed region of the world plane used as a target or obstacle.
pub trait Shape: Send + Sync {
    /// Euclidean distance from a point to the region, zero inside it.
    fn distance(&self, point: [f64; 2]) -> f64;

    /// Whether a point lies inside the region (boundary included).
    fn contains(&self, point: [f64; 2]) -> bool {
        self.distance(point) <= 0.0
    }
}

/// A disc given by center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Center of the disc.
    pub center: [f64; 2],
    /// Radius, zero for a point.
    pub radius: f64,
}

impl Circle {
    /// Create a disc.
    pub fn new(center: [f64; 2], radius: f64) -> Self {
        Circle { center, radius }
    }
}

impl Shape for Circle {
    fn distance(&self, point: [f64; 2]) -> f64 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        ((dx * dx + dy * dy).sqrt() - self.radius).max(0.0)
    }
}

/// An axis-aligned box spanning `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    /// Lower-left corner.
    pub min: [f64; 2],
    /// Upper-right corner.
    pub max: [f64; 2],
}

impl Rectangle {
    /// Create a box from two opposite corners in any order.
    pub fn new(a: [f64; 2], b: [f64; 2]) -> Self {
        Rectangle {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }
}

impl Shape for Rectangle {
    fn distance(&self, point: [f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(point[0] - self.max[0]).max(0.0);
        let dy = (self.min[1] - point[1]).max(point[1] - self.max[1]).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}

/// Signed distance callback: negative inside a target, positive outside.
pub type SignedDistance = Box<dyn Fn([f64; 2]) -> f64 + Send + Sync>;

/// Geometry used to seed initial distances around target nodes.
///
/// Explicit target nodes are always one lattice step away from their
/// neighbors; shapes and a signed-distance function can only tighten that.
#[derive(Default)]
pub struct TargetGeometry {
    shapes: Vec<Box<dyn Shape>>,
    signed_distance: Option<SignedDistance>,
}

impl TargetGeometry {
    /// Register a target shape.
    pub fn add_shape(&mut self, shape: Box<dyn Shape>) {
        self.shapes.push(shape);
    }

    /// Install (or replace) the signed-distance function.
    pub fn set_signed_distance(&mut self, sdf: SignedDistance) {
        self.signed_distance = Some(sdf);
    }

    /// Distance from a node next to a target to the nearest target.
    pub fn seed_distance(&self, point: [f64; 2], lattice_step: f64) -> f64 {
        let mut best = lattice_step;
        for shape in &self.shapes {
            best = best.min(shape.distance(point));
        }
        if let Some(sdf) = &self.signed_distance {
            best = best.min(sdf(point).max(0.0));
        }
        best
    }
}
