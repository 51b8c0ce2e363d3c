// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::Grid;

/// Weight of a second-order upwind term in the Godunov quadratic.
const SECOND_ORDER_WEIGHT: f64 = 9.0 / 4.0;

/// Interpolation weights below this count as "no known corner".
const MIN_KNOWN_WEIGHT: f64 = 1e-5;

/// Which neighbors an upwind update may draw from.
///
/// `Any` picks the lower frozen neighbor on each axis. The four diagonal
/// variants restrict each axis to a single side, so exactly one candidate per
/// axis is considered. `Up` is `+y`, `Right` is `+x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Both sides of both axes.
    Any,
    /// `-x` and `+y`.
    UpLeft,
    /// `+x` and `+y`.
    UpRight,
    /// `-x` and `-y`.
    DownLeft,
    /// `+x` and `-y`.
    DownRight,
}

impl Direction {
    /// The four single-octant restrictions.
    pub const OCTANTS: [Direction; 4] = [
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ];

    /// Whether a lattice step `(dx, dy)` (one of them zero) is permitted.
    pub fn allows(self, dx: isize, dy: isize) -> bool {
        let (sx, sy) = match self {
            Direction::Any => return true,
            Direction::UpLeft => (-1, 1),
            Direction::UpRight => (1, 1),
            Direction::DownLeft => (-1, -1),
            Direction::DownRight => (1, -1),
        };
        if dy == 0 {
            dx == sx
        } else {
            dy == sy
        }
    }
}

/// Larger real root of `a t^2 + b t + c = 0`, or `None` if there is none.
///
/// The larger root is the causal one: the smaller would lie below the
/// neighbor values the equation was built from.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return None;
        }
        return Some(-c / b);
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    Some((-b + disc.sqrt()) / (2.0 * a))
}

/// Second-order upwind value along the ray `node -> node + 2 * (dx, dy)`.
///
/// Returns `(4 * u1 - u2) / 3` when the two-step neighbor is frozen and
/// strictly lower than the one-step neighbor, `None` otherwise. Pure
/// function of the grid snapshot.
pub fn second_order_term(grid: &Grid, node: [usize; 2], dx: isize, dy: isize) -> Option<f64> {
    let one = grid.offset(node, dx, dy)?;
    let two = grid.offset(node, 2 * dx, 2 * dy)?;
    let s1 = grid.state(one);
    let s2 = grid.state(two);
    if s1.tag.is_frozen() && s2.tag.is_frozen() && s2.potential < s1.potential {
        Some((4.0 * s1.potential - s2.potential) / 3.0)
    } else {
        None
    }
}

/// Lowest frozen neighbor on one axis, restricted by `direction`.
///
/// Returns the step taken and the neighbor's potential.
fn upwind_neighbor(
    grid: &Grid,
    node: [usize; 2],
    axis: usize,
    direction: Direction,
) -> Option<((isize, isize), f64)> {
    let steps = if axis == 0 {
        [(-1, 0), (1, 0)]
    } else {
        [(0, -1), (0, 1)]
    };
    let mut best: Option<((isize, isize), f64)> = None;
    for (dx, dy) in steps {
        if !direction.allows(dx, dy) {
            continue;
        }
        let Some(n) = grid.offset(node, dx, dy) else {
            continue;
        };
        let state = grid.state(n);
        if !state.tag.is_frozen() {
            continue;
        }
        match best {
            Some((_, v)) if v <= state.potential => {}
            _ => best = Some(((dx, dy), state.potential)),
        }
    }
    best
}

/// Godunov upwind update of a single node from its frozen neighbors.
///
/// Solves `sum_k w_k (T - t_k)^2 = 1 / speed^2` with
/// `speed = 1 / (resolution * cost)`, accumulating one term per axis that
/// has a frozen neighbor. With `high_accuracy` a second-order term replaces
/// the first-order one wherever [`second_order_term`] applies.
///
/// Falls back to the single-neighbor estimate `min_neighbor + 1 / speed` if
/// only one axis is known, the discriminant is negative, or the root is not
/// above every neighbor it was built from. Returns `None` if no neighbor is
/// frozen; the node cannot be relaxed yet.
///
/// `cost` must already be validated as positive. An infinite cost yields
/// `+inf`.
pub fn godunov_update(
    grid: &Grid,
    node: [usize; 2],
    cost: f64,
    direction: Direction,
    high_accuracy: bool,
) -> Option<f64> {
    let step = grid.resolution() * cost;

    let mut a = 0.0;
    let mut b = 0.0;
    let mut c = -(step * step);
    let mut known = 0usize;
    let mut min_val = f64::INFINITY;
    let mut max_val = f64::NEG_INFINITY;

    for axis in 0..2 {
        let Some(((dx, dy), val)) = upwind_neighbor(grid, node, axis, direction) else {
            continue;
        };
        known += 1;
        min_val = min_val.min(val);
        max_val = max_val.max(val);

        let corrected = if high_accuracy {
            second_order_term(grid, node, dx, dy)
        } else {
            None
        };
        let (w, t) = match corrected {
            Some(tp) => (SECOND_ORDER_WEIGHT, tp),
            None => (1.0, val),
        };
        a += w;
        b -= 2.0 * w * t;
        c += w * t * t;
    }

    if known == 0 {
        return None;
    }
    let fallback = min_val + step;
    if known == 1 || !step.is_finite() {
        return Some(fallback);
    }

    match solve_quadratic(a, b, c) {
        Some(t) if t >= max_val => Some(t),
        _ => Some(fallback),
    }
}

/// Tentative potential of a node during marching.
///
/// Nodes bordering the domain edge or an obstacle are evaluated in each of
/// the four octants and the lowest candidate wins; interior nodes use the
/// unrestricted stencil.
pub fn relax_node(grid: &Grid, node: [usize; 2], cost: f64, high_accuracy: bool) -> Option<f64> {
    if !grid.is_near_boundary(node) {
        return godunov_update(grid, node, cost, Direction::Any, high_accuracy);
    }
    Direction::OCTANTS
        .iter()
        .filter_map(|&d| godunov_update(grid, node, cost, d, high_accuracy))
        .fold(None, |best: Option<f64>, t| match best {
            Some(v) if v <= t => Some(v),
            _ => Some(t),
        })
}

/// Bilinear interpolation that ignores unknown (`+inf`) corners.
///
/// `corners` are ordered `(x0,y0), (x1,y0), (x1,y1), (x0,y1)` and `u`, `v`
/// are the local coordinates in `[0, 1]`. Returns the weighted sum over known
/// corners and the total weight of those corners.
pub fn bilinear_with_unknown(corners: [f64; 4], u: f64, v: f64) -> (f64, f64) {
    let weights = [
        (1.0 - u) * (1.0 - v),
        u * (1.0 - v),
        u * v,
        (1.0 - u) * v,
    ];
    let mut value = 0.0;
    let mut known = 0.0;
    for (z, w) in corners.iter().zip(weights) {
        if z.is_finite() {
            value += w * z;
            known += w;
        }
    }
    (value, known)
}

/// Continuous potential at a world position.
///
/// Interpolates the four nodes enclosing `point`. Corners that are still
/// unknown are dropped and the result is renormalized by the known weight
/// `w`, then penalized: `raw / w + (1 - w) * unknown_penalty`. If no corner
/// carries weight the result is `+inf`.
pub fn interpolate_potential(grid: &Grid, point: [f64; 2], unknown_penalty: f64) -> f64 {
    let anchor = grid.node_towards_origin(point);
    let base = grid.point_to_coord(anchor);
    let h = grid.resolution();
    let u = ((point[0] - base[0]) / h).clamp(0.0, 1.0);
    let v = ((point[1] - base[1]) / h).clamp(0.0, 1.0);

    let [x, y] = anchor;
    let corners = [
        grid.potential([x, y]),
        grid.potential([x + 1, y]),
        grid.potential([x + 1, y + 1]),
        grid.potential([x, y + 1]),
    ];

    let (raw, weight) = bilinear_with_unknown(corners, u, v);
    if weight <= MIN_KNOWN_WEIGHT {
        return f64::INFINITY;
    }
    raw / weight + (1.0 - weight) * unknown_penalty
}
