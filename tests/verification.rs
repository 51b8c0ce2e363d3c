// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use eikonal_fmm::core::{CellTag, Grid};
use eikonal_fmm::cost::{FnCost, GridCost, UniformCost};
use eikonal_fmm::geometry::{Circle, Rectangle};
use eikonal_fmm::narrow_band::QueueStrategy;
use eikonal_fmm::solver::{initialize_all, EikonalSolver};

/// Heterogeneous cost lattice with a smooth bump and a slow stripe.
fn varied_cost(grid: &Grid) -> GridCost {
    let values = (0..grid.num_nodes())
        .map(|i| {
            let [x, y] = grid.point_to_coord(grid.node(i));
            let bump = 1.0 + 0.5 * (0.4 * x).sin() * (0.3 * y).cos();
            if (10.0..12.0).contains(&x) && y > 4.0 {
                bump * 3.0
            } else {
                bump
            }
        })
        .collect();
    GridCost::new(grid, values).unwrap()
}

/// Build a scenario with two targets, a circular target region and an
/// obstacle, then solve it with the given strategy.
fn solve_scenario(strategy: QueueStrategy, high_accuracy: bool) -> EikonalSolver<GridCost> {
    let grid = Grid::new([41, 31], 0.5, [0.0, 0.0]).unwrap();
    let cost = varied_cost(&grid);
    let mut solver = EikonalSolver::new(grid, cost, strategy).with_high_accuracy(high_accuracy);
    solver.add_obstacle_shape(&Rectangle::new([6.0, 3.0], [7.0, 12.0]));
    solver.add_target_point([1.0, 1.0]).unwrap();
    solver.add_target_point([18.5, 14.0]).unwrap();
    solver.add_target_shape(Circle::new([15.0, 3.0], 1.2));
    solver.initialize().unwrap();
    solver
}

/// Test 1: Distance recovery - uniform cost, point target.
/// With unit cost the potential approximates Euclidean distance; refining the
/// grid over a fixed domain must shrink the error.
#[test]
fn distance_recovery_improves_with_resolution() {
    let query = [7.0, 6.0];
    let exact = ((7.0_f64 - 4.0).powi(2) + (6.0_f64 - 4.0).powi(2)).sqrt();

    let run = |resolution: f64, high_accuracy: bool| -> f64 {
        let grid = Grid::from_extent(8.0, 8.0, resolution, [0.0, 0.0]).unwrap();
        let mut solver = EikonalSolver::new(grid, UniformCost::new(1.0), QueueStrategy::Fmm)
            .with_high_accuracy(high_accuracy);
        solver.add_target_point([4.0, 4.0]).unwrap();
        solver.initialize().unwrap();
        (solver.get_value(query[0], query[1]) - exact).abs()
    };

    let err_coarse = run(0.5, false);
    let err_fine = run(0.125, false);
    assert!(
        err_fine < err_coarse,
        "error did not shrink: coarse={} fine={}",
        err_coarse,
        err_fine
    );
    assert!(err_fine < 0.25, "fine error too large: {}", err_fine);

    let err_fine_ha = run(0.125, true);
    assert!(err_fine_ha < 0.25, "high accuracy error too large: {}", err_fine_ha);
}

/// Test 2: Axis-aligned propagation is exact.
/// Along a grid line from a point target every node lies exactly
/// `k * h * cost` away.
#[test]
fn axis_distances_are_exact() {
    let grid = Grid::new([21, 21], 0.25, [-2.5, -2.5]).unwrap();
    let mut solver = EikonalSolver::new(grid, UniformCost::new(2.0), QueueStrategy::Sfmm);
    solver.add_target_node([10, 10]).unwrap();
    solver.initialize().unwrap();

    for k in 0..=10 {
        let expected = k as f64 * 0.25 * 2.0;
        assert!((solver.grid().potential([10 + k, 10]) - expected).abs() < 1e-12);
        assert!((solver.grid().potential([10, 10 - k]) - expected).abs() < 1e-12);
    }
}

/// Test 3: FMM and SFMM produce the same field.
/// Both queues freeze nodes in the same `(potential, index)` order, so the
/// results agree on heterogeneous costs, obstacles and multiple targets.
#[test]
fn fmm_and_sfmm_agree() {
    for high_accuracy in [false, true] {
        let fmm = solve_scenario(QueueStrategy::Fmm, high_accuracy);
        let sfmm = solve_scenario(QueueStrategy::Sfmm, high_accuracy);

        let a = fmm.potential_field();
        let b = sfmm.potential_field();
        for (u, v) in a.iter().zip(b.iter()) {
            if u.is_infinite() {
                assert!(v.is_infinite());
            } else {
                assert!((u - v).abs() < 1e-9, "FMM {} vs SFMM {}", u, v);
            }
        }

        let fmm_stats = fmm.last_stats().unwrap();
        let sfmm_stats = sfmm.last_stats().unwrap();
        assert_eq!(fmm_stats.frozen, sfmm_stats.frozen);
        assert_eq!(fmm_stats.stale_pops, 0);
        assert!(sfmm_stats.pops >= fmm_stats.pops);
    }
}

/// Test 4: Determinism.
/// Two runs on the same input produce bit-identical fields.
#[test]
fn repeated_runs_are_bit_identical() {
    for strategy in [QueueStrategy::Fmm, QueueStrategy::Sfmm] {
        let first = solve_scenario(strategy, true).potential_field();
        let second = solve_scenario(strategy, true).potential_field();
        for (u, v) in first.iter().zip(second.iter()) {
            assert_eq!(u.to_bits(), v.to_bits());
        }
    }
}

/// Test 5: Targets and causality.
/// Targets hold zero, and every reached node has a strictly lower neighbor
/// no further away than one step through its own cost.
#[test]
fn targets_and_causality() {
    let solver = solve_scenario(QueueStrategy::Fmm, false);
    let grid = solver.grid();
    let h = grid.resolution();

    let targets = grid.target_nodes();
    assert!(targets.len() >= 3);
    for node in &targets {
        assert_eq!(grid.tag(*node), CellTag::Target);
        assert_eq!(grid.potential(*node), 0.0);
    }

    let [nx, ny] = grid.num_points();
    for y in 0..ny {
        for x in 0..nx {
            let node = [x, y];
            if grid.tag(node) != CellTag::Reached {
                continue;
            }
            let u = grid.potential(node);
            let lowest = grid
                .neighbors(node)
                .map(|n| grid.potential(n))
                .fold(f64::INFINITY, f64::min);
            let step = h * solver.cost().get(node).unwrap();
            assert!(lowest < u, "node {:?} has no upwind neighbor", node);
            assert!(
                u <= lowest + step + 1e-9,
                "node {:?}: {} exceeds {} + {}",
                node,
                u,
                lowest,
                step
            );
        }
    }
}

/// Test 6: Obstacles and unreachable regions.
/// A closed ring of obstacles leaves its interior at `+inf`; interpolation
/// next to the ring applies the unknown penalty.
#[test]
fn enclosed_region_is_unreachable() {
    let grid = Grid::new([12, 12], 1.0, [0.0, 0.0]).unwrap();
    let mut solver = EikonalSolver::new(grid, UniformCost::new(1.0), QueueStrategy::Fmm);
    solver.add_target_node([1, 1]).unwrap();
    for wall in [
        Rectangle::new([5.0, 5.0], [9.0, 5.0]),
        Rectangle::new([5.0, 9.0], [9.0, 9.0]),
        Rectangle::new([5.0, 5.0], [5.0, 9.0]),
        Rectangle::new([9.0, 5.0], [9.0, 9.0]),
    ] {
        solver.add_obstacle_shape(&wall);
    }
    solver.initialize().unwrap();
    let grid = solver.grid();

    assert_eq!(grid.count_tag(CellTag::Obstacle), 16);
    for y in 6..9 {
        for x in 6..9 {
            assert_eq!(grid.tag([x, y]), CellTag::Undefined);
            assert!(grid.potential([x, y]).is_infinite());
        }
    }
    assert!(solver.get_value(7.0, 7.0).is_infinite());
    assert!(solver.get_value(7.5, 6.5).is_infinite());

    // Half the cell weight sits on an obstacle corner
    let outside = grid.potential([4, 5]);
    assert!(outside.is_finite());
    let expected = outside + 0.5 * solver.unknown_penalty();
    assert!((solver.get_value(4.5, 5.0) - expected).abs() < 1e-12);

    // Everything outside the ring is reached
    assert_eq!(grid.count_tag(CellTag::Reached), 12 * 12 - 16 - 9 - 1);
}

/// Test 7: Dynamic cost update.
/// Raising the cost across a band of columns leaves nodes upstream of it
/// untouched and delays everything downstream.
#[test]
fn dynamic_update_recomputes_downstream() {
    let grid = Grid::new([21, 11], 1.0, [0.0, 0.0]).unwrap();
    let cost = GridCost::uniform(&grid, 1.0).unwrap();
    let mut solver = EikonalSolver::new(grid, cost, QueueStrategy::Sfmm);
    solver.add_target_node([0, 5]).unwrap();
    solver.initialize().unwrap();
    let before = solver.potential_field();
    assert!(!solver.update().unwrap());

    let changed = solver
        .cost_mut()
        .fill_rect([8.0, 0.0], [10.0, 10.0], 5.0)
        .unwrap();
    assert_eq!(changed, 33);
    assert!(solver.needs_update());
    assert!(solver.update().unwrap());
    assert!(!solver.update().unwrap());
    let after = solver.potential_field();

    // Arrays are indexed [y, x]
    for x in 0..=7 {
        assert_eq!(after[[5, x]], before[[5, x]]);
    }
    assert_eq!(solver.get_value(5.0, 5.0), before[[5, 5]]);
    assert!((after[[5, 7]] - 7.0).abs() < 1e-12);
    assert!(after[[5, 15]] > before[[5, 15]] + 8.0);
    for y in 0..11 {
        assert!(after[[y, 20]] > before[[y, 20]]);
    }
}

/// Test 8: Batch initialization.
/// Solving independent instances on a thread pool gives the same fields as
/// solving them one by one.
#[test]
fn batch_initialization_matches_sequential() {
    let make = |i: usize| {
        let grid = Grid::new([30, 20], 0.5, [0.0, 0.0]).unwrap();
        let strategy = if i % 2 == 0 {
            QueueStrategy::Fmm
        } else {
            QueueStrategy::Sfmm
        };
        let cost: Box<dyn eikonal_fmm::cost::CostFunction + Send> =
            Box::new(FnCost::new(move |p: [f64; 2]| 1.0 + 0.1 * i as f64 * p[1]));
        let mut solver = EikonalSolver::new(grid, cost, strategy);
        solver.add_target_node([i * 3, i * 2]).unwrap();
        solver
    };

    let mut batch: Vec<_> = (0..6).map(make).collect();
    initialize_all(&mut batch, Some(3)).unwrap();

    for (i, solver) in batch.iter().enumerate() {
        let mut single = make(i);
        single.initialize().unwrap();
        assert_eq!(solver.potential_field(), single.potential_field());
        assert!(!solver.needs_update());
    }
}

/// Test 9: Batch errors propagate.
/// A solver without targets fails the whole batch.
#[test]
fn batch_initialization_reports_errors() {
    let grid = Grid::new([5, 5], 1.0, [0.0, 0.0]).unwrap();
    let mut ok = EikonalSolver::new(grid.clone(), UniformCost::new(1.0), QueueStrategy::Fmm);
    ok.add_target_node([0, 0]).unwrap();
    let empty = EikonalSolver::new(grid, UniformCost::new(1.0), QueueStrategy::Fmm);

    let mut batch = vec![ok, empty];
    assert!(initialize_all(&mut batch, None).is_err());
}
