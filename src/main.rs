// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eikonal_fmm::core::Grid;
use eikonal_fmm::cost::{CostFunction, GridCost};
use eikonal_fmm::geometry::{Circle, Rectangle};
use eikonal_fmm::io;
use eikonal_fmm::narrow_band::QueueStrategy;
use eikonal_fmm::solver::{EikonalSolver, DEFAULT_UNKNOWN_PENALTY};

#[derive(Parser)]
#[command(name = "eikonal-fmm", about = "Fast Marching eikonal solver")]
struct Cli {
    /// Grid size in nodes, comma-separated (e.g., 256,128)
    #[arg(short = 's', long)]
    size: String,

    /// Distance between adjacent nodes
    #[arg(long, default_value = "1.0")]
    resolution: f64,

    /// World position of node (0, 0), comma-separated
    #[arg(long, default_value = "0,0")]
    origin: String,

    /// Target position "x,y" (repeatable)
    #[arg(long, num_args = 1)]
    target: Vec<String>,

    /// Circular target region "x,y,r" (repeatable)
    #[arg(long, num_args = 1)]
    target_circle: Vec<String>,

    /// Rectangular obstacle "x0,y0,x1,y1" (repeatable)
    #[arg(long, num_args = 1)]
    obstacle: Vec<String>,

    /// Cost field: "uniform:<val>", "cost-file:<path>", or "speed-file:<path>"
    #[arg(long, default_value = "uniform:1.0")]
    cost: String,

    /// Narrow band strategy: fmm or sfmm
    #[arg(long, default_value = "fmm")]
    strategy: QueueStrategy,

    /// Use the second-order upwind correction
    #[arg(long)]
    high_accuracy: bool,

    /// Penalty for unknown corners when interpolating
    #[arg(long, default_value_t = DEFAULT_UNKNOWN_PENALTY)]
    unknown_penalty: f64,

    /// Output file path (.npy or .mat)
    #[arg(short = 'o', long, default_value = "potential.npy")]
    output: PathBuf,

    /// Print the interpolated potential at a position "x,y" (repeatable)
    #[arg(long, num_args = 1)]
    query: Vec<String>,
}

fn parse_floats<const N: usize>(s: &str, flag: &str) -> Result<[f64; N]> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: expected comma-separated floats", flag))?;
    let len = parts.len();
    parts
        .try_into()
        .map_err(|_| anyhow::anyhow!("{} has {} components, expected {}", flag, len, N))
}

fn parse_size(s: &str) -> Result<[usize; 2]> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("invalid --size: expected comma-separated integers")?;
    match parts.as_slice() {
        &[nx, ny] => Ok([nx, ny]),
        _ => bail!("--size has {} components, expected 2", parts.len()),
    }
}

fn build_cost(mode: &str, grid: &Grid) -> Result<GridCost> {
    if let Some(val_str) = mode.strip_prefix("uniform:") {
        let val: f64 = val_str.parse().context("invalid uniform cost value")?;
        return GridCost::uniform(grid, val).context("invalid uniform cost");
    }

    if let Some(path_str) = mode.strip_prefix("cost-file:") {
        return io::load_cost(Path::new(path_str), grid)
            .with_context(|| format!("failed to load cost from {}", path_str));
    }

    if let Some(path_str) = mode.strip_prefix("speed-file:") {
        return io::load_speed_as_cost(Path::new(path_str), grid)
            .with_context(|| format!("failed to load speed from {}", path_str));
    }

    bail!(
        "unknown --cost mode: '{}'. Expected 'uniform:<val>', 'cost-file:<path>', \
         or 'speed-file:<path>'",
        mode
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.target.is_empty() && cli.target_circle.is_empty() {
        bail!("at least one --target or --target-circle must be specified");
    }

    let size = parse_size(&cli.size)?;
    let origin = parse_floats::<2>(&cli.origin, "--origin")?;
    let grid = Grid::new(size, cli.resolution, origin)?;
    let cost = build_cost(&cli.cost, &grid)?;

    let mut solver = EikonalSolver::new(grid, cost, cli.strategy)
        .with_high_accuracy(cli.high_accuracy)
        .with_unknown_penalty(cli.unknown_penalty)?;

    for arg in &cli.obstacle {
        let [x0, y0, x1, y1] = parse_floats::<4>(arg, "--obstacle")?;
        let marked = solver.add_obstacle_shape(&Rectangle::new([x0, y0], [x1, y1]));
        info!("Obstacle ({}, {})-({}, {}) covers {} nodes", x0, y0, x1, y1, marked);
    }
    for arg in &cli.target {
        let point = parse_floats::<2>(arg, "--target")?;
        solver
            .add_target_point(point)
            .with_context(|| format!("bad --target {}", arg))?;
    }
    for arg in &cli.target_circle {
        let [x, y, r] = parse_floats::<3>(arg, "--target-circle")?;
        solver.add_target_shape(Circle::new([x, y], r));
    }

    let stats = solver.initialize()?;
    info!(
        "Solved: frozen={} pushes={} stale={} elapsed={:.3}s (cost epoch {})",
        stats.frozen,
        stats.pushes,
        stats.stale_pops,
        stats.elapsed.as_secs_f64(),
        solver.cost().epoch()
    );

    for arg in &cli.query {
        let [x, y] = parse_floats::<2>(arg, "--query")?;
        println!("{} {} {}", x, y, solver.get_value(x, y));
    }

    io::save_field(solver.grid(), &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    info!("Wrote potential field to {}", cli.output.display());

    Ok(())
}
