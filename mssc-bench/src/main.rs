//! Benchmarking CLI comparing the MSSC bound constraints.
//!
//! Usage: `mssc-bench [--json <path>] [--time-limit <seconds>] [--bound <variant>...]`

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mssc_core::Instance;
use mssc_cp::{solve_mssc, BoundVariant, MsscSolution, SolverSettings};
use serde::Serialize;

/// Generate `k` Gaussian blobs of `per_cluster` points in `dim` dimensions.
///
/// Blob centers sit on a coarse grid so that the clusters are separable.
fn generate_blobs(k: usize, per_cluster: usize, dim: usize, spread: f64, seed: u64) -> Vec<Vec<f64>> {
    // Simple LCG random number generator
    let mut rng_state = seed;
    let mut uniform = || -> f64 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (((rng_state >> 33) as f64) + 1.0) / (u32::MAX as f64 + 2.0)
    };
    // Box-Muller
    let mut gaussian = || -> f64 {
        let u1 = uniform();
        let u2 = uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    };

    let mut points = Vec::with_capacity(k * per_cluster);
    for c in 0..k {
        let center: Vec<f64> = (0..dim).map(|d| 10.0 * ((c >> d) & 1) as f64 + 10.0 * (c / 4) as f64).collect();
        for _ in 0..per_cluster {
            points.push(center.iter().map(|&x| x + spread * gaussian()).collect());
        }
    }
    points
}

/// Bound constraint selectable from the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum BoundChoice {
    None,
    Wcss,
    WcssCard,
    Standard,
    Network,
}

impl From<BoundChoice> for BoundVariant {
    fn from(choice: BoundChoice) -> Self {
        match choice {
            BoundChoice::None => BoundVariant::None,
            BoundChoice::Wcss => BoundVariant::Wcss,
            BoundChoice::WcssCard => BoundVariant::WcssWithCardinality,
            BoundChoice::Standard => BoundVariant::StandardCardControl,
            BoundChoice::Network => BoundVariant::NetworkCardControl,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mssc-bench", about = "Compare the MSSC bound constraints on Gaussian blobs")]
struct Args {
    /// Write the result rows as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Time limit per solve, in seconds
    #[arg(long, default_value_t = 60.0)]
    time_limit: f64,

    /// Bounds to run (all of them by default); repeat or separate with commas
    #[arg(long = "bound", value_enum, value_delimiter = ',')]
    bounds: Vec<BoundChoice>,
}

impl Args {
    fn variants(&self) -> Vec<BoundVariant> {
        let all = [
            BoundChoice::None,
            BoundChoice::Wcss,
            BoundChoice::WcssCard,
            BoundChoice::Standard,
            BoundChoice::Network,
        ];
        let chosen = if self.bounds.is_empty() { &all[..] } else { &self.bounds[..] };
        chosen.iter().map(|&c| c.into()).collect()
    }
}

/// One benchmark row.
#[derive(Debug, Clone, Serialize)]
struct BenchmarkResult {
    instance: String,
    variant: String,
    status: String,
    wcss: Option<f64>,
    bound: Option<f64>,
    nodes: u64,
    fails: u64,
    solutions: u64,
    time_ms: u64,
}

impl BenchmarkResult {
    fn new(instance: &str, variant: BoundVariant, sol: &MsscSolution) -> Self {
        let finite = |x: f64| x.is_finite().then_some(x);
        Self {
            instance: instance.to_string(),
            variant: format!("{:?}", variant),
            status: format!("{:?}", sol.status),
            wcss: finite(sol.wcss),
            bound: finite(sol.bound),
            nodes: sol.nodes_explored,
            fails: sol.fails,
            solutions: sol.solutions_found,
            time_ms: sol.solve_time_ms,
        }
    }
}

fn run_benchmark(
    name: &str,
    instance: &Instance,
    settings: &SolverSettings,
    variants: &[BoundVariant],
    results: &mut Vec<BenchmarkResult>,
) -> Result<()> {
    println!("\n{}", name);
    println!("{}", "-".repeat(name.len()));
    println!(
        "{:<22} {:<10} {:>14} {:>10} {:>10} {:>10}",
        "variant", "status", "wcss", "nodes", "fails", "time(ms)"
    );

    let balanced = instance.target_cardinalities().is_some();
    for &variant in variants {
        if variant.uses_cardinalities() != balanced {
            continue;
        }
        let sol = solve_mssc(instance, settings.clone().with_bound(variant))
            .with_context(|| format!("Failed to solve {} with {:?}", name, variant))?;
        println!(
            "{:<22} {:<10} {:>14.6} {:>10} {:>10} {:>10}",
            format!("{:?}", variant),
            format!("{:?}", sol.status),
            sol.wcss,
            sol.nodes_explored,
            sol.fails,
            sol.solve_time_ms
        );
        results.push(BenchmarkResult::new(name, variant, &sol));
    }
    Ok(())
}

fn save_json(path: &Path, results: &[BenchmarkResult]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), results)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let variants = args.variants();

    println!("MSSC Bound Benchmarks");
    println!("=====================");

    let settings = SolverSettings::default().with_time_limit(args.time_limit);
    let mut results = Vec::new();

    let cases = [(2, 6, 2, 1.0, 7), (3, 5, 2, 1.5, 11), (3, 6, 3, 2.0, 13), (4, 5, 2, 2.5, 17)];
    for (k, per_cluster, dim, spread, seed) in cases {
        let points = generate_blobs(k, per_cluster, dim, spread, seed);
        let n = points.len();

        let plain = Instance::from_coordinates(points, k)
            .with_context(|| format!("Invalid blob instance k={} n={}", k, n))?;
        let name = format!("Blobs (n={}, k={}, d={})", n, k, dim);
        run_benchmark(&name, &plain, &settings, &variants, &mut results)?;

        let balanced = plain
            .with_target_cardinalities(vec![per_cluster; k])
            .context("Invalid target cardinalities")?;
        let name = format!("Balanced blobs (n={}, k={}, d={})", n, k, dim);
        run_benchmark(&name, &balanced, &settings, &variants, &mut results)?;
    }

    if let Some(path) = &args.json {
        save_json(path, &results)?;
        println!("\nResults written to {}", path.display());
    }

    println!("\n{}", "=".repeat(60));
    println!("Benchmarks complete");
    println!("{}", "=".repeat(60));
    Ok(())
}
