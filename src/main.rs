// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use eikonal_fmm::io;
use eikonal_fmm::{FastMarching, Node, ProgressInfo, Speed, TargetReachedMode};

#[derive(Parser)]
#[command(name = "eikonal-fmm", about = "Fast Marching Method eikonal solver")]
struct Cli {
    /// Dimensionality (2 or 3)
    #[arg(short = 'd', long)]
    dim: usize,

    /// Grid size, comma-separated (e.g., 256,256 or 128,128,128)
    #[arg(short = 's', long)]
    size: String,

    /// Grid spacing: a single value or one per axis, comma-separated
    #[arg(long, default_value = "1.0")]
    spacing: String,

    /// Speed field: "uniform:<val>", "gradient:<v0>,<g>" (linear in the last
    /// axis), or "file:<path>" (.npy, or .mat with a "speed" variable)
    #[arg(long, default_value = "uniform:1.0")]
    speed: String,

    /// Divide every speed value by this factor
    #[arg(long, default_value = "1.0")]
    normalization: f64,

    /// Alive seed "i,j[,k]:value" (repeatable)
    #[arg(long, num_args = 1)]
    alive: Vec<String>,

    /// Trial seed "i,j[,k]:value" (repeatable)
    #[arg(long, num_args = 1)]
    trial: Vec<String>,

    /// Node excluded from propagation "i,j[,k]" (repeatable)
    #[arg(long, num_args = 1)]
    outside: Vec<String>,

    /// Target node "i,j[,k]" (repeatable)
    #[arg(long, num_args = 1)]
    target: Vec<String>,

    /// When targets stop the front: "none", "one", "all", or "some:<n>"
    #[arg(long, default_value = "none")]
    target_mode: String,

    /// Arrival-time margin marched past the target value
    #[arg(long, default_value = "0.0")]
    target_offset: f64,

    /// Stop once the next arrival time exceeds this value
    #[arg(long)]
    stopping_value: Option<f64>,

    /// Write the upwind gradient to this .npy file
    #[arg(long)]
    gradient_output: Option<PathBuf>,

    /// Output file path (.npy)
    #[arg(short = 'o', long, default_value = "output.npy")]
    output: PathBuf,

    /// Log marching progress (see --progress-interval)
    #[arg(long)]
    progress: bool,

    /// Progress reporting interval in milliseconds (used with --progress)
    #[arg(long, default_value = "500")]
    progress_interval: u64,
}

fn parse_list<T: std::str::FromStr>(s: &str, what: &str) -> Result<Vec<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    s.split(',')
        .map(|p| p.trim().parse::<T>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid {}: '{}'", what, s))
}

fn parse_size(s: &str, dim: usize) -> Result<Vec<usize>> {
    let parts: Vec<usize> = parse_list(s, "--size")?;
    if parts.len() != dim {
        bail!("--size has {} components but --dim is {}", parts.len(), dim);
    }
    Ok(parts)
}

fn parse_spacing<const N: usize>(s: &str) -> Result<[f64; N]> {
    let parts: Vec<f64> = parse_list(s, "--spacing")?;
    match parts.as_slice() {
        [h] => Ok([*h; N]),
        _ => <[f64; N]>::try_from(parts.as_slice()).map_err(|_| {
            anyhow::anyhow!(
                "--spacing has {} components but --dim is {}",
                parts.len(),
                N
            )
        }),
    }
}

fn parse_index<const N: usize>(s: &str, flag: &str) -> Result<[usize; N]> {
    let parts: Vec<usize> = parse_list(s, flag)?;
    <[usize; N]>::try_from(parts.as_slice()).map_err(|_| {
        anyhow::anyhow!(
            "{} '{}' has {} components but --dim is {}",
            flag,
            s,
            parts.len(),
            N
        )
    })
}

fn parse_node<const N: usize>(s: &str, flag: &str) -> Result<Node<N>> {
    let Some((index, value)) = s.split_once(':') else {
        bail!("{} expects 'i,j[,k]:value', got '{}'", flag, s);
    };
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid {} value in '{}'", flag, s))?;
    Ok(Node::new(parse_index(index, flag)?, value))
}

fn parse_target_mode(s: &str) -> Result<TargetReachedMode> {
    match s {
        "none" => Ok(TargetReachedMode::NoTargets),
        "one" => Ok(TargetReachedMode::OneTarget),
        "all" => Ok(TargetReachedMode::AllTargets),
        _ => match s.strip_prefix("some:") {
            Some(n) => Ok(TargetReachedMode::SomeTargets(
                n.parse::<usize>()
                    .context("invalid count in --target-mode some:<n>")?,
            )),
            None => bail!(
                "unknown --target-mode '{}'. Expected 'none', 'one', 'all', or 'some:<n>'",
                s
            ),
        },
    }
}

/// Alive seeds are fixed values that are never queued, so only a Trial
/// seed starts a front.
fn check_seeds(alive: &[String], trial: &[String]) -> Result<()> {
    if trial.is_empty() {
        if alive.is_empty() {
            bail!("at least one --trial seed must be specified");
        }
        bail!(
            "--alive seeds alone do not start a front; add at least one --trial seed \
             (e.g. --trial {})",
            alive[0]
        );
    }
    Ok(())
}

fn build_speed(mode: &str, shape: &[usize], spacing: &[f64]) -> Result<Speed> {
    if let Some(val_str) = mode.strip_prefix("uniform:") {
        let val: f64 = val_str.parse().context("invalid uniform speed value")?;
        return Ok(Speed::Constant(val));
    }

    if let Some(params) = mode.strip_prefix("gradient:") {
        let Some((v0, g)) = params.split_once(',') else {
            bail!("gradient mode expects 'gradient:<v0>,<g>', got '{}'", mode);
        };
        let v0: f64 = v0.parse().context("invalid v0 in gradient")?;
        let g: f64 = g.parse().context("invalid g in gradient")?;

        // Row-major: the last axis varies fastest.
        let depth_axis = shape.len() - 1;
        let (depth_len, h) = (shape[depth_axis], spacing[depth_axis]);
        let num: usize = shape.iter().product();
        let field = (0..num)
            .map(|flat| v0 + g * (flat % depth_len) as f64 * h)
            .collect();
        return Ok(Speed::Field(field));
    }

    if let Some(path_str) = mode.strip_prefix("file:") {
        let field = io::load_speed_field(Path::new(path_str), shape)
            .with_context(|| format!("failed to load speed field from '{}'", path_str))?;
        return Ok(Speed::Field(field));
    }

    bail!(
        "unknown --speed mode: '{}'. Expected 'uniform:<val>', 'gradient:<v0>,<g>', \
         or 'file:<path>'",
        mode
    );
}

fn run<const N: usize>(cli: &Cli, size: &[usize]) -> Result<()> {
    let shape = <[usize; N]>::try_from(size).context("grid size does not match --dim")?;
    let spacing = parse_spacing::<N>(&cli.spacing)?;

    let alive = cli
        .alive
        .iter()
        .map(|s| parse_node::<N>(s, "--alive"))
        .collect::<Result<Vec<_>>>()?;
    let trial = cli
        .trial
        .iter()
        .map(|s| parse_node::<N>(s, "--trial"))
        .collect::<Result<Vec<_>>>()?;
    let outside = cli
        .outside
        .iter()
        .map(|s| parse_index::<N>(s, "--outside"))
        .collect::<Result<Vec<_>>>()?;
    let targets = cli
        .target
        .iter()
        .map(|s| parse_index::<N>(s, "--target"))
        .collect::<Result<Vec<_>>>()?;

    let mut solver = FastMarching::<N>::new()
        .with_output_size(shape)
        .with_spacing(spacing)
        .with_normalization_factor(cli.normalization)
        .with_alive_points(alive)
        .with_trial_points(trial)
        .with_outside_points(outside)
        .with_target_points(targets)
        .with_target_mode(parse_target_mode(&cli.target_mode)?)
        .with_target_offset(cli.target_offset)
        .with_gradient(cli.gradient_output.is_some());

    solver = match build_speed(&cli.speed, &shape, &spacing)? {
        Speed::Constant(v) => solver.with_speed_constant(v),
        Speed::Field(field) => solver.with_speed_field(field),
    };
    if let Some(stop) = cli.stopping_value {
        solver = solver.with_stopping_value(stop);
    }
    if cli.progress {
        solver = solver
            .with_progress_interval(Duration::from_millis(cli.progress_interval))
            .with_progress(Box::new(|info: ProgressInfo| {
                info!(
                    elapsed_s = info.elapsed.as_secs_f64(),
                    alive = info.nodes_alive,
                    narrow_band = info.narrow_band_size,
                    value = info.current_value,
                    "marching"
                );
            }));
    }

    let output = solver.run().context("fast marching failed")?;

    output
        .save(&cli.output)
        .with_context(|| format!("failed to write '{}'", cli.output.display()))?;
    if let Some(path) = &cli.gradient_output {
        output
            .save_gradient(path)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
    }

    info!(
        frozen = output.nodes_frozen(),
        reason = ?output.stop_reason(),
        target_value = ?output.target_value(),
        reached_targets = output.reached_targets().len(),
        output = %cli.output.display(),
        "done"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.dim != 2 && cli.dim != 3 {
        bail!("--dim must be 2 or 3, got {}", cli.dim);
    }
    check_seeds(&cli.alive, &cli.trial)?;

    let size = parse_size(&cli.size, cli.dim)?;
    match cli.dim {
        2 => run::<2>(&cli, &size),
        _ => run::<3>(&cli, &size),
    }
}
