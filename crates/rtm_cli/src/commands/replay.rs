//! Replay command: one synthetic shot through the checkpoint engine.
//!
//! The forward pass propagates a Ricker source through a synthetic model,
//! saving every pressure frame. The backward pass re-marches a receiver-side
//! wavefield in the grid's own pressure arrays and cross-correlates it with
//! the replayed forward frames (zero-lag imaging condition).

use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use rtm_checkpoint::{CollectorConfig, ForwardCollector, StorageMode};
use rtm_core::grid::GridBox;
use rtm_core::types::{CellDimensions, GridSize, WindowSize};
use tracing::{info, warn};

use super::synthetic::{courant_number, ricker, velocity_model, ParticleVelocity, Propagator};

/// Arguments of `rtm replay`.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Window points along x
    #[arg(long, default_value_t = 200)]
    pub nx: usize,

    /// Window points along y (1 for 2-D)
    #[arg(long, default_value_t = 1)]
    pub ny: usize,

    /// Window points along z
    #[arg(long, default_value_t = 200)]
    pub nz: usize,

    /// Number of time steps
    #[arg(long, default_value_t = 500)]
    pub nt: usize,

    /// Time step in seconds
    #[arg(long, default_value_t = 1e-3)]
    pub dt: f32,

    /// Grid spacing in metres
    #[arg(long, default_value_t = 10.0)]
    pub spacing: f32,

    /// Background velocity in m/s
    #[arg(long, default_value_t = 2000.0)]
    pub velocity: f32,

    /// Random velocity perturbation as a fraction of the background
    #[arg(long, default_value_t = 0.05)]
    pub perturbation: f32,

    /// Seed of the velocity perturbation
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Ricker peak frequency in Hz
    #[arg(long, default_value_t = 15.0)]
    pub frequency: f32,

    /// Keep every forward frame in memory and report replay error
    #[arg(long)]
    pub verify: bool,
}

/// Summary of one replay run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    /// Resident slots
    pub capacity: usize,
    /// `true` when no chunk I/O happened
    pub mem_fit: bool,
    /// Chunks written during the forward pass
    pub chunks_written: usize,
    /// Chunks read during the backward pass
    pub chunks_read: usize,
    /// Bytes written to the workspace
    pub bytes_written: u64,
    /// Largest absolute replay error, when verified
    pub max_error: Option<f32>,
    /// Sum of squares of the image
    pub image_energy: f64,
}

/// Runs `rtm replay`.
pub fn run(config: &CollectorConfig, args: &ReplayArgs) -> Result<()> {
    println!("========================================");
    println!("RTM Forward/Backward Replay");
    println!("========================================");
    println!(
        "Window {}x{}x{}, nt = {}, dt = {} s",
        args.nx, args.ny, args.nz, args.nt, args.dt
    );
    match config.storage_mode()? {
        StorageMode::Raw => println!("Storage: raw chunks"),
        StorageMode::Compressed(p) => println!(
            "Storage: compressed, tolerance {} ({}), {} codec threads",
            p.tolerance(),
            if p.is_relative() { "relative" } else { "absolute" },
            p.parallelism()
        ),
    }
    println!();

    let started = Instant::now();
    let report = replay(config, args)?;
    let elapsed = started.elapsed();

    println!("[Replay] Results:");
    println!("----------------------------------------");
    println!("{:<22} {}", "Resident frames", report.capacity);
    println!(
        "{:<22} {}",
        "Mode",
        if report.mem_fit { "full-fit" } else { "spill" }
    );
    println!("{:<22} {}", "Chunks written", report.chunks_written);
    println!("{:<22} {}", "Chunks read", report.chunks_read);
    println!("{:<22} {}", "Bytes written", report.bytes_written);
    if let Some(err) = report.max_error {
        println!("{:<22} {:e}", "Max replay error", err);
    }
    println!("{:<22} {:e}", "Image energy", report.image_energy);
    println!("{:<22} {:.3} s", "Elapsed", elapsed.as_secs_f64());
    println!("----------------------------------------");
    Ok(())
}

/// Drives a forward and a backward pass and returns the run summary.
pub fn replay(config: &CollectorConfig, args: &ReplayArgs) -> Result<ReplayReport> {
    let window = WindowSize::new(args.nx, args.ny, args.nz);
    let cells = CellDimensions::uniform(args.spacing);
    let model = velocity_model(window, args.velocity, args.perturbation, args.seed);

    let cfl = courant_number(&model, cells, args.dt, window.is_3d());
    if cfl >= 1.0 {
        bail!("unstable setup: Courant number {:.3} must stay below 1", cfl);
    }
    if cfl > 0.7 {
        warn!(cfl, "Courant number close to the stability limit");
    }

    let mut grid = GridBox::new(GridSize::from(window), window, cells, args.nt, args.dt)
        .context("invalid grid")?
        .with_velocity(model.clone())
        .context("invalid velocity model")?;
    let propagator = Propagator::new(window, cells, args.dt, model);

    let source = window.index(window.nx / 2, window.ny / 2, window.nz / 4);
    let receiver = window.index(window.nx / 2, window.ny / 2, 3 * window.nz / 4);
    let nt = args.nt;

    let mut collector = ForwardCollector::new(config).context("cannot create collector")?;
    let mut reference: Vec<Vec<f32>> = Vec::new();

    // Forward pass
    collector.reset_grid(&mut grid, true)?;
    grid.zero_particle_velocities();
    if args.verify {
        reference.push(collector.pressure_mut()?.current.to_vec());
    }
    for t in 0..=nt {
        collector.save_forward()?;
        if t == nt {
            break;
        }
        let pair = collector.pressure_mut()?;
        propagator.step(
            pair.current,
            pair.next,
            ParticleVelocity {
                x: &mut grid.particle_velocity_x,
                y: &mut grid.particle_velocity_y,
                z: &mut grid.particle_velocity_z,
            },
        );
        pair.next[source] += ricker(args.frequency, (t + 1) as f32 * args.dt);
        if args.verify {
            reference.push(pair.next.to_vec());
        }
    }
    let forward_stats = collector.stats();
    info!(
        capacity = ?forward_stats.capacity,
        chunks = forward_stats.store.chunks_written,
        "forward pass done"
    );

    // Backward pass: receiver wavefield in the grid's own arrays
    collector.reset_grid(&mut grid, false)?;
    let mut image = vec![0.0f64; window.sample_count()];
    let mut max_error: Option<f32> = args.verify.then_some(0.0);

    for t in (0..=nt).rev() {
        collector.fetch_forward()?;
        let view = collector.forward_grid()?;
        if view.frame() != t {
            bail!("replay returned frame {} where {} was due", view.frame(), t);
        }

        for ((px, f), r) in image
            .iter_mut()
            .zip(view.pressure())
            .zip(&grid.pressure_current)
        {
            *px += (*f as f64) * (*r as f64);
        }
        if let (Some(err), Some(saved)) = (max_error.as_mut(), reference.get(t)) {
            for (a, b) in saved.iter().zip(view.pressure()) {
                *err = err.max((a - b).abs());
            }
        }

        if t > 0 {
            let GridBox {
                pressure_current,
                pressure_next,
                particle_velocity_x,
                particle_velocity_y,
                particle_velocity_z,
                ..
            } = &mut grid;
            propagator.step(
                pressure_current,
                pressure_next,
                ParticleVelocity {
                    x: particle_velocity_x,
                    y: particle_velocity_y,
                    z: particle_velocity_z,
                },
            );
            pressure_next[receiver] += ricker(args.frequency, t as f32 * args.dt);
            std::mem::swap(pressure_current, pressure_next);
        }
    }

    let stats = collector.stats();
    let report = ReplayReport {
        capacity: stats.capacity.unwrap_or(0),
        mem_fit: collector.mem_fit().unwrap_or(false),
        chunks_written: stats.store.chunks_written,
        chunks_read: stats.store.chunks_read,
        bytes_written: stats.store.bytes_written,
        max_error,
        image_energy: image.iter().map(|v| v * v).sum(),
    };
    info!(?report, "replay complete");
    Ok(report)
}
