//! Headless driver: runs the solver without a window, logging timings and fluid properties.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    time::Instant,
};

use glam::Vec2;
use log::{error, info, warn};
use sph_fluid::{Config, Interaction, RenderBuffers, SimError, Simulation};

const SAVE_FILE: &str = "config.sph";

const BENCH_RATIO: usize = 100;

/// Portion of the run, by step, during which the pointer pulls on the fluid.
const PULL_START: f32 = 0.4;
const PULL_END: f32 = 0.6;

/// Load the saved config, or write out the default one if there isn't one yet.
fn load_config(path: &Path) -> Config {
    match Config::load(path) {
        Ok(cfg) => {
            info!("Loaded config from {path:?}");
            cfg
        }
        Err(SimError::Io(_)) => {
            let cfg = Config::default();
            if let Err(e) = cfg.save(path) {
                warn!("Unable to save default config to {path:?}: {e}");
            }
            cfg
        }
        Err(e) => {
            warn!("Ignoring config at {path:?}: {e}");
            Config::default()
        }
    }
}

/// A scripted pointer: sweeps from left to right across the domain, mid-run.
fn interaction(cfg: &Config, t: usize) -> Interaction {
    let progress = t as f32 / cfg.num_steps.max(1) as f32;
    if !(PULL_START..PULL_END).contains(&progress) {
        return Interaction::default();
    }

    let sweep = (progress - PULL_START) / (PULL_END - PULL_START);
    let point = Vec2::new(cfg.bounds.width * sweep, cfg.bounds.height * 0.25);

    Interaction::new(point, true)
}

fn run(cfg: &Config) -> Result<(), SimError> {
    let mut sim = Simulation::new(cfg)?;
    sim.spawn_blob(&cfg.spawn);

    let mut buffers = RenderBuffers::with_capacity(cfg.solver.max_particles);
    let log_ratio = cfg.log_ratio.max(1);

    let start_time = Instant::now();
    let mut start_time_bench = Instant::now();

    for t in 0..cfg.num_steps {
        if t % BENCH_RATIO == 0 {
            start_time_bench = Instant::now();
        }

        sim.step(&interaction(cfg, t));
        sim.export(&mut buffers);

        if t % BENCH_RATIO == 0 {
            info!(
                "t: {t}, Step time: {}μs, Particles: {}",
                start_time_bench.elapsed().as_micros(),
                buffers.count()
            );
        }

        if t % log_ratio == 0 {
            info!(
                "t: {t}, Density error: {:.2}%, KE: {:.1}, Max speed: {:.1}",
                sim.avg_density_error() * 100.,
                sim.kinetic_energy(),
                sim.max_speed()
            );
        }
    }

    info!(
        "Ran {} steps in {:.2}s",
        sim.steps(),
        start_time.elapsed().as_secs_f32()
    );

    sim.shutdown();
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let path = PathBuf::from(SAVE_FILE);
    let cfg = load_config(&path);

    match run(&cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
