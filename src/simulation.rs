//! The simulation context: particle state, per-step scratch, parameters, and the worker pool
//! that runs the passes. Owned by the caller; nothing here is global.

use std::ops::RangeInclusive;

use glam::Vec2;
use log::{debug, info, trace, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::SimError,
    grid::SpatialGrid,
    input::Interaction,
    kernels::Kernels,
    neighbors::NeighborCache,
    params::{Bounds, Config, InteractionParams, SolverParams, SpawnParams},
    particle::Particle,
    properties,
    render::RenderBuffers,
    sph,
    thread_pool::ThreadPool,
};

pub struct Simulation {
    params: SolverParams,
    /// Derived from `params.kernel_radius`.
    kernels: Kernels,
    bounds: Bounds,
    interaction_params: InteractionParams,
    particles: Vec<Particle>,
    grid: SpatialGrid,
    neighbors: NeighborCache,
    /// Force pass scratch.
    forces: Vec<Vec2>,
    pool: ThreadPool,
    /// For spawn jitter.
    rng: StdRng,
    steps: usize,
}

impl Simulation {
    /// Validate the config, and start a worker pool for this simulation.
    pub fn new(cfg: &Config) -> Result<Self, SimError> {
        cfg.validate()?;

        let pool = match cfg.num_workers {
            Some(n) => ThreadPool::with_workers(n)?,
            None => ThreadPool::start()?,
        };

        Self::with_pool(cfg, pool)
    }

    /// As `new`, but running on a pool the caller built.
    pub fn with_pool(cfg: &Config, pool: ThreadPool) -> Result<Self, SimError> {
        cfg.validate()?;

        let params = cfg.solver.clone();
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            "Simulation: {} x {}, kernel radius {}, max {} particles, {} workers",
            cfg.bounds.width,
            cfg.bounds.height,
            params.kernel_radius,
            params.max_particles,
            pool.num_workers()
        );

        Ok(Self {
            kernels: params.kernels(),
            bounds: cfg.bounds,
            interaction_params: cfg.interaction,
            particles: Vec::with_capacity(params.max_particles),
            grid: SpatialGrid::new(cfg.bounds, params.cell_size()),
            neighbors: NeighborCache::new(params.max_neighbors),
            forces: Vec::with_capacity(params.max_particles),
            pool,
            rng,
            steps: 0,
            params,
        })
    }

    /// Stop the worker pool, joining every worker.
    pub fn shutdown(self) {
        self.pool.stop();
    }

    /// Fill a disc with particles on a square lattice centered on `center`, each jittered slightly.
    /// The lattice is clipped to the domain, and spawning stops once the particle limit is
    /// reached. Returns the number added.
    pub fn spawn_particles(&mut self, center: Vec2, radius: f32, spacing: f32) -> usize {
        if !(center.is_finite() && radius.is_finite() && radius >= 0.) {
            warn!("Ignoring spawn at {center} with radius {radius}");
            return 0;
        }
        if !(spacing.is_finite() && spacing > 0.) {
            warn!("Ignoring spawn with spacing {spacing}");
            return 0;
        }

        let radius_f64 = radius as f64;
        let rows = lattice_steps(center.y, radius_f64, spacing, self.bounds.height);

        let mut added = 0;

        'rows: for row in rows {
            let y = lattice_coord(center.y, row, spacing);

            // Only the columns under this row's chord of the disc.
            let dy = row as f64 * spacing as f64;
            let half_chord = (radius_f64 * radius_f64 - dy * dy).max(0.).sqrt();
            let cols = lattice_steps(center.x, half_chord, spacing, self.bounds.width);

            for col in cols {
                let x = lattice_coord(center.x, col, spacing);

                if Vec2::new(x, y).distance(center) > radius {
                    continue;
                }
                if self.particles.len() >= self.params.max_particles {
                    warn!(
                        "Particle limit {} reached; spawn stopped early",
                        self.params.max_particles
                    );
                    break 'rows;
                }

                let offset = Vec2::new(
                    self.rng.random::<f32>() - 0.5,
                    self.rng.random::<f32>() - 0.5,
                );
                self.particles.push(Particle::new(x + offset.x, y + offset.y));
                added += 1;
            }
        }

        info!("Spawned {added} particles; {} total", self.particles.len());

        added
    }

    /// Spawn a blob described by config. Unset fields use the domain center, and the kernel
    /// radius as spacing.
    pub fn spawn_blob(&mut self, spawn: &SpawnParams) -> usize {
        let center = spawn
            .center
            .map(|(x, y)| Vec2::new(x, y))
            .unwrap_or_else(|| self.bounds.center());
        let spacing = spawn.spacing.unwrap_or(self.params.kernel_radius);

        self.spawn_particles(center, spawn.radius, spacing)
    }

    /// Add one particle, if under the limit. Returns whether it was added.
    pub fn add_particle(&mut self, particle: Particle) -> bool {
        if self.particles.len() >= self.params.max_particles {
            return false;
        }
        self.particles.push(particle);
        true
    }

    /// Remove every particle.
    pub fn reset(&mut self) {
        self.particles.clear();
        self.particles.shrink_to_fit();
        self.neighbors.clear();
        self.forces.clear();
        self.steps = 0;

        info!("Reset particles");
    }

    /// Replace the solver parameters between steps. A new kernel radius recomputes the kernel
    /// coefficients and the grid, since the cell size follows the radius.
    pub fn set_params(&mut self, params: SolverParams) -> Result<(), SimError> {
        params.validate(&self.bounds)?;

        if params.kernel_radius != self.params.kernel_radius {
            self.kernels = params.kernels();
            self.grid = SpatialGrid::new(self.bounds, params.cell_size());
            debug!(
                "Kernel radius {} -> {}; grid is now {:?} cells",
                self.params.kernel_radius,
                params.kernel_radius,
                self.grid.dims()
            );
        }
        self.neighbors.set_capacity_hint(params.max_neighbors);
        self.params = params;

        Ok(())
    }

    pub fn set_interaction_params(&mut self, interaction_params: InteractionParams) {
        self.interaction_params = interaction_params;
    }

    /// Advance one timestep: density and pressure, forces, then integration.
    pub fn step(&mut self, interaction: &Interaction) {
        self.compute_density_pressure();
        self.compute_forces(interaction);
        self.integrate();

        self.steps += 1;
        trace!("Step {} complete; {} particles", self.steps, self.particles.len());
    }

    pub fn compute_density_pressure(&mut self) {
        sph::compute_density_pressure(
            &self.pool,
            &mut self.particles,
            &mut self.grid,
            &mut self.neighbors,
            &self.params,
            &self.kernels,
        );
    }

    /// Must follow `compute_density_pressure` in the same step; it reads that pass's neighbor
    /// lists.
    pub fn compute_forces(&mut self, interaction: &Interaction) {
        sph::compute_forces(
            &self.pool,
            &mut self.particles,
            &self.neighbors,
            &mut self.forces,
            &self.params,
            &self.kernels,
            interaction,
            &self.interaction_params,
        );
    }

    pub fn integrate(&mut self) {
        sph::integrate(&self.pool, &mut self.particles, &self.params, &self.bounds);
    }

    /// Copy positions and pressures into render buffers.
    pub fn export(&self, buffers: &mut RenderBuffers) {
        buffers.fill(&self.particles);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Neighbors of particle `i` from the last density pass, including `i` itself.
    pub fn neighbors(&self, i: usize) -> &[usize] {
        self.neighbors.get(i)
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn kernels(&self) -> &Kernels {
        &self.kernels
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn avg_density_error(&self) -> f32 {
        properties::avg_density_error(&self.particles, self.params.rest_density)
    }

    pub fn kinetic_energy(&self) -> f32 {
        properties::kinetic_energy(&self.particles, self.params.particle_mass)
    }

    pub fn max_speed(&self) -> f32 {
        properties::max_speed(&self.particles)
    }
}

/// Lattice steps `k` along one axis with `center + k * spacing` inside both `center ± half_width`
/// and `0..=extent`. Computed in f64 so large radii can't stall on rounding.
fn lattice_steps(center: f32, half_width: f64, spacing: f32, extent: f32) -> RangeInclusive<i64> {
    let (center, spacing) = (center as f64, spacing as f64);

    let lo = (center - half_width).max(0.);
    let hi = (center + half_width).min(extent as f64);

    let first = ((lo - center) / spacing).ceil() as i64;
    let last = ((hi - center) / spacing).floor() as i64;

    first..=last
}

fn lattice_coord(center: f32, step: i64, spacing: f32) -> f32 {
    (center as f64 + step as f64 * spacing as f64) as f32
}
