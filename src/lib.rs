//! A 2D weakly-compressible SPH fluid solver.
//!
//! Each step rebuilds a uniform grid, then runs three passes over the particles on a fixed worker
//! pool: density and pressure (which also caches each particle's neighbors), forces, and
//! semi-implicit Euler integration with reflecting walls. Rendering and input are left to the
//! caller: the solver takes an `Interaction` per step, and exports positions and pressures
//! through `RenderBuffers`.

pub mod error;
pub mod grid;
pub mod input;
pub mod kernels;
pub mod neighbors;
pub mod params;
pub mod particle;
pub mod properties;
pub mod render;
pub mod simulation;
pub mod sph;
pub mod thread_pool;
pub mod util;

pub use crate::{
    error::SimError,
    input::Interaction,
    params::{Bounds, Config, InteractionParams, SolverParams, SpawnParams},
    particle::Particle,
    render::RenderBuffers,
    simulation::Simulation,
    thread_pool::ThreadPool,
};
