//! Solver parameters and the persisted run configuration.
//!
//! Defaults reproduce a water-like blob in a 1400 x 800 box, in screen-like units.

use std::path::Path;

use bincode::{Decode, Encode};
use glam::Vec2;

use crate::{error::SimError, kernels::Kernels, util};

/// Fixed per step. Derived kernel constants live in `Kernels`.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct SolverParams {
    /// Acceleration along the y axis. Negative pulls down.
    pub gravity: f32,
    pub rest_density: f32,
    /// Stiffness of the linear equation of state.
    pub gas_constant: f32,
    /// Smoothing length. Also the grid cell size.
    pub kernel_radius: f32,
    pub particle_mass: f32,
    pub viscosity: f32,
    /// Integration timestep.
    pub dt: f32,
    /// Particles are kept at least this far inside each wall. Normally the kernel radius.
    pub boundary_epsilon: f32,
    /// Velocity multiplier on wall contact. Negative: reflects, and removes energy.
    pub boundary_damping: f32,
    /// Initial capacity hint for each neighbor list.
    pub max_neighbors: usize,
    pub max_particles: usize,
    /// If set, computed densities are clamped to at least this value. Off by default.
    pub density_floor: Option<f32>,
}

impl Default for SolverParams {
    fn default() -> Self {
        let kernel_radius = 16.;

        Self {
            gravity: -10.,
            rest_density: 300.,
            gas_constant: 2_000.,
            kernel_radius,
            particle_mass: 2.5,
            viscosity: 200.,
            dt: 0.0007,
            boundary_epsilon: kernel_radius,
            boundary_damping: -0.5,
            max_neighbors: 10,
            max_particles: 4_000,
            density_floor: None,
        }
    }
}

impl SolverParams {
    pub fn kernels(&self) -> Kernels {
        Kernels::new(self.kernel_radius)
    }

    /// Linear equation of state.
    pub fn pressure(&self, density: f32) -> f32 {
        self.gas_constant * (density - self.rest_density)
    }

    /// Grid cell size; one ring of cells then always covers the kernel support.
    pub fn cell_size(&self) -> f32 {
        self.kernel_radius
    }

    /// Reject parameters the solver can't run with inside `bounds`.
    pub fn validate(&self, bounds: &Bounds) -> Result<(), SimError> {
        let positive = [
            ("kernel_radius", self.kernel_radius),
            ("particle_mass", self.particle_mass),
            ("dt", self.dt),
            ("rest_density", self.rest_density),
            ("width", bounds.width),
            ("height", bounds.height),
        ];

        for (name, val) in positive {
            if !(val.is_finite() && val > 0.) {
                return Err(SimError::InvalidConfig(format!(
                    "{name} must be positive and finite; got {val}"
                )));
            }
        }

        if self.max_particles == 0 {
            return Err(SimError::InvalidConfig(
                "max_particles must be at least 1".to_owned(),
            ));
        }

        if !(self.boundary_epsilon >= 0.
            && 2. * self.boundary_epsilon < bounds.width
            && 2. * self.boundary_epsilon < bounds.height)
        {
            return Err(SimError::InvalidConfig(format!(
                "boundary_epsilon {} doesn't fit inside {} x {}",
                self.boundary_epsilon, bounds.width, bounds.height
            )));
        }

        if let Some(floor) = self.density_floor {
            if !(floor.is_finite() && floor > 0.) {
                return Err(SimError::InvalidConfig(format!(
                    "density_floor must be positive and finite; got {floor}"
                )));
            }
        }

        Ok(())
    }
}

/// Simulation domain, from the origin to `(width, height)`.
#[derive(Clone, Copy, Debug, PartialEq, Encode, Decode)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            width: 1_400.,
            height: 800.,
        }
    }
}

impl Bounds {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2., self.height / 2.)
    }
}

/// Where the initial blob goes. `None` fields fall back to the domain center and kernel radius.
#[derive(Clone, Debug, Default, PartialEq, Encode, Decode)]
pub struct SpawnParams {
    pub center: Option<(f32, f32)>,
    pub radius: f32,
    pub spacing: Option<f32>,
}

impl SpawnParams {
    pub fn new_blob(radius: f32) -> Self {
        Self {
            center: None,
            radius,
            spacing: None,
        }
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.radius.is_finite() && self.radius >= 0.) {
            return Err(SimError::InvalidConfig(format!(
                "spawn radius must be finite and non-negative; got {}",
                self.radius
            )));
        }

        if let Some(spacing) = self.spacing {
            if !(spacing.is_finite() && spacing > 0.) {
                return Err(SimError::InvalidConfig(format!(
                    "spawn spacing must be positive and finite; got {spacing}"
                )));
            }
        }

        if let Some((x, y)) = self.center {
            if !(x.is_finite() && y.is_finite()) {
                return Err(SimError::InvalidConfig(format!(
                    "spawn center must be finite; got ({x}, {y})"
                )));
            }
        }

        Ok(())
    }
}

/// The pointer attraction applied in the force pass while interaction is active.
#[derive(Clone, Copy, Debug, PartialEq, Encode, Decode)]
pub struct InteractionParams {
    /// Particles farther than this from the interaction point are unaffected.
    pub radius: f32,
    pub strength: f32,
}

impl Default for InteractionParams {
    fn default() -> Self {
        Self {
            radius: 320.,
            strength: 20.,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct Config {
    pub solver: SolverParams,
    pub bounds: Bounds,
    pub spawn: SpawnParams,
    pub interaction: InteractionParams,
    /// `None` uses one worker per hardware thread.
    pub num_workers: Option<usize>,
    /// Seeds spawn jitter; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Steps run by the headless driver.
    pub num_steps: usize,
    /// The driver logs diagnostics every this many steps.
    pub log_ratio: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solver: Default::default(),
            bounds: Default::default(),
            spawn: SpawnParams::new_blob(160.),
            interaction: Default::default(),
            num_workers: None,
            seed: None,
            num_steps: 2_000,
            log_ratio: 200,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let result: Self = util::load(path)?;
        result.validate()?;
        Ok(result)
    }

    pub fn save(&self, path: &Path) -> Result<(), SimError> {
        util::save(path, self)
    }

    /// Reject parameters the solver can't run with.
    pub fn validate(&self) -> Result<(), SimError> {
        self.solver.validate(&self.bounds)?;
        self.spawn.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.solver.boundary_epsilon, cfg.solver.kernel_radius);
        assert_eq!(cfg.solver.cell_size(), 16.);
    }

    #[test]
    fn pressure_is_negative_below_rest_density() {
        let params = SolverParams::default();

        assert_eq!(params.pressure(300.), 0.);
        assert!(params.pressure(250.) < 0.);
        assert!(params.pressure(301.) > 0.);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.solver.kernel_radius = 0.;
        assert!(matches!(cfg.validate(), Err(SimError::InvalidConfig(_))));

        let mut cfg = Config::default();
        cfg.solver.dt = f32::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.solver.max_particles = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.solver.boundary_epsilon = 500.;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.solver.density_floor = Some(-1.);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unbounded_spawn() {
        let cfg = Config {
            spawn: SpawnParams::new_blob(f32::INFINITY),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(SimError::InvalidConfig(_))));

        let cfg = Config {
            spawn: SpawnParams::new_blob(f32::NAN),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            spawn: SpawnParams::new_blob(-5.),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            spawn: SpawnParams {
                spacing: Some(0.),
                ..SpawnParams::new_blob(160.)
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            spawn: SpawnParams {
                center: Some((f32::NAN, 10.)),
                ..SpawnParams::new_blob(160.)
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        // A radius larger than the domain is fine; spawning clips it.
        let cfg = Config {
            spawn: SpawnParams::new_blob(1.0e9),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
