//! What the solver hands to a renderer: dense, index-ordered arrays it can upload verbatim.
//! Windowing, GPU buffers and drawing live outside this crate.

use crate::{params::SolverParams, particle::Particle};

/// Width of the pressure range mapped onto the colour ramp, above the minimum.
const PRESSURE_WINDOW: f32 = 100.;

/// Reusable per-frame export buffers.
#[derive(Clone, Debug, Default)]
pub struct RenderBuffers {
    /// Interleaved x, y per particle.
    pub positions: Vec<f32>,
    pub pressures: Vec<f32>,
}

impl RenderBuffers {
    pub fn with_capacity(max_particles: usize) -> Self {
        Self {
            positions: Vec::with_capacity(max_particles * 2),
            pressures: Vec::with_capacity(max_particles),
        }
    }

    /// Overwrite both arrays from `particles`, in index order.
    pub fn fill(&mut self, particles: &[Particle]) {
        self.positions.clear();
        self.pressures.clear();

        for p in particles {
            self.positions.push(p.posit.x);
            self.positions.push(p.posit.y);
            self.pressures.push(p.pressure);
        }
    }

    /// Number of particles exported.
    pub fn count(&self) -> usize {
        self.pressures.len()
    }

    /// `(min, max)` pressure for colour mapping. The minimum is the pressure of a particle with
    /// zero density.
    pub fn pressure_window(params: &SolverParams) -> (f32, f32) {
        let min = params.pressure(0.);
        (min, min + PRESSURE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_is_dense_and_ordered() {
        let mut a = Particle::new(1., 2.);
        a.pressure = -5.;
        let mut b = Particle::new(3., 4.);
        b.pressure = 7.;

        let mut buffers = RenderBuffers::with_capacity(4);
        buffers.fill(&[a, b]);
        assert_eq!(buffers.positions, vec![1., 2., 3., 4.]);
        assert_eq!(buffers.pressures, vec![-5., 7.]);
        assert_eq!(buffers.count(), 2);

        buffers.fill(&[b]);
        assert_eq!(buffers.positions, vec![3., 4.]);
        assert_eq!(buffers.count(), 1);
    }

    #[test]
    fn pressure_window_for_defaults() {
        let (min, max) = RenderBuffers::pressure_window(&SolverParams::default());
        assert_eq!(min, -600_000.);
        assert_eq!(max, -599_900.);
    }
}
