//! 2D smoothing kernels. Normalization coefficients depend only on the kernel radius, so they're
//! computed once, and recomputed only when the radius changes.

use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kernels {
    /// Smoothing length; particles farther apart than this don't interact.
    pub radius: f32,
    pub radius_sq: f32,
    /// Poly6, for density. 4 / (πh⁸)
    pub poly6: f32,
    /// Spiky gradient, for pressure. -10 / (πh⁵)
    pub spiky_grad: f32,
    /// Viscosity laplacian. 40 / (πh⁵)
    pub visc_lap: f32,
}

impl Kernels {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            radius_sq: radius * radius,
            poly6: 4. / (PI * radius.powi(8)),
            spiky_grad: -10. / (PI * radius.powi(5)),
            visc_lap: 40. / (PI * radius.powi(5)),
        }
    }

    /// Poly6 weight at squared distance `r_sq`. Only meaningful inside the support.
    #[inline]
    pub fn poly6(&self, r_sq: f32) -> f32 {
        let diff = self.radius_sq - r_sq;
        self.poly6 * diff * diff * diff
    }

    /// Scalar part of the spiky gradient at distance `dist`.
    #[inline]
    pub fn spiky_grad(&self, dist: f32) -> f32 {
        let diff = self.radius - dist;
        self.spiky_grad * diff * diff * diff
    }

    #[inline]
    pub fn visc_lap(&self, dist: f32) -> f32 {
        self.visc_lap * (self.radius - dist)
    }
}
