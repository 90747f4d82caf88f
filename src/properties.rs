//! Aggregate properties of the particle set, for logging and checks.

use crate::particle::Particle;

/// Mean of |ρ - ρ₀| / ρ₀. 0 for an empty set.
pub fn avg_density_error(particles: &[Particle], rest_density: f32) -> f32 {
    if particles.is_empty() {
        return 0.;
    }

    let sum: f32 = particles
        .iter()
        .map(|p| (p.density - rest_density).abs() / rest_density)
        .sum();

    sum / particles.len() as f32
}

pub fn kinetic_energy(particles: &[Particle], mass: f32) -> f32 {
    particles
        .iter()
        .map(|p| 0.5 * mass * p.vel.length_squared())
        .sum()
}

pub fn max_speed(particles: &[Particle]) -> f32 {
    particles
        .iter()
        .map(|p| p.vel.length())
        .fold(0., f32::max)
}
