//! The three per-step SPH passes: density and pressure, forces, then integration.
//!
//! Each pass is dispatched through the thread pool, and each dispatch is a full barrier, so a
//! pass only ever reads values the previous pass has finalized. Passes that read other particles
//! write their results into per-particle scratch first, then copy them onto the particles in a
//! second dispatch; no particle is written while another batch may be reading it.
//!
//! All dispatches use `ThreadPool::parallel_for_each_mut`, the slice form of `parallel_for`: same
//! batching, same blocking barrier.

use glam::Vec2;
use rand::Rng;

use crate::{
    grid::SpatialGrid,
    input::Interaction,
    kernels::Kernels,
    neighbors::NeighborCache,
    params::{Bounds, InteractionParams, SolverParams},
    particle::Particle,
    thread_pool::ThreadPool,
};

/// Below this separation, two particles are treated as coincident.
const DIST_EPS: f32 = 1e-6;
/// Scale of the random separation substituted for coincident particles.
const JITTER: f32 = 0.0001;

/// Rebuild the grid, find every particle's neighbors, and from them its density and pressure.
pub fn compute_density_pressure(
    pool: &ThreadPool,
    particles: &mut [Particle],
    grid: &mut SpatialGrid,
    neighbors: &mut NeighborCache,
    params: &SolverParams,
    kernels: &Kernels,
) {
    grid.rebuild(particles);
    neighbors.resize(particles.len());

    let mass = params.particle_mass;

    {
        let particles: &[Particle] = particles;
        let grid: &SpatialGrid = grid;

        pool.parallel_for_each_mut(neighbors.lists_mut(), |i, list| {
            list.find(i, particles, grid, kernels);

            let posit = particles[i].posit;
            let mut density = 0.;
            for &j in &list.indices {
                let r_sq = (particles[j].posit - posit).length_squared();
                density += mass * kernels.poly6(r_sq);
            }

            if let Some(floor) = params.density_floor {
                density = density.max(floor);
            }
            list.density = density;
        });
    }

    let lists = neighbors.lists();
    pool.parallel_for_each_mut(particles, |i, particle| {
        particle.density = lists[i].density;
        particle.pressure = params.pressure(particle.density);
    });
}

/// Accumulate pressure, viscosity, gravity and pointer-attraction forces on every particle, from
/// the neighbor lists the density pass left behind. Forces are overwritten, not accumulated
/// across steps.
#[allow(clippy::too_many_arguments)]
pub fn compute_forces(
    pool: &ThreadPool,
    particles: &mut [Particle],
    neighbors: &NeighborCache,
    forces: &mut Vec<Vec2>,
    params: &SolverParams,
    kernels: &Kernels,
    interaction: &Interaction,
    interaction_params: &InteractionParams,
) {
    forces.resize(particles.len(), Vec2::ZERO);

    {
        let particles: &[Particle] = particles;

        pool.parallel_for_each_mut(forces.as_mut_slice(), |i, force| {
            *force = force_on(
                i,
                particles,
                neighbors.get(i),
                params,
                kernels,
                interaction,
                interaction_params,
            );
        });
    }

    let forces: &[Vec2] = forces;
    pool.parallel_for_each_mut(particles, |i, particle| {
        particle.force = forces[i];
    });
}

/// Semi-implicit Euler, then clamp into the domain, reflecting and damping velocity at each wall.
pub fn integrate(pool: &ThreadPool, particles: &mut [Particle], params: &SolverParams, bounds: &Bounds) {
    pool.parallel_for_each_mut(particles, |_, particle| {
        integrate_particle(particle, params, bounds);
    });
}

fn force_on(
    i: usize,
    particles: &[Particle],
    neighbors: &[usize],
    params: &SolverParams,
    kernels: &Kernels,
    interaction: &Interaction,
    interaction_params: &InteractionParams,
) -> Vec2 {
    let a = &particles[i];
    let mass = params.particle_mass;

    let mut pressure_force = Vec2::ZERO;
    let mut viscosity_force = Vec2::ZERO;

    for &j in neighbors {
        if i == j {
            continue;
        }

        let b = &particles[j];
        let mut diff = b.posit - a.posit;
        let mut dist = diff.length();

        // Coincident particles: use a tiny random separation for this term only.
        if dist < DIST_EPS {
            let mut rng = rand::rng();
            diff = Vec2::new(
                (rng.random::<f32>() - 0.5) * JITTER,
                (rng.random::<f32>() - 0.5) * JITTER,
            );
            dist = diff.length();
        }

        if dist < kernels.radius {
            pressure_force += -diff.normalize_or_zero() * mass * (a.pressure + b.pressure)
                / (2. * b.density)
                * kernels.spiky_grad(dist);

            viscosity_force +=
                params.viscosity * mass * (b.vel - a.vel) / b.density * kernels.visc_lap(dist);
        }
    }

    let gravity_force = Vec2::new(0., params.gravity) * mass / a.density;

    let mut attraction_force = Vec2::ZERO;
    if interaction.active {
        let to_point = interaction.point - a.posit;
        if to_point.length() < interaction_params.radius {
            attraction_force =
                to_point.normalize_or_zero() * mass / a.density * interaction_params.strength;
        }
    }

    pressure_force + viscosity_force + gravity_force + attraction_force
}

fn integrate_particle(particle: &mut Particle, params: &SolverParams, bounds: &Bounds) {
    particle.vel += params.dt * particle.force / particle.density;
    particle.posit += params.dt * particle.vel;

    let eps = params.boundary_epsilon;
    let damping = params.boundary_damping;

    // Sides aren't exclusive; each is checked every step.
    if particle.posit.x - eps < 0. {
        particle.vel.x *= damping;
        particle.posit.x = eps;
    }
    if particle.posit.x + eps > bounds.width {
        particle.vel.x *= damping;
        particle.posit.x = bounds.width - eps;
    }
    if particle.posit.y - eps < 0. {
        particle.vel.y *= damping;
        particle.posit.y = eps;
    }
    if particle.posit.y + eps > bounds.height {
        particle.vel.y *= damping;
        particle.posit.y = bounds.height - eps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            width: 200.,
            height: 100.,
        }
    }

    #[test]
    fn integrate_uses_updated_velocity() {
        let params = SolverParams {
            dt: 0.5,
            ..Default::default()
        };
        let mut p = Particle::new(100., 50.);
        p.force = Vec2::new(4., 0.);
        p.density = 2.;

        integrate_particle(&mut p, &params, &bounds());

        // v = 0.5 * 4 / 2 = 1; x += 0.5 * 1.
        assert_eq!(p.vel, Vec2::new(1., 0.));
        assert_eq!(p.posit, Vec2::new(100.5, 50.));
    }

    #[test]
    fn walls_reflect_and_damp() {
        let params = SolverParams::default();
        let mut p = Particle::new(5., 95.);
        p.vel = Vec2::new(-10., 20.);
        p.density = 1.;

        integrate_particle(&mut p, &params, &bounds());

        let eps = params.boundary_epsilon;
        assert_eq!(p.posit, Vec2::new(eps, 100. - eps));
        assert_eq!(p.vel, Vec2::new(5., -10.));
    }

    #[test]
    fn coincident_neighbor_gives_finite_force() {
        let params = SolverParams::default();
        let kernels = params.kernels();

        let mut particles = vec![Particle::new(50., 50.), Particle::new(50., 50.)];
        for p in &mut particles {
            p.density = 300.;
            p.pressure = 10.;
        }

        let force = force_on(
            0,
            &particles,
            &[0, 1],
            &params,
            &kernels,
            &Interaction::default(),
            &InteractionParams::default(),
        );

        assert!(force.is_finite());
    }

    #[test]
    fn attraction_only_inside_radius() {
        let params = SolverParams {
            gravity: 0.,
            ..Default::default()
        };
        let kernels = params.kernels();
        let interaction_params = InteractionParams::default();

        let mut particles = vec![Particle::new(100., 100.)];
        particles[0].density = 1.;

        let near = Interaction::new(Vec2::new(200., 100.), true);
        let force = force_on(0, &particles, &[0], &params, &kernels, &near, &interaction_params);
        assert!(force.x > 0.);
        assert_eq!(force.y, 0.);

        let far = Interaction::new(Vec2::new(1_000., 100.), true);
        let force = force_on(0, &particles, &[0], &params, &kernels, &far, &interaction_params);
        assert_eq!(force, Vec2::ZERO);

        let inactive = Interaction::new(Vec2::new(200., 100.), false);
        let force = force_on(0, &particles, &[0], &params, &kernels, &inactive, &interaction_params);
        assert_eq!(force, Vec2::ZERO);

        // Sitting on the point itself: no direction, no force.
        let on_top = Interaction::new(Vec2::new(100., 100.), true);
        let force = force_on(0, &particles, &[0], &params, &kernels, &on_top, &interaction_params);
        assert_eq!(force, Vec2::ZERO);
    }
}
