//! Per-particle neighbor lists. Filled once per step by the density pass, then read by the force
//! pass. Stale from integration until the next density pass.

use crate::{grid::SpatialGrid, kernels::Kernels, particle::Particle};

#[derive(Clone, Debug, Default)]
pub struct NeighborList {
    /// Indices of all particles inside the kernel support, including the owner itself.
    pub indices: Vec<usize>,
    /// Kernel-weighted mass sum over `indices`, as computed by the density pass.
    pub density: f32,
}

impl NeighborList {
    /// Rebuild this list for particle `i`, from its own ring query. Lists aren't required to be
    /// mutually consistent; each depends only on its owner's query.
    pub fn find(&mut self, i: usize, particles: &[Particle], grid: &SpatialGrid, kernels: &Kernels) {
        self.indices.clear();

        let posit = particles[i].posit;
        let ring = (kernels.radius / grid.cell_size()).ceil() as i32;

        for cell in grid.query_ring(posit, ring) {
            for &j in cell {
                let diff = particles[j].posit - posit;
                if diff.length_squared() < kernels.radius_sq {
                    self.indices.push(j);
                }
            }
        }
    }
}

/// One list per particle, reused across steps to avoid reallocating.
#[derive(Default)]
pub struct NeighborCache {
    lists: Vec<NeighborList>,
    capacity_hint: usize,
}

impl NeighborCache {
    pub fn new(capacity_hint: usize) -> Self {
        Self {
            lists: Vec::new(),
            capacity_hint,
        }
    }

    /// Match the particle count, keeping existing lists' allocations.
    pub fn resize(&mut self, num_particles: usize) {
        let hint = self.capacity_hint;
        self.lists.resize_with(num_particles, || NeighborList {
            indices: Vec::with_capacity(hint),
            density: 0.,
        });
    }

    pub fn set_capacity_hint(&mut self, capacity_hint: usize) {
        self.capacity_hint = capacity_hint;
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }

    pub fn lists(&self) -> &[NeighborList] {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut [NeighborList] {
        &mut self.lists
    }

    pub fn get(&self, i: usize) -> &[usize] {
        &self.lists[i].indices
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Bounds;

    #[test]
    fn finds_only_particles_inside_support() {
        let kernels = Kernels::new(10.);
        let mut grid = SpatialGrid::new(
            Bounds {
                width: 100.,
                height: 100.,
            },
            10.,
        );
        let particles = vec![
            Particle::new(50., 50.),
            Particle::new(55., 50.),
            // Adjacent cell, but outside the radius.
            Particle::new(50., 60.5),
            // Exactly on the support boundary; excluded.
            Particle::new(40., 50.),
            Particle::new(90., 90.),
        ];
        grid.rebuild(&particles);

        let mut list = NeighborList::default();
        list.find(0, &particles, &grid, &kernels);

        let mut found = list.indices.clone();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn resize_keeps_lists_per_particle() {
        let mut cache = NeighborCache::new(10);
        cache.resize(5);
        assert_eq!(cache.len(), 5);
        assert!(cache.lists()[0].indices.capacity() >= 10);

        cache.lists_mut()[3].indices.push(7);
        cache.resize(8);
        assert_eq!(cache.get(3), &[7]);

        cache.resize(2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
