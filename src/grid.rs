//! Uniform grid for neighbor search. Rebuilt from scratch every step.

use glam::{IVec2, Vec2};

use crate::{particle::Particle, params::Bounds};

pub struct SpatialGrid {
    cell_size: f32,
    /// Dimensions, in cells.
    width: usize,
    height: usize,
    /// Row-major. Particle indices in each cell.
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(bounds: Bounds, cell_size: f32) -> Self {
        let width = (bounds.width / cell_size) as usize + 1;
        let height = (bounds.height / cell_size) as usize + 1;

        Self {
            cell_size,
            width,
            height,
            cells: vec![Vec::new(); width * height],
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Cell coordinate containing `posit`, clamped onto the grid.
    pub fn cell_coord(&self, posit: Vec2) -> IVec2 {
        let cell = (posit / self.cell_size).floor();
        // Saturating float-to-int casts; NaN lands in cell 0.
        IVec2::new(
            (cell.x as i32).clamp(0, self.width as i32 - 1),
            (cell.y as i32).clamp(0, self.height as i32 - 1),
        )
    }

    pub fn cell_index(&self, cell: IVec2) -> usize {
        cell.y as usize * self.width + cell.x as usize
    }

    /// Clear every cell, then place each particle into exactly one.
    pub fn rebuild(&mut self, particles: &[Particle]) {
        for cell in &mut self.cells {
            cell.clear();
        }

        for (i, particle) in particles.iter().enumerate() {
            let idx = self.cell_index(self.cell_coord(particle.posit));
            self.cells[idx].push(i);
        }
    }

    pub fn cell(&self, cell: IVec2) -> &[usize] {
        &self.cells[self.cell_index(cell)]
    }

    /// Particle lists of every cell within `radius_cells` of the cell containing `posit`,
    /// clipped to the grid. Each cell is visited once.
    pub fn query_ring(&self, posit: Vec2, radius_cells: i32) -> impl Iterator<Item = &[usize]> + '_ {
        let center = self.cell_coord(posit);

        let x_min = (center.x - radius_cells).max(0);
        let x_max = (center.x + radius_cells).min(self.width as i32 - 1);
        let y_min = (center.y - radius_cells).max(0);
        let y_max = (center.y + radius_cells).min(self.height as i32 - 1);

        (x_min..=x_max).flat_map(move |x| {
            (y_min..=y_max).map(move |y| self.cell(IVec2::new(x, y)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds {
            width: 100.,
            height: 50.,
        }
    }

    #[test]
    fn dims_cover_bounds() {
        let grid = SpatialGrid::new(bounds(), 10.);
        assert_eq!(grid.dims(), (11, 6));
    }

    #[test]
    fn cell_coord_clamps() {
        let grid = SpatialGrid::new(bounds(), 10.);

        assert_eq!(grid.cell_coord(Vec2::new(5., 5.)), IVec2::new(0, 0));
        assert_eq!(grid.cell_coord(Vec2::new(15., 25.)), IVec2::new(1, 2));
        assert_eq!(grid.cell_coord(Vec2::new(-3., -30.)), IVec2::new(0, 0));
        assert_eq!(grid.cell_coord(Vec2::new(1_000., 1_000.)), IVec2::new(10, 5));
    }

    #[test]
    fn rebuild_places_each_particle_once() {
        let mut grid = SpatialGrid::new(bounds(), 10.);
        let particles = vec![
            Particle::new(1., 1.),
            Particle::new(2., 3.),
            Particle::new(55., 25.),
            Particle::new(-10., 200.),
        ];

        grid.rebuild(&particles);
        // A second rebuild must not duplicate entries.
        grid.rebuild(&particles);

        let mut all: Vec<usize> = grid.cells.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);

        assert_eq!(grid.cell(IVec2::new(0, 0)), &[0, 1]);
        assert_eq!(grid.cell(IVec2::new(5, 2)), &[2]);
        assert_eq!(grid.cell(IVec2::new(0, 5)), &[3]);
    }

    #[test]
    fn ring_is_clipped_at_edges() {
        let grid = SpatialGrid::new(bounds(), 10.);

        assert_eq!(grid.query_ring(Vec2::new(1., 1.), 1).count(), 4);
        assert_eq!(grid.query_ring(Vec2::new(55., 25.), 1).count(), 9);
        assert_eq!(grid.query_ring(Vec2::new(55., 25.), 2).count(), 25);
    }

    #[test]
    fn ring_finds_adjacent_cell_members() {
        let mut grid = SpatialGrid::new(bounds(), 10.);
        let particles = vec![Particle::new(19., 19.), Particle::new(21., 21.), Particle::new(45., 5.)];
        grid.rebuild(&particles);

        let found: Vec<usize> = grid
            .query_ring(particles[0].posit, 1)
            .flatten()
            .copied()
            .collect();

        assert!(found.contains(&0));
        assert!(found.contains(&1));
        assert!(!found.contains(&2));
    }
}
