use glam::Vec2;

/// A fluid particle. Its index in the simulation's particle list is its only identity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub posit: Vec2,
    pub vel: Vec2,
    /// Total force from the most recent force pass. Overwritten each step.
    pub force: Vec2,
    /// Local density. Non-negative once computed.
    pub density: f32,
    /// From the equation of state; negative below rest density.
    pub pressure: f32,
}

impl Particle {
    /// A particle at rest, with no force, density or pressure yet.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            posit: Vec2::new(x, y),
            ..Default::default()
        }
    }
}
