use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// (x, y), fixed for the lifetime of a simulation
    pub gravity: (f32, f32),
    /// fixed step, in simulation time units
    pub dt: f32,
    /// target frame rate of the run loop, 0 disables the limiter
    pub fps: u32,
    pub mass: f32,
    pub elasticity: f32,
    pub friction: f32,
    /// Per-axis slack before a velocity change counts as drift.
    pub drift_tolerance: f32,
    /// (width, height) of the source frames, in px
    pub viewport: (u32, u32),
}

impl SimulationConfig {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: (0.0, 0.0),
            dt: 0.25,
            fps: 60,
            mass: 20.0,
            elasticity: 0.95,
            friction: 0.7,
            drift_tolerance: 0.0,
            viewport: (0, 0),
        }
    }
}
