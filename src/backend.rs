use nalgebra as na;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub position: na::Point2<f32>,
    pub velocity: na::Vector2<f32>,
    pub radius: f32,
    pub mass: f32,
    pub shape: Shape,
    pub elasticity: f32,
    pub friction: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSpec {
    pub position: na::Point2<f32>,
    pub velocity: na::Vector2<f32>,
    /// relative to `position`, in order around the outline
    pub vertices: Vec<na::Vector2<f32>>,
    pub mass: f32,
    pub friction: f32,
}

/// Rigid-body engine driven by a simulation.
///
/// Positions and velocities of created bodies belong to the backend; callers
/// only read them back or override velocities between steps.
pub trait PhysicsBackend {
    type Handle: Copy + std::fmt::Debug;

    fn set_gravity(&mut self, gravity: na::Vector2<f32>);

    fn create_body(&mut self, spec: &BodySpec) -> Result<Self::Handle, Error>;

    fn remove_body(&mut self, handle: Self::Handle) -> Result<(), Error>;

    fn position(&self, handle: Self::Handle) -> Result<na::Point2<f32>, Error>;

    fn velocity(&self, handle: Self::Handle) -> Result<na::Vector2<f32>, Error>;

    fn set_velocity(&mut self, handle: Self::Handle, velocity: na::Vector2<f32>)
        -> Result<(), Error>;

    fn step(&mut self, dt: f32) -> Result<(), Error>;

    /// Static line segment, used for floors and walls.
    fn add_segment(
        &mut self,
        a: na::Point2<f32>,
        b: na::Point2<f32>,
        thickness: f32,
        friction: f32,
    ) -> Result<(), Error>;

    fn add_polygon(&mut self, spec: &PolygonSpec) -> Result<Self::Handle, Error>;
}
