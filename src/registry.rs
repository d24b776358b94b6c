use nalgebra as na;

use crate::backend::{BodySpec, PhysicsBackend, Shape};
use crate::config::SimulationConfig;
use crate::error::Error;
use crate::estimate::MotionEstimate;

/// Outcome of the drift check of the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftCheck {
    /// velocity changed exactly by the target acceleration
    Stable,
    /// deceleration re-aimed against the current velocity
    Recomputed,
    /// drift detected while at rest, previous deceleration kept
    AtRest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPhase {
    Seeded,
    Stepped(DriftCheck),
}

#[derive(Debug, Clone)]
pub struct SimulatedBody<H> {
    pub track: usize,
    pub handle: H,
    pub mass: f32,
    pub radius: f32,
    pub target_acceleration: na::Vector2<f32>,
    /// |acceleration0|, preserved by every recomputation
    pub deceleration: f32,
    pub previous_velocity: na::Vector2<f32>,
    pub phase: BodyPhase,
    pub(crate) rest_reported: bool,
    initial_velocity: na::Vector2<f32>,
}

impl<H> SimulatedBody<H> {
    pub fn new(
        track: usize,
        handle: H,
        mass: f32,
        radius: f32,
        velocity: na::Vector2<f32>,
        acceleration: na::Vector2<f32>,
    ) -> Self {
        Self {
            track,
            handle,
            mass,
            radius,
            target_acceleration: acceleration,
            deceleration: acceleration.norm(),
            previous_velocity: velocity,
            phase: BodyPhase::Seeded,
            rest_reported: false,
            initial_velocity: velocity,
        }
    }

    #[inline]
    pub fn initial_velocity(&self) -> na::Vector2<f32> {
        self.initial_velocity
    }
}

#[derive(Debug, Clone)]
pub struct BodyRegistry<H> {
    bodies: Vec<SimulatedBody<H>>,
}

impl<H: Copy> BodyRegistry<H> {
    pub fn new() -> Self {
        Self { bodies: Vec::new() }
    }

    /// Creates the backend body for `estimate` and starts tracking it.
    /// Returns the index of the new body.
    pub fn seed<B>(
        &mut self,
        backend: &mut B,
        estimate: &MotionEstimate,
        config: &SimulationConfig,
    ) -> Result<usize, Error>
    where
        B: PhysicsBackend<Handle = H>,
    {
        let velocity = estimate.velocity0();
        let acceleration = estimate.acceleration0();

        let handle = backend.create_body(&BodySpec {
            position: estimate.position0,
            velocity,
            radius: estimate.radius,
            mass: config.mass,
            shape: Shape::Circle,
            elasticity: config.elasticity,
            friction: config.friction,
        })?;

        log::info!(
            "seeded body {} for track {} at ({:.1}, {:.1}), v = ({:.3}, {:.3}), a = ({:.3}, {:.3})",
            self.bodies.len(),
            estimate.track,
            estimate.position0.x,
            estimate.position0.y,
            velocity.x,
            velocity.y,
            acceleration.x,
            acceleration.y
        );

        self.bodies.push(SimulatedBody::new(
            estimate.track,
            handle,
            config.mass,
            estimate.radius,
            velocity,
            acceleration,
        ));

        Ok(self.bodies.len() - 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&SimulatedBody<H>> {
        self.bodies.get(idx)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &SimulatedBody<H>> {
        self.bodies.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SimulatedBody<H>> {
        self.bodies.iter_mut()
    }

    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = SimulatedBody<H>> + '_ {
        self.bodies.drain(..)
    }
}

impl<H: Copy> Default for BodyRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
