use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use nalgebra as na;

use crate::backend::{PhysicsBackend, PolygonSpec};
use crate::config::SimulationConfig;
use crate::error::Error;
use crate::estimate::MotionEstimate;
use crate::registry::{BodyPhase, BodyRegistry, DriftCheck, SimulatedBody};
use crate::spline;

const CURVE_SAMPLES: usize = 100;

/// Deceleration of `magnitude` pointing against `velocity`.
pub fn recompute_deceleration(
    velocity: &na::Vector2<f32>,
    magnitude: f32,
) -> Result<na::Vector2<f32>, Error> {
    let speed = velocity.norm();

    if speed.is_nan() || speed <= 0.0 {
        return Err(Error::ZeroVelocityRecompute);
    }

    Ok(-(velocity / speed) * magnitude)
}

/// True when the observed per-axis velocity change departs from the target
/// acceleration by more than `tolerance`.
#[inline]
pub fn drifted(
    change: &na::Vector2<f32>,
    target: &na::Vector2<f32>,
    tolerance: f32,
) -> bool {
    !((change.x - target.x).abs() <= tolerance && (change.y - target.y).abs() <= tolerance)
}

fn step_body<B: PhysicsBackend>(
    backend: &mut B,
    body: &mut SimulatedBody<B::Handle>,
    dt: f32,
    tolerance: f32,
) -> Result<(), Error> {
    let v_cur = backend.velocity(body.handle)?;
    let change = v_cur - body.previous_velocity;

    let check = if drifted(&change, &body.target_acceleration, tolerance) {
        match recompute_deceleration(&v_cur, body.deceleration) {
            Ok(acceleration) => {
                log::trace!(
                    "track {}: deceleration re-aimed to ({:.4}, {:.4})",
                    body.track,
                    acceleration.x,
                    acceleration.y
                );

                body.target_acceleration = acceleration;
                DriftCheck::Recomputed
            }
            Err(err) => {
                if body.rest_reported {
                    log::debug!("track {}: {}", body.track, err);
                } else {
                    log::warn!("track {}: {}, keeping previous deceleration", body.track, err);
                    body.rest_reported = true;
                }

                DriftCheck::AtRest
            }
        }
    } else {
        DriftCheck::Stable
    };

    let v_new = v_cur + body.target_acceleration * dt;
    backend.set_velocity(body.handle, v_new)?;

    body.previous_velocity = v_new;
    body.phase = BodyPhase::Stepped(check);

    Ok(())
}

/// Read-only view of one simulated body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub track: usize,
    pub position: na::Point2<f32>,
    pub velocity: na::Vector2<f32>,
    pub radius: f32,
    pub target_acceleration: na::Vector2<f32>,
    pub phase: BodyPhase,
}

/// Receives every frame of [`Simulation::run`]; `Break` ends the run.
pub trait FrameSink<B: PhysicsBackend> {
    fn present(&mut self, sim: &Simulation<B>) -> Result<ControlFlow<()>, Error>;
}

impl<B, F> FrameSink<B> for F
where
    B: PhysicsBackend,
    F: FnMut(&Simulation<B>) -> Result<ControlFlow<()>, Error>,
{
    #[inline]
    fn present(&mut self, sim: &Simulation<B>) -> Result<ControlFlow<()>, Error> {
        self(sim)
    }
}

/// Keeps a loop at a fixed frame rate by sleeping off the rest of each frame.
#[derive(Debug)]
pub struct FrameLimiter {
    period: Option<Duration>,
    last: Instant,
}

impl FrameLimiter {
    /// `fps == 0` never sleeps.
    pub fn new(fps: u32) -> Self {
        Self {
            period: (fps > 0).then(|| Duration::from_secs_f64(1.0 / fps as f64)),
            last: Instant::now(),
        }
    }

    /// Sleeps until one period has passed since the previous tick and returns
    /// the time slept.
    pub fn tick(&mut self) -> Duration {
        let mut slept = Duration::ZERO;

        if let Some(period) = self.period {
            let elapsed = self.last.elapsed();
            if elapsed < period {
                slept = period - elapsed;
                std::thread::sleep(slept);
            }
        }

        self.last = Instant::now();
        slept
    }
}

pub struct Simulation<B: PhysicsBackend> {
    backend: B,
    gravity: na::Vector2<f32>,
    config: SimulationConfig,
    bodies: BodyRegistry<B::Handle>,
    frame: u64,
}

impl<B: PhysicsBackend> Simulation<B> {
    pub fn new(mut backend: B, config: SimulationConfig) -> Self {
        let gravity = na::Vector2::new(config.gravity.0, config.gravity.1);
        backend.set_gravity(gravity);

        Self {
            backend,
            gravity,
            config,
            bodies: BodyRegistry::new(),
            frame: 0,
        }
    }

    /// Builds a simulation with one body per estimate, in order.
    pub fn init(
        backend: B,
        config: SimulationConfig,
        estimates: &[MotionEstimate],
    ) -> Result<Self, Error> {
        let mut sim = Self::new(backend, config);

        for estimate in estimates {
            sim.add_body(estimate)?;
        }

        log::info!(
            "simulation ready: {} bodies, viewport {}x{}, dt {}",
            sim.bodies.len(),
            sim.config.viewport.0,
            sim.config.viewport.1,
            sim.config.dt
        );

        Ok(sim)
    }

    pub fn add_body(&mut self, estimate: &MotionEstimate) -> Result<usize, Error> {
        self.bodies.seed(&mut self.backend, estimate, &self.config)
    }

    /// Re-aims and applies every body's deceleration, then advances the
    /// backend by `dt`.
    pub fn step(&mut self, dt: f32) -> Result<(), Error> {
        let tolerance = self.config.drift_tolerance;

        for body in self.bodies.iter_mut() {
            step_body(&mut self.backend, body, dt, tolerance)?;
        }

        self.backend.step(dt)?;
        self.frame += 1;

        Ok(())
    }

    /// Steps with the configured `dt` until `sink` breaks or fails.
    /// Returns the number of frames run.
    pub fn run<S: FrameSink<B>>(&mut self, sink: &mut S) -> Result<u64, Error> {
        let mut limiter = FrameLimiter::new(self.config.fps);
        let start = self.frame;

        loop {
            self.step(self.config.dt)?;

            log::trace!("frame {}", self.frame);

            if sink.present(self)?.is_break() {
                break;
            }

            limiter.tick();
        }

        Ok(self.frame - start)
    }

    /// Removes every body from the backend and hands the backend back.
    pub fn shutdown(mut self) -> Result<B, Error> {
        let mut removed = 0;

        for body in self.bodies.drain() {
            self.backend.remove_body(body.handle)?;
            removed += 1;
        }

        log::info!(
            "simulation stopped after {} frames, {} bodies removed",
            self.frame,
            removed
        );

        Ok(self.backend)
    }

    /// Static floor along a smooth curve through `points`.
    pub fn add_curved_floor(
        &mut self,
        points: &[na::Point2<f32>],
        thickness: f32,
        friction: f32,
    ) -> Result<(), Error> {
        let curve = spline::sample_curve(points, CURVE_SAMPLES)?;

        for pair in curve.windows(2) {
            self.backend.add_segment(pair[0], pair[1], thickness, friction)?;
        }

        Ok(())
    }

    pub fn add_polygon(
        &mut self,
        position: na::Point2<f32>,
        vertices: Vec<na::Vector2<f32>>,
        mass: f32,
        velocity: na::Vector2<f32>,
    ) -> Result<B::Handle, Error> {
        self.backend.add_polygon(&PolygonSpec {
            position,
            velocity,
            vertices,
            mass,
            friction: self.config.friction,
        })
    }

    pub fn body_state(&self, idx: usize) -> Result<BodyState, Error> {
        let body = self.bodies.get(idx).ok_or(Error::UnknownBody)?;

        Ok(BodyState {
            track: body.track,
            position: self.backend.position(body.handle)?,
            velocity: self.backend.velocity(body.handle)?,
            radius: body.radius,
            target_acceleration: body.target_acceleration,
            phase: body.phase,
        })
    }

    #[inline]
    pub fn bodies(&self) -> &BodyRegistry<B::Handle> {
        &self.bodies
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[inline]
    pub fn gravity(&self) -> na::Vector2<f32> {
        self.gravity
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BodySpec;
    use approx::assert_abs_diff_eq;

    /// Velocities only; `step` adds `kick` to every body.
    #[derive(Default)]
    struct MockBackend {
        velocities: Vec<na::Vector2<f32>>,
        kick: na::Vector2<f32>,
        steps: usize,
    }

    impl PhysicsBackend for MockBackend {
        type Handle = usize;

        fn set_gravity(&mut self, _gravity: na::Vector2<f32>) {}

        fn create_body(&mut self, spec: &BodySpec) -> Result<usize, Error> {
            self.velocities.push(spec.velocity);
            Ok(self.velocities.len() - 1)
        }

        fn remove_body(&mut self, _handle: usize) -> Result<(), Error> {
            Ok(())
        }

        fn position(&self, _handle: usize) -> Result<na::Point2<f32>, Error> {
            Ok(na::Point2::origin())
        }

        fn velocity(&self, handle: usize) -> Result<na::Vector2<f32>, Error> {
            self.velocities.get(handle).copied().ok_or(Error::UnknownBody)
        }

        fn set_velocity(
            &mut self,
            handle: usize,
            velocity: na::Vector2<f32>,
        ) -> Result<(), Error> {
            *self.velocities.get_mut(handle).ok_or(Error::UnknownBody)? = velocity;
            Ok(())
        }

        fn step(&mut self, _dt: f32) -> Result<(), Error> {
            let kick = self.kick;
            self.velocities.iter_mut().for_each(|v| *v += kick);
            self.steps += 1;
            Ok(())
        }

        fn add_segment(
            &mut self,
            _a: na::Point2<f32>,
            _b: na::Point2<f32>,
            _thickness: f32,
            _friction: f32,
        ) -> Result<(), Error> {
            Ok(())
        }

        fn add_polygon(&mut self, _spec: &PolygonSpec) -> Result<usize, Error> {
            Err(Error::Backend("polygons are not supported".into()))
        }
    }

    fn body(
        velocity: (f32, f32),
        acceleration: (f32, f32),
    ) -> (MockBackend, SimulatedBody<usize>) {
        let velocity = na::Vector2::new(velocity.0, velocity.1);
        let backend = MockBackend {
            velocities: vec![velocity],
            ..Default::default()
        };

        let body = SimulatedBody::new(
            0,
            0,
            20.0,
            5.0,
            velocity,
            na::Vector2::new(acceleration.0, acceleration.1),
        );

        (backend, body)
    }

    #[test]
    fn test_recompute_is_anti_parallel_with_same_magnitude() {
        for &(vx, vy, m) in &[(10.0, 0.0, 2.0), (-3.0, 4.0, 1.5), (0.001, -250.0, 7.0)] {
            let v = na::Vector2::new(vx, vy);
            let a = recompute_deceleration(&v, m).unwrap();

            assert_abs_diff_eq!(a.norm(), m, epsilon = 1e-4);
            assert!(a.dot(&v) < 0.0);
            assert_abs_diff_eq!(a.x * v.y - a.y * v.x, 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_recompute_at_rest_fails() {
        assert!(matches!(
            recompute_deceleration(&na::Vector2::zeros(), 2.0),
            Err(Error::ZeroVelocityRecompute)
        ));
    }

    #[test]
    fn test_drift_is_checked_per_axis() {
        let target = na::Vector2::new(-2.0, 1.0);

        assert!(!drifted(&na::Vector2::new(-2.0, 1.0), &target, 0.0));
        assert!(drifted(&na::Vector2::new(-2.0, 1.5), &target, 0.0));
        assert!(drifted(&na::Vector2::new(-2.5, 1.0), &target, 0.0));
        assert!(!drifted(&na::Vector2::new(-2.05, 1.05), &target, 0.1));
        assert!(drifted(&na::Vector2::new(f32::NAN, 1.0), &target, 0.1));
    }

    #[test]
    fn test_step_applies_deceleration() {
        let (mut backend, mut body) = body((10.0, 0.0), (-2.0, 0.0));

        step_body(&mut backend, &mut body, 0.25, 0.0).unwrap();

        assert_eq!(backend.velocities[0], na::Vector2::new(9.5, 0.0));
        assert_eq!(body.previous_velocity, na::Vector2::new(9.5, 0.0));
        assert_eq!(body.target_acceleration, na::Vector2::new(-2.0, 0.0));
        assert_eq!(body.phase, BodyPhase::Stepped(DriftCheck::Recomputed));
    }

    #[test]
    fn test_no_drift_keeps_acceleration() {
        let (mut backend, mut body) = body((3.0, 4.0), (0.5, -0.25));
        // the backend changed the velocity by exactly the target acceleration
        body.previous_velocity = na::Vector2::new(2.5, 4.25);

        step_body(&mut backend, &mut body, 0.5, 0.0).unwrap();

        assert_eq!(body.target_acceleration, na::Vector2::new(0.5, -0.25));
        assert_eq!(body.phase, BodyPhase::Stepped(DriftCheck::Stable));
        assert_eq!(backend.velocities[0], na::Vector2::new(3.25, 3.875));
    }

    #[test]
    fn test_y_drift_uses_y_previous_velocity() {
        // x matches its own previous velocity, y does not
        let (mut backend, mut body) = body((5.0, 5.0), (0.0, 0.0));
        body.previous_velocity = na::Vector2::new(5.0, 7.0);
        body.deceleration = 1.0;

        step_body(&mut backend, &mut body, 1.0, 0.0).unwrap();

        assert_eq!(body.phase, BodyPhase::Stepped(DriftCheck::Recomputed));
        assert_abs_diff_eq!(body.target_acceleration.x, -(0.5f32).sqrt(), epsilon = 1e-6);
        assert_abs_diff_eq!(body.target_acceleration.y, -(0.5f32).sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_velocity_keeps_previous_acceleration() {
        let (mut backend, mut body) = body((0.0, 0.0), (-2.0, 0.0));

        step_body(&mut backend, &mut body, 0.25, 0.0).unwrap();

        assert_eq!(body.target_acceleration, na::Vector2::new(-2.0, 0.0));
        assert_eq!(body.phase, BodyPhase::Stepped(DriftCheck::AtRest));
        assert_eq!(backend.velocities[0], na::Vector2::new(-0.5, 0.0));
        assert!(body.rest_reported);
    }

    #[test]
    fn test_unknown_handle_is_fatal() {
        let (mut backend, mut body) = body((1.0, 0.0), (0.0, 0.0));
        body.handle = 3;

        assert!(matches!(
            step_body(&mut backend, &mut body, 0.25, 0.0),
            Err(Error::UnknownBody)
        ));
    }

    #[test]
    fn test_backend_interference_counts_as_drift() {
        let backend = MockBackend {
            kick: na::Vector2::new(0.0, 3.0),
            ..Default::default()
        };
        let config = SimulationConfig::default();
        let estimate = MotionEstimate {
            track: 0,
            position0: na::Point2::origin(),
            radius: 5.0,
            r_squared: (1.0, 1.0),
            confidence: crate::estimate::Confidence::Trusted {
                velocity: na::Vector2::new(10.0, 0.0),
                acceleration: na::Vector2::new(-2.0, 0.0),
            },
        };
        let mut sim = Simulation::init(backend, config, &[estimate]).unwrap();

        sim.step(0.25).unwrap();
        assert_eq!(sim.backend().velocities[0], na::Vector2::new(9.5, 3.0));

        sim.step(0.25).unwrap();
        let state = sim.body_state(0).unwrap();
        let v = na::Vector2::new(9.5, 3.0);

        assert_eq!(state.phase, BodyPhase::Stepped(DriftCheck::Recomputed));
        assert_abs_diff_eq!(state.target_acceleration.norm(), 2.0, epsilon = 1e-5);
        assert!(state.target_acceleration.dot(&v) < 0.0);
        assert_eq!(sim.frame(), 2);
    }

    #[test]
    fn test_frame_limiter_disabled() {
        let mut limiter = FrameLimiter::new(0);
        assert_eq!(limiter.tick(), Duration::ZERO);
    }

    #[test]
    fn test_run_stops_on_break() {
        let config = SimulationConfig {
            fps: 0,
            ..Default::default()
        };
        let mut sim = Simulation::new(MockBackend::default(), config);

        let mut seen = 0;
        let frames = sim
            .run(&mut |sim: &Simulation<MockBackend>| -> Result<ControlFlow<()>, Error> {
                seen += 1;
                assert_eq!(sim.frame(), seen);

                Ok(if seen == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                })
            })
            .unwrap();

        assert_eq!(frames, 3);
        assert_eq!(sim.backend().steps, 3);
    }
}
