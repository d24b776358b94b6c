//! Minimal 2-D rigid-body space.
//!
//! Integrates circles and translating polygons with semi-implicit Euler and
//! resolves circle contacts against other circles, polygon edges and static
//! segments with restitution and Coulomb friction impulses. Polygons never
//! rotate and do not collide with each other or with segments. A body with
//! infinite mass ignores gravity and impulses and moves at its set velocity.

use nalgebra as na;

use crate::backend::{BodySpec, PhysicsBackend, PolygonSpec, Shape};
use crate::error::Error;
use crate::math::{closest_on_segment, point_in_polygon};

const SOLVER_ITERATIONS: usize = 4;
const CORRECTION_PERCENT: f32 = 0.8;
const CORRECTION_SLOP: f32 = 0.01;
const SEGMENT_ELASTICITY: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(u32);

#[derive(Debug, Clone)]
enum Collider {
    Circle { radius: f32 },
    Polygon { vertices: Vec<na::Vector2<f32>> },
}

#[derive(Debug, Clone)]
struct Body {
    handle: BodyHandle,
    position: na::Point2<f32>,
    velocity: na::Vector2<f32>,
    inv_mass: f32,
    elasticity: f32,
    friction: f32,
    collider: Collider,
}

impl Body {
    fn outline(&self) -> Vec<na::Point2<f32>> {
        match &self.collider {
            Collider::Polygon { vertices } => vertices.iter().map(|v| self.position + *v).collect(),
            Collider::Circle { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Segment {
    a: na::Point2<f32>,
    b: na::Point2<f32>,
    radius: f32,
    elasticity: f32,
    friction: f32,
}

/// Contact normal points from the first participant to the second.
#[derive(Debug, Clone, Copy)]
struct Contact {
    normal: na::Vector2<f32>,
    depth: f32,
}

#[derive(Debug, Clone, Copy)]
struct Material {
    inv_mass: f32,
    elasticity: f32,
    friction: f32,
}

#[inline]
fn inverse_mass(mass: f32) -> f32 {
    if mass > 0.0 && mass.is_finite() {
        1.0 / mass
    } else {
        0.0
    }
}

/// Applies normal and friction impulses to `va` and `vb` and returns the
/// positional correction to split between the two participants.
fn resolve(
    contact: Contact,
    a: Material,
    va: &mut na::Vector2<f32>,
    b: Material,
    vb: &mut na::Vector2<f32>,
) -> na::Vector2<f32> {
    let inv_sum = a.inv_mass + b.inv_mass;
    if inv_sum <= 0.0 {
        return na::Vector2::zeros();
    }

    let n = contact.normal;
    let rel = *vb - *va;
    let vn = rel.dot(&n);

    if vn < 0.0 {
        let e = a.elasticity * b.elasticity;
        let j = -(1.0 + e) * vn / inv_sum;

        *va -= n * (j * a.inv_mass);
        *vb += n * (j * b.inv_mass);

        let rel = *vb - *va;
        let tangent = rel - n * rel.dot(&n);
        if let Some(t) = na::Unit::try_new(tangent, f32::EPSILON) {
            let t = t.into_inner();
            let mu = (a.friction * b.friction).max(0.0);
            let jt = (-rel.dot(&t) / inv_sum).clamp(-mu * j, mu * j);

            *va -= t * (jt * a.inv_mass);
            *vb += t * (jt * b.inv_mass);
        }
    }

    n * ((contact.depth - CORRECTION_SLOP).max(0.0) / inv_sum * CORRECTION_PERCENT)
}

fn circle_circle(
    pa: na::Point2<f32>,
    ra: f32,
    pb: na::Point2<f32>,
    rb: f32,
) -> Option<Contact> {
    let d = pb - pa;
    let dist = d.norm();
    let depth = ra + rb - dist;

    if depth <= 0.0 {
        return None;
    }

    let normal = if dist > f32::EPSILON {
        d / dist
    } else {
        na::Vector2::new(1.0, 0.0)
    };

    Some(Contact { normal, depth })
}

/// Contact from the closest point of an edge set to a circle.
fn edges_circle(
    outline: &[na::Point2<f32>],
    closed: bool,
    thickness: f32,
    center: na::Point2<f32>,
    radius: f32,
) -> Option<Contact> {
    let n = outline.len();
    let edges = if closed { n } else { n.saturating_sub(1) };

    let closest = (0..edges)
        .map(|i| closest_on_segment(center, outline[i], outline[(i + 1) % n]))
        .min_by(|p, q| {
            na::distance_squared(p, &center)
                .partial_cmp(&na::distance_squared(q, &center))
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    let d = center - closest;
    let dist = d.norm();
    let inside = closed && point_in_polygon(center, outline);

    let (normal, depth) = if inside {
        (-d / dist.max(f32::EPSILON), radius + thickness + dist)
    } else {
        if dist <= f32::EPSILON {
            return None;
        }
        (d / dist, radius + thickness - dist)
    };

    if depth <= 0.0 {
        return None;
    }

    Some(Contact { normal, depth })
}

#[derive(Debug, Clone)]
pub struct Space {
    gravity: na::Vector2<f32>,
    bodies: Vec<Body>,
    segments: Vec<Segment>,
    next_id: u32,
}

impl Space {
    pub fn new(gravity: na::Vector2<f32>) -> Self {
        Self {
            gravity,
            bodies: Vec::with_capacity(16),
            segments: Vec::new(),
            next_id: 1,
        }
    }

    #[inline]
    pub fn gravity(&self) -> na::Vector2<f32> {
        self.gravity
    }

    #[inline]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn insert(&mut self, mut body: Body) -> BodyHandle {
        let handle = BodyHandle(self.next_id);
        self.next_id += 1;

        body.handle = handle;
        self.bodies.push(body);

        handle
    }

    fn index_of(&self, handle: BodyHandle) -> Result<usize, Error> {
        self.bodies
            .iter()
            .position(|b| b.handle == handle)
            .ok_or(Error::UnknownBody)
    }

    fn solve_bodies(&mut self, i: usize, j: usize) {
        let (left, right) = self.bodies.split_at_mut(j);
        let (a, b) = (&mut left[i], &mut right[0]);

        let contact = match (&a.collider, &b.collider) {
            (Collider::Circle { radius: ra }, Collider::Circle { radius: rb }) => {
                circle_circle(a.position, *ra, b.position, *rb)
            }
            (Collider::Polygon { .. }, Collider::Circle { radius }) => {
                edges_circle(&a.outline(), true, 0.0, b.position, *radius)
            }
            (Collider::Circle { radius }, Collider::Polygon { .. }) => {
                edges_circle(&b.outline(), true, 0.0, a.position, *radius).map(|c| Contact {
                    normal: -c.normal,
                    depth: c.depth,
                })
            }
            (Collider::Polygon { .. }, Collider::Polygon { .. }) => None,
        };

        if let Some(contact) = contact {
            let ma = Material {
                inv_mass: a.inv_mass,
                elasticity: a.elasticity,
                friction: a.friction,
            };
            let mb = Material {
                inv_mass: b.inv_mass,
                elasticity: b.elasticity,
                friction: b.friction,
            };

            let correction = resolve(contact, ma, &mut a.velocity, mb, &mut b.velocity);
            a.position -= correction * a.inv_mass;
            b.position += correction * b.inv_mass;
        }
    }

    fn solve_segments(&mut self, i: usize) {
        let body = &mut self.bodies[i];
        let radius = match body.collider {
            Collider::Circle { radius } => radius,
            Collider::Polygon { .. } => return,
        };

        for seg in &self.segments {
            let contact = edges_circle(&[seg.a, seg.b], false, seg.radius, body.position, radius);

            if let Some(contact) = contact {
                let static_side = Material {
                    inv_mass: 0.0,
                    elasticity: seg.elasticity,
                    friction: seg.friction,
                };
                let dynamic_side = Material {
                    inv_mass: body.inv_mass,
                    elasticity: body.elasticity,
                    friction: body.friction,
                };

                let mut still = na::Vector2::zeros();
                let correction =
                    resolve(contact, static_side, &mut still, dynamic_side, &mut body.velocity);
                body.position += correction * body.inv_mass;
            }
        }
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new(na::Vector2::zeros())
    }
}

impl PhysicsBackend for Space {
    type Handle = BodyHandle;

    fn set_gravity(&mut self, gravity: na::Vector2<f32>) {
        self.gravity = gravity;
    }

    fn create_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, Error> {
        let collider = match spec.shape {
            Shape::Circle => Collider::Circle {
                radius: spec.radius,
            },
        };

        Ok(self.insert(Body {
            handle: BodyHandle(0),
            position: spec.position,
            velocity: spec.velocity,
            inv_mass: inverse_mass(spec.mass),
            elasticity: spec.elasticity,
            friction: spec.friction,
            collider,
        }))
    }

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), Error> {
        let idx = self.index_of(handle)?;
        self.bodies.remove(idx);

        Ok(())
    }

    fn position(&self, handle: BodyHandle) -> Result<na::Point2<f32>, Error> {
        Ok(self.bodies[self.index_of(handle)?].position)
    }

    fn velocity(&self, handle: BodyHandle) -> Result<na::Vector2<f32>, Error> {
        Ok(self.bodies[self.index_of(handle)?].velocity)
    }

    fn set_velocity(
        &mut self,
        handle: BodyHandle,
        velocity: na::Vector2<f32>,
    ) -> Result<(), Error> {
        let idx = self.index_of(handle)?;
        self.bodies[idx].velocity = velocity;

        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), Error> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::Backend(format!("invalid time step {}", dt)));
        }

        let gravity = self.gravity;
        for body in self.bodies.iter_mut() {
            // infinite mass bodies are kinematic: they keep their velocity
            if body.inv_mass > 0.0 {
                body.velocity += gravity * dt;
            }
            body.position += body.velocity * dt;
        }

        let n = self.bodies.len();
        for _ in 0..SOLVER_ITERATIONS {
            for i in 0..n {
                for j in i + 1..n {
                    self.solve_bodies(i, j);
                }
                self.solve_segments(i);
            }
        }

        Ok(())
    }

    fn add_segment(
        &mut self,
        a: na::Point2<f32>,
        b: na::Point2<f32>,
        thickness: f32,
        friction: f32,
    ) -> Result<(), Error> {
        self.segments.push(Segment {
            a,
            b,
            radius: thickness,
            elasticity: SEGMENT_ELASTICITY,
            friction,
        });

        Ok(())
    }

    fn add_polygon(&mut self, spec: &PolygonSpec) -> Result<BodyHandle, Error> {
        if spec.vertices.len() < 3 {
            return Err(Error::InsufficientSamples {
                got: spec.vertices.len(),
                required: 3,
            });
        }

        Ok(self.insert(Body {
            handle: BodyHandle(0),
            position: spec.position,
            velocity: spec.velocity,
            inv_mass: inverse_mass(spec.mass),
            elasticity: 0.0,
            friction: spec.friction,
            collider: Collider::Polygon {
                vertices: spec.vertices.clone(),
            },
        }))
    }
}
