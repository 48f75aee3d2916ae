//! parry3d-backed terrain containing static and moving bodies.
//!
//! Bodies keep their source geometry so they can be re-posed and re-scaled
//! at runtime (moving platforms). Scale is baked into the parry shape,
//! rotation and translation live in the isometry.

use glam::{Quat, Vec3};
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::na::{Quaternion, Translation3, UnitQuaternion};
use parry3d::query::{contact, intersection_test, Ray, RayCast};
use parry3d::shape::SharedShape;

use crate::error::TerrainError;

use super::flags::{BodyId, LayerMask};
use super::hit::{QueryFilter, SurfaceTag, Sweep, TerrainHit};
use super::query::{lift_clear, TerrainQuery};
use super::shape::{BodyPose, ColliderShape};

/// Penetration depth below which shapes are considered touching, not overlapping.
const CONTACT_SKIN: f32 = 0.001;

/// Binary search steps for sweeps (~0.025% precision).
const SWEEP_ITERATIONS: usize = 12;

/// Upper bound on coarse steps in one sweep.
const MAX_SWEEP_STEPS: usize = 256;

#[derive(Debug, Clone)]
enum Geometry {
    Cuboid(Vec3),
    Hull(Vec<Vec3>),
    Mesh {
        vertices: Vec<Vec3>,
        indices: Vec<[u32; 3]>,
    },
}

/// A single piece of terrain.
#[derive(Debug, Clone)]
pub struct TerrainBody {
    pub id: BodyId,
    pub layers: LayerMask,
    pub tag: Option<SurfaceTag>,
    pose: BodyPose,
    geometry: Geometry,
    shape: SharedShape,
    isometry: Isometry<Real>,
}

impl TerrainBody {
    pub fn pose(&self) -> BodyPose {
        self.pose
    }
}

/// The terrain: every body the character can probe, stand on or climb.
#[derive(Debug, Default)]
pub struct TerrainWorld {
    bodies: Vec<TerrainBody>,
    next_id: u32,
}

impl TerrainWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis-aligned solid box.
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3) -> BodyId {
        self.insert(
            Geometry::Cuboid(half_extents),
            BodyPose::at(center),
            LayerMask::SOLID,
            None,
        )
    }

    /// Add an axis-aligned box carrying a surface tag ("Ladder", "Platform").
    pub fn add_tagged_box(&mut self, center: Vec3, half_extents: Vec3, tag: &str) -> BodyId {
        self.insert(
            Geometry::Cuboid(half_extents),
            BodyPose::at(center),
            LayerMask::SOLID,
            Some(SurfaceTag::new(tag)),
        )
    }

    /// Add a box with an arbitrary pose and layer.
    pub fn add_oriented_box(
        &mut self,
        half_extents: Vec3,
        pose: BodyPose,
        layers: LayerMask,
        tag: Option<&str>,
    ) -> BodyId {
        self.insert(
            Geometry::Cuboid(half_extents),
            pose,
            layers,
            tag.map(SurfaceTag::new),
        )
    }

    /// Add a liquid volume. Ground probes pass straight through these.
    pub fn add_liquid(&mut self, center: Vec3, half_extents: Vec3) -> BodyId {
        self.insert(
            Geometry::Cuboid(half_extents),
            BodyPose::at(center),
            LayerMask::LIQUID,
            None,
        )
    }

    /// Add a convex hull in world space.
    pub fn add_convex_hull(&mut self, points: &[Vec3], layers: LayerMask) -> Result<BodyId, TerrainError> {
        if build_shape(&Geometry::Hull(points.to_vec()), Vec3::ONE).is_err() {
            return Err(TerrainError::InvalidHull(points.len()));
        }
        Ok(self.insert(Geometry::Hull(points.to_vec()), BodyPose::IDENTITY, layers, None))
    }

    /// Add a triangle mesh in world space.
    pub fn add_triangle_mesh(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u32; 3]],
        layers: LayerMask,
        tag: Option<&str>,
    ) -> Result<BodyId, TerrainError> {
        let geometry = Geometry::Mesh {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
        };
        let shape = build_shape(&geometry, Vec3::ONE)?;
        let id = self.allocate_id();
        self.bodies.push(TerrainBody {
            id,
            layers,
            tag: tag.map(SurfaceTag::new),
            pose: BodyPose::IDENTITY,
            geometry,
            shape,
            isometry: Isometry::identity(),
        });
        Ok(id)
    }

    /// Move a body. Used to animate platforms.
    pub fn set_translation(&mut self, id: BodyId, translation: Vec3) -> Result<(), TerrainError> {
        let body = self.body_mut(id)?;
        body.pose.translation = translation;
        body.isometry = to_isometry(translation, body.pose.rotation);
        Ok(())
    }

    /// Replace the whole pose of a body, rebuilding its shape if the scale changed.
    pub fn set_pose(&mut self, id: BodyId, pose: BodyPose) -> Result<(), TerrainError> {
        let body = self.body_mut(id)?;
        if body.pose.scale != pose.scale {
            body.shape = build_shape(&body.geometry, pose.scale)?;
        }
        body.pose = pose;
        body.isometry = to_isometry(pose.translation, pose.rotation);
        Ok(())
    }

    pub fn set_scale(&mut self, id: BodyId, scale: Vec3) -> Result<(), TerrainError> {
        let pose = BodyPose {
            scale,
            ..self.body(id).ok_or(TerrainError::UnknownBody(id))?.pose
        };
        self.set_pose(id, pose)
    }

    pub fn remove(&mut self, id: BodyId) -> Result<(), TerrainError> {
        let index = self
            .bodies
            .iter()
            .position(|b| b.id == id)
            .ok_or(TerrainError::UnknownBody(id))?;
        self.bodies.remove(index);
        Ok(())
    }

    pub fn body(&self, id: BodyId) -> Option<&TerrainBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn allocate_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(
        &mut self,
        geometry: Geometry,
        pose: BodyPose,
        layers: LayerMask,
        tag: Option<SurfaceTag>,
    ) -> BodyId {
        let shape = match &geometry {
            Geometry::Cuboid(half) => cuboid(*half * pose.scale),
            _ => match build_shape(&geometry, pose.scale) {
                Ok(shape) => shape,
                Err(_) => SharedShape::ball(0.001),
            },
        };
        let id = self.allocate_id();
        self.bodies.push(TerrainBody {
            id,
            layers,
            tag,
            pose,
            geometry,
            shape,
            isometry: to_isometry(pose.translation, pose.rotation),
        });
        id
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut TerrainBody, TerrainError> {
        self.bodies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(TerrainError::UnknownBody(id))
    }

    /// Bodies the collider, inset by the contact skin, intersects with its feet at `position`.
    fn overlapping<'a>(
        &'a self,
        probe_shape: &'a SharedShape,
        position: Vec3,
        shape: &'a ColliderShape,
        filter: &'a QueryFilter,
    ) -> impl Iterator<Item = &'a TerrainBody> + 'a {
        let probe_iso = character_isometry(shape, position);
        self.bodies.iter().filter(move |body| {
            filter.accepts(body.id, body.layers)
                && intersection_test(&probe_iso, probe_shape.as_ref(), &body.isometry, body.shape.as_ref())
                    .unwrap_or(false)
        })
    }

    /// Closest surface among `bodies` for a collider resting clear of them at `position`.
    ///
    /// The collider is separated here, so the normal comes from closest
    /// points rather than a penetration estimate.
    fn impact<'a>(
        &self,
        probe_shape: &SharedShape,
        shape: &ColliderShape,
        position: Vec3,
        bodies: &[&'a TerrainBody],
        reach: f32,
    ) -> Option<(&'a TerrainBody, Vec3, Vec3)> {
        let probe_iso = character_isometry(shape, position);
        let mut closest: Option<(f32, &'a TerrainBody, Vec3, Vec3)> = None;
        for body in bodies {
            let Ok(Some(c)) = contact(
                &probe_iso,
                probe_shape.as_ref(),
                &body.isometry,
                body.shape.as_ref(),
                reach,
            ) else {
                continue;
            };
            if closest.as_ref().map_or(true, |(dist, ..)| c.dist < *dist) {
                let point = Vec3::new(c.point2.x, c.point2.y, c.point2.z);
                let normal = Vec3::new(c.normal2.x, c.normal2.y, c.normal2.z);
                closest = Some((c.dist, *body, point, normal));
            }
        }
        closest.map(|(_, body, point, normal)| (body, point, normal))
    }

    /// Push a penetrating collider out along the contact normals.
    fn push_out(&self, probe_shape: &SharedShape, shape: &ColliderShape, position: Vec3, filter: &QueryFilter) -> Vec3 {
        let probe_iso = character_isometry(shape, position);
        let mut correction = Vec3::ZERO;
        for body in self.overlapping(probe_shape, position, shape, filter) {
            if let Ok(Some(c)) = contact(&probe_iso, probe_shape.as_ref(), &body.isometry, body.shape.as_ref(), 0.0) {
                let depth = -c.dist;
                if depth > 0.0 {
                    let normal = Vec3::new(c.normal2.x, c.normal2.y, c.normal2.z);
                    correction += normal * (depth + CONTACT_SKIN);
                }
            }
        }
        position + correction
    }
}

impl TerrainQuery for TerrainWorld {
    fn probe_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: &QueryFilter,
    ) -> Option<TerrainHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO || max_distance <= 0.0 {
            return None;
        }

        let ray = Ray::new(
            Point::new(origin.x, origin.y, origin.z),
            Vector::new(dir.x, dir.y, dir.z),
        );

        let mut closest: Option<(f32, &TerrainBody)> = None;
        for body in &self.bodies {
            if !filter.accepts(body.id, body.layers) {
                continue;
            }
            // Origins inside a body do not report that body.
            if let Some(toi) = body.shape.cast_ray(&body.isometry, &ray, max_distance, true) {
                if toi <= 0.0 || toi > max_distance {
                    continue;
                }
                if closest.map_or(true, |(best, _)| toi < best) {
                    closest = Some((toi, body));
                }
            }
        }

        let (distance, body) = closest?;
        let normal = body
            .shape
            .cast_ray_and_get_normal(&body.isometry, &ray, distance + 0.01, true)
            .map(|i| Vec3::new(i.normal.x, i.normal.y, i.normal.z))
            .unwrap_or(-dir);

        Some(TerrainHit {
            point: origin + dir * distance,
            normal,
            distance,
            body: body.id,
            tag: body.tag.clone(),
            layers: body.layers,
        })
    }

    fn sweep(&self, shape: &ColliderShape, start: Vec3, end: Vec3, filter: &QueryFilter) -> Sweep {
        let probe_shape = inset_shape(shape);
        let solid_at = |position: Vec3| self.overlapping(&probe_shape, position, shape, filter).next().is_some();

        let started_in_solid = solid_at(start);
        let delta = end - start;
        let length = delta.length();
        if length < 1e-4 || (started_in_solid && !solid_at(end)) {
            return Sweep {
                started_in_solid,
                ..Sweep::clear(end)
            };
        }

        // Step no further than half the collider's radius so nothing thinner is skipped
        let step = (shape.radius() * 0.5).max(0.01);
        let steps = ((length / step).ceil() as usize).clamp(1, MAX_SWEEP_STEPS);
        let mut lo = 0.0_f32;
        let mut hi = if started_in_solid { Some(0.0) } else { None };
        if hi.is_none() {
            for i in 1..=steps {
                let t = i as f32 / steps as f32;
                if solid_at(start + delta * t) {
                    hi = Some(t);
                    break;
                }
                lo = t;
            }
        }
        let Some(mut hi) = hi else {
            return Sweep::clear(end);
        };

        for _ in 0..SWEEP_ITERATIONS {
            if hi - lo < 1e-6 {
                break;
            }
            let mid = (lo + hi) * 0.5;
            if solid_at(start + delta * mid) {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let end_position = start + delta * lo;
        let blocking: Vec<&TerrainBody> = self
            .overlapping(&probe_shape, start + delta * hi, shape, filter)
            .collect();
        let reach = CONTACT_SKIN * 2.0 + length * (hi - lo);
        let direction = delta / length;
        let hit = self
            .impact(&probe_shape, shape, end_position, &blocking, reach)
            .or_else(|| blocking.first().map(|body| (*body, end_position, -direction)))
            .map(|(body, point, normal)| TerrainHit {
                point,
                normal,
                distance: length * lo,
                body: body.id,
                tag: body.tag.clone(),
                layers: body.layers,
            });

        Sweep {
            fraction: lo,
            end_position,
            hit,
            started_in_solid,
        }
    }

    fn overlaps(&self, shape: &ColliderShape, position: Vec3, filter: &QueryFilter) -> bool {
        let probe_shape = inset_shape(shape);
        let hit = self.overlapping(&probe_shape, position, shape, filter).next().is_some();
        hit
    }

    fn resolve_penetration(&self, shape: &ColliderShape, position: Vec3, filter: &QueryFilter) -> Vec3 {
        let probe_shape = inset_shape(shape);
        let pushed = self.push_out(&probe_shape, shape, position, filter);
        if !self.overlaps(shape, pushed, filter) {
            return pushed;
        }
        lift_clear(self, shape, position, filter)
    }

    fn body_pose(&self, body: BodyId) -> Option<BodyPose> {
        self.body(body).map(|b| b.pose)
    }
}

fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    let q = UnitQuaternion::new_normalize(Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z));
    Isometry::from_parts(Translation3::new(translation.x, translation.y, translation.z), q)
}

fn cuboid(half: Vec3) -> SharedShape {
    let half = half.abs().max(Vec3::splat(0.0005));
    SharedShape::cuboid(half.x, half.y, half.z)
}

fn build_shape(geometry: &Geometry, scale: Vec3) -> Result<SharedShape, TerrainError> {
    let to_point = |v: &Vec3| {
        let s = *v * scale;
        Point::new(s.x, s.y, s.z)
    };
    match geometry {
        Geometry::Cuboid(half) => Ok(cuboid(*half * scale)),
        Geometry::Hull(points) => {
            let points: Vec<Point<Real>> = points.iter().map(to_point).collect();
            SharedShape::convex_hull(&points).ok_or(TerrainError::InvalidHull(points.len()))
        }
        Geometry::Mesh { vertices, indices } => {
            let vertices: Vec<Point<Real>> = vertices.iter().map(to_point).collect();
            SharedShape::trimesh(vertices, indices.clone())
                .map_err(|e| TerrainError::InvalidMesh(format!("{e:?}")))
        }
    }
}

/// The character collider shrunk by the contact skin, so resting contact is not overlap.
fn inset_shape(shape: &ColliderShape) -> SharedShape {
    match *shape {
        ColliderShape::Capsule { radius, height } => {
            let half_cylinder = (height - 2.0 * radius).max(0.0) / 2.0;
            SharedShape::capsule_y(half_cylinder, (radius - CONTACT_SKIN).max(CONTACT_SKIN))
        }
        ColliderShape::Sphere { radius } => SharedShape::ball((radius - CONTACT_SKIN).max(CONTACT_SKIN)),
        ColliderShape::Box { half_extents } => cuboid(half_extents - Vec3::splat(CONTACT_SKIN)),
    }
}

fn character_isometry(shape: &ColliderShape, feet: Vec3) -> Isometry<Real> {
    Isometry::translation(feet.x, feet.y + shape.center_offset(), feet.z)
}

// ============================================================================
// Tests
// ============================================================================
