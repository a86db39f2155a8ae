//! Narrow-phase contact tests
//!
//! Analytical sphere-vs-box, sphere-vs-circle and ray-vs-sphere tests. All
//! contacts report the surface normal pointing toward the ball center, so the
//! response code can reflect about it and push the ball out along it.

use glam::Vec3;

use super::obb::Obb;
use crate::planar;

/// Below this the center-to-surface vector is too short to normalize
const NORMAL_EPSILON: f32 = 1e-6;

/// A single contact between the ball and a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Closest point on the surface
    pub point: Vec3,
    /// Unit surface normal, pointing toward the ball center
    pub normal: Vec3,
    /// Signed distance from the ball center to `point` (negative when the
    /// center is inside the shape)
    pub distance: f32,
}

impl Contact {
    /// How far the ball overlaps the surface
    #[inline]
    pub fn penetration(&self, radius: f32) -> f32 {
        radius - self.distance
    }

    /// Ball position that clears the surface by `epsilon`
    #[inline]
    pub fn resolve(&self, position: Vec3, radius: f32, epsilon: f32) -> Vec3 {
        position + self.normal * (self.penetration(radius) + epsilon)
    }
}

/// Sphere vs oriented box
///
/// The sphere center is clamped into box-local space per axis; contact holds
/// when the clamped point is within `radius`. A center inside the box has no
/// usable direction, so the face of least penetration supplies the normal.
///
/// With `planar` set the box is treated as a prism along its local z axis
/// (table obstacles only rotate about z): the out-of-plane axis never clamps
/// and never supplies a fallback face, so normals stay in the table plane.
pub fn sphere_box_contact(center: Vec3, radius: f32, obb: &Obb, planar_only: bool) -> Option<Contact> {
    let half = obb.half_size;
    let local = obb.to_local(center);

    let mut closest = local.clamp(-half, half);
    if planar_only {
        closest.z = local.z;
    }

    let delta = local - closest;
    let dist = delta.length();
    if dist > radius {
        return None;
    }

    if dist > NORMAL_EPSILON {
        let mut normal = obb.local_vector_to_world(delta / dist);
        if planar_only {
            normal = planar(normal).normalize_or_zero();
        }
        return Some(Contact {
            point: obb.to_world(closest),
            normal,
            distance: dist,
        });
    }

    // Center inside: pick the nearest face
    let axis_count = if planar_only { 2 } else { 3 };
    let mut best_axis = 0;
    let mut best_depth = f32::MAX;
    for axis in 0..axis_count {
        let depth = half[axis] - local[axis].abs();
        if depth < best_depth {
            best_depth = depth;
            best_axis = axis;
        }
    }

    // A zero coordinate resolves to the positive face
    let sign = if local[best_axis] < 0.0 { -1.0 } else { 1.0 };
    let mut local_normal = Vec3::ZERO;
    local_normal[best_axis] = sign;
    let mut face_point = local;
    face_point[best_axis] = sign * half[best_axis];

    Some(Contact {
        point: obb.to_world(face_point),
        normal: obb.local_vector_to_world(local_normal),
        distance: -best_depth,
    })
}

/// Sphere vs circle in the table plane (bumpers, wormholes)
pub fn sphere_circle_contact(
    center: Vec3,
    radius: f32,
    circle_center: Vec3,
    circle_radius: f32,
) -> Option<Contact> {
    let delta = planar(center - circle_center);
    let dist = delta.length();
    if dist > radius + circle_radius {
        return None;
    }

    // Concentric: push straight up the table
    let normal = if dist > NORMAL_EPSILON {
        delta / dist
    } else {
        Vec3::Y
    };

    Some(Contact {
        point: planar(circle_center) + normal * circle_radius,
        normal,
        distance: dist - circle_radius,
    })
}

/// Length-bounded ray vs sphere
///
/// `dir` must be unit length. Returns the distance along the ray to the first
/// intersection, or 0 when the ray starts inside the sphere.
pub fn ray_sphere_hit(origin: Vec3, dir: Vec3, max_len: f32, center: Vec3, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(dir);
    let c = m.length_squared() - radius * radius;

    // Starts outside and points away
    if c > 0.0 && b > 0.0 {
        return None;
    }

    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }

    let t = (-b - disc.sqrt()).max(0.0);
    (t <= max_len).then_some(t)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}
