//! Oriented bounding boxes
//!
//! Every box-shaped object (walls, ramps, flippers, the plunger) is described
//! by local half extents and a world transform. The broad phase works on the
//! resulting oriented box; the narrow phase uses its local frame.

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

/// Slack added to the rotation terms so near-parallel edge pairs cannot
/// produce a false separating axis.
const SAT_EPSILON: f32 = 1e-6;

/// A box with arbitrary rotation in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: Vec3,
    /// Half extents along each local axis (world units, scale applied)
    pub half_size: Vec3,
    /// Local x, y, z axes in world space (orthonormal)
    pub axes: [Vec3; 3],
}

impl Obb {
    /// Build from local half extents and the object's world transform
    ///
    /// The local box is centered on the object's origin. Scale may be
    /// non-uniform; it is folded into the half extents.
    pub fn from_transform(half_extents: Vec3, transform: &Affine3A) -> Self {
        let (scale, rotation, translation) = transform.to_scale_rotation_translation();
        Self {
            center: translation,
            half_size: half_extents * scale.abs(),
            axes: [rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z],
        }
    }

    /// Axis-aligned box (used for the ball's broad-phase volume)
    pub fn axis_aligned(center: Vec3, half_size: Vec3) -> Self {
        Self {
            center,
            half_size,
            axes: [Vec3::X, Vec3::Y, Vec3::Z],
        }
    }

    /// World point to box-local coordinates
    #[inline]
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        let d = point - self.center;
        Vec3::new(d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2]))
    }

    /// Box-local point to world coordinates
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.center + self.local_vector_to_world(local)
    }

    /// Box-local direction to world space
    #[inline]
    pub fn local_vector_to_world(&self, v: Vec3) -> Vec3 {
        self.axes[0] * v.x + self.axes[1] * v.y + self.axes[2] * v.z
    }

    /// Closest point on (or in) the box to a world point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let local = self.to_local(point).clamp(-self.half_size, self.half_size);
        self.to_world(local)
    }

    /// Whether a world point lies inside the box
    pub fn contains(&self, point: Vec3) -> bool {
        let local = self.to_local(point).abs();
        local.cmple(self.half_size).all()
    }

    /// Separating-axis overlap test
    ///
    /// Candidate axes: the three face normals of each box and the nine cross
    /// products of their edges. Touching boxes count as overlapping.
    pub fn intersects(&self, other: &Obb) -> bool {
        let ea = self.half_size.to_array();
        let eb = other.half_size.to_array();

        // Rotation expressing `other` in `self`'s frame
        let mut r = [[0.0f32; 3]; 3];
        let mut abs_r = [[0.0f32; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                r[i][j] = self.axes[i].dot(other.axes[j]);
                abs_r[i][j] = r[i][j].abs() + SAT_EPSILON;
            }
        }

        let d = other.center - self.center;
        let t = [d.dot(self.axes[0]), d.dot(self.axes[1]), d.dot(self.axes[2])];

        // self's face normals
        for i in 0..3 {
            let ra = ea[i];
            let rb = eb[0] * abs_r[i][0] + eb[1] * abs_r[i][1] + eb[2] * abs_r[i][2];
            if t[i].abs() > ra + rb {
                return false;
            }
        }

        // other's face normals
        for j in 0..3 {
            let ra = ea[0] * abs_r[0][j] + ea[1] * abs_r[1][j] + ea[2] * abs_r[2][j];
            let rb = eb[j];
            let tj = t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j];
            if tj.abs() > ra + rb {
                return false;
            }
        }

        // Edge-edge cross products
        for i in 0..3 {
            let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
            for j in 0..3 {
                let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
                let ra = ea[i1] * abs_r[i2][j] + ea[i2] * abs_r[i1][j];
                let rb = eb[j1] * abs_r[i][j2] + eb[j2] * abs_r[i][j1];
                let tl = t[i2] * r[i1][j] - t[i1] * r[i2][j];
                if tl.abs() > ra + rb {
                    return false;
                }
            }
        }

        true
    }
}
