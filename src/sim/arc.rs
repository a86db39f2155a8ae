//! Curved corner wall
//!
//! The arc is a polyline approximating part of a circle:
//! - center: the arc's logical center in the table plane
//! - radius: every polyline vertex lies on this circle
//! - theta_start, theta_end: angular extent, counter-clockwise
//!
//! The ball travels on the concave side, so the surface normal points from
//! the wall toward the center.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::{Contact, ray_sphere_hit};
use crate::{planar, polar_to_planar};

/// A circular wall approximated by straight segments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcWall {
    pub center: Vec3,
    pub radius: f32,
    pub theta_start: f32,
    pub theta_end: f32,
    /// Polyline vertices from theta_start to theta_end
    pub points: Vec<Vec3>,
}

impl ArcWall {
    pub fn new(center: Vec3, radius: f32, theta_start: f32, theta_end: f32, segments: usize) -> Self {
        let segments = segments.max(1);
        let span = theta_end - theta_start;
        let points = (0..=segments)
            .map(|i| {
                let theta = theta_start + span * i as f32 / segments as f32;
                center + polar_to_planar(radius, theta)
            })
            .collect();

        Self {
            center,
            radius,
            theta_start,
            theta_end,
            points,
        }
    }

    /// Angular span of the arc
    #[inline]
    pub fn angular_span(&self) -> f32 {
        (self.theta_end - self.theta_start).abs()
    }

    /// Number of straight segments
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Consecutive vertex pairs
    pub fn segments(&self) -> impl Iterator<Item = (Vec3, Vec3)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    /// Distance from the center to each segment's midpoint (the polyline's
    /// inscribed radius)
    pub fn inscribed_radius(&self) -> f32 {
        let half_step = self.angular_span() / self.segment_count().max(1) as f32 / 2.0;
        self.radius * half_step.cos()
    }

    /// Ray-based contact test
    ///
    /// Casts a ray along each segment, bounded by the segment length, and
    /// checks it against the ball. The normal of any hit runs from the ball
    /// toward the logical center (in-plane).
    pub fn ray_contact(&self, ball_pos: Vec3, ball_radius: f32) -> Option<Contact> {
        for (start, end) in self.segments() {
            let along = end - start;
            let len = along.length();
            if len < 1e-6 {
                continue;
            }
            let dir = along / len;

            if let Some(t) = ray_sphere_hit(start, dir, len, ball_pos, ball_radius) {
                let point = start + dir * t;
                let normal = planar(self.center - ball_pos).normalize_or_zero();
                if normal == Vec3::ZERO {
                    continue;
                }
                return Some(Contact {
                    point,
                    normal,
                    distance: (ball_pos - point).length(),
                });
            }
        }
        None
    }
}
