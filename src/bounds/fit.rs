//! Sphere fitting for point sets.
//!
//! [`FitMode::Fast`] centres the sphere on the AABB. [`FitMode::OptimizedPrincipalAxis`]
//! seeds the sphere from the extreme points along the dominant axis of the
//! covariance matrix, grows it Ritter-style over all points, then runs a few
//! shrink-and-regrow passes keeping the smallest enclosing result.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::{BoundingBox, BoundingSphere};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitMode {
    Fast,
    #[default]
    OptimizedPrincipalAxis,
}

/// Fits a sphere enclosing a point set. `None` for an empty set.
pub trait SphereFitter: Send + Sync {
    fn fit(&self, points: &[Vec3], mode: FitMode) -> Option<BoundingSphere>;
}

#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxisFitter {
    /// Shrink-and-regrow passes in optimized mode.
    pub refine_iterations: u32,
    /// Power iteration steps for the dominant eigenvector.
    pub power_iterations: u32,
}

impl Default for PrincipalAxisFitter {
    fn default() -> Self {
        Self {
            refine_iterations: 8,
            power_iterations: 32,
        }
    }
}

impl SphereFitter for PrincipalAxisFitter {
    fn fit(&self, points: &[Vec3], mode: FitMode) -> Option<BoundingSphere> {
        if points.is_empty() {
            return None;
        }
        let sphere = match mode {
            FitMode::Fast => aabb_sphere(points),
            FitMode::OptimizedPrincipalAxis => {
                let mut best = ritter_grow(self.principal_axis_sphere(points), points, 0);
                for pass in 0..self.refine_iterations {
                    let shrunk = BoundingSphere {
                        center: best.center,
                        radius: best.radius * 0.95,
                    };
                    let offset = (pass as usize + 1) * points.len() / (self.refine_iterations as usize + 1);
                    let candidate = ritter_grow(shrunk, points, offset);
                    if candidate.radius < best.radius {
                        best = candidate;
                    }
                }
                best
            }
        };
        Some(sphere)
    }
}

impl PrincipalAxisFitter {
    /// Sphere spanning the two extreme points along the dominant axis.
    fn principal_axis_sphere(&self, points: &[Vec3]) -> BoundingSphere {
        let axis = self.dominant_axis(points);

        let mut min = (f32::INFINITY, points[0]);
        let mut max = (f32::NEG_INFINITY, points[0]);
        for &p in points {
            let t = p.dot(axis);
            if t < min.0 {
                min = (t, p);
            }
            if t > max.0 {
                max = (t, p);
            }
        }

        BoundingSphere {
            center: (min.1 + max.1) * 0.5,
            radius: min.1.distance(max.1) * 0.5,
        }
    }

    fn dominant_axis(&self, points: &[Vec3]) -> Vec3 {
        let covariance = covariance(points);

        // seed with the longest column so the seed is never orthogonal to
        // the dominant eigenvector of a non-zero covariance
        let mut axis = [covariance.x_axis, covariance.y_axis, covariance.z_axis]
            .into_iter()
            .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
            .unwrap_or(Vec3::X);
        if axis.length_squared() <= f32::EPSILON * f32::EPSILON {
            return Vec3::X;
        }
        axis = axis.normalize();

        for _ in 0..self.power_iterations {
            let next = covariance * axis;
            let len = next.length();
            if len <= f32::EPSILON {
                break;
            }
            axis = next / len;
        }
        axis
    }
}

fn covariance(points: &[Vec3]) -> Mat3 {
    let inv_n = 1.0 / points.len() as f32;
    let mean = points.iter().copied().sum::<Vec3>() * inv_n;

    let mut cov = Mat3::ZERO;
    for &p in points {
        let d = p - mean;
        cov += Mat3::from_cols(d * d.x, d * d.y, d * d.z);
    }
    cov * inv_n
}

/// Grows `sphere` to enclose every point, visiting from `offset` and wrapping.
fn ritter_grow(mut sphere: BoundingSphere, points: &[Vec3], offset: usize) -> BoundingSphere {
    let n = points.len();
    for i in 0..n {
        let p = points[(offset + i) % n];
        let d = p.distance(sphere.center);
        if d > sphere.radius {
            let new_radius = (sphere.radius + d) * 0.5;
            let shift = new_radius - sphere.radius;
            sphere.center += (p - sphere.center) / d * shift;
            sphere.radius = new_radius;
        }
    }
    sphere
}

fn aabb_sphere(points: &[Vec3]) -> BoundingSphere {
    let center = BoundingBox::from_points(points).map_or(points[0], |aabb| aabb.center());
    let radius = points
        .iter()
        .map(|p| p.distance_squared(center))
        .fold(0.0_f32, f32::max)
        .sqrt();
    BoundingSphere { center, radius }
}
