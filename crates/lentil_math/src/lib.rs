// Re-export glam for convenience
pub use glam::*;

// Lentil math types
mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::Ray;
pub use transform::{transform_normal, Mat4Ext};

/// Reflect `v` about the normal `n` (`n` must be unit length).
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Linear interpolation between two scalars.
#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
