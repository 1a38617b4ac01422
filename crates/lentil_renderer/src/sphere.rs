//! Unit sphere: radius 0.5 centered at the object-space origin.

use lentil_math::Vec3;
use std::f32::consts::PI;

use crate::shape::closest_root;

const RADIUS: f32 = 0.5;

/// Nearest non-negative ray parameter, or `None` on a miss.
pub fn intersect(origin: Vec3, direction: Vec3) -> Option<f32> {
    let a = direction.length_squared();
    let b = 2.0 * origin.dot(direction);
    let c = origin.length_squared() - RADIUS * RADIUS;

    let (t0, t1) = solve_quadratic(a, b, c)?;
    closest_root([t0, t1])
}

/// Outward normal at an object-space point on the surface.
pub fn normal(p: Vec3) -> Vec3 {
    p.try_normalize().unwrap_or(Vec3::Y)
}

/// Spherical unwrap: longitude around Y for u, latitude for v.
pub fn uv(p: Vec3) -> (f32, f32) {
    let u = longitude_u(p);
    let v = (2.0 * p.y).clamp(-1.0, 1.0).asin() / PI + 0.5;
    (u, v)
}

pub fn surface_area() -> f32 {
    4.0 * PI * RADIUS * RADIUS
}

/// Longitude around the Y axis mapped to [0, 1], increasing clockwise seen
/// from above. Shared by every primitive with a round lateral surface.
pub(crate) fn longitude_u(p: Vec3) -> f32 {
    let theta = p.z.atan2(p.x);
    if theta >= 0.0 {
        1.0 - theta / (2.0 * PI)
    } else {
        -theta / (2.0 * PI)
    }
}

/// Real roots of `a t^2 + b t + c`, smallest first.
pub(crate) fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a.abs() < f32::EPSILON {
        return None;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();
    let t0 = (-b - sqrtd) / (2.0 * a);
    let t1 = (-b + sqrtd) / (2.0 * a);
    Some((t0.min(t1), t0.max(t1)))
}
