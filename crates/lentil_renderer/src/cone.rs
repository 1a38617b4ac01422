//! Unit cone: apex at y = 0.5, base of radius 0.5 at y = -0.5.

use lentil_math::Vec3;
use std::f32::consts::PI;

use crate::cylinder::cap_or_lateral_uv;
use crate::shape::{closest_root, CAP_EPSILON};
use crate::sphere::solve_quadratic;

const RADIUS: f32 = 0.5;
const HALF_HEIGHT: f32 = 0.5;

/// Squared slope r^2 / h^2 of the lateral surface.
const K: f32 = (RADIUS * RADIUS) / (4.0 * HALF_HEIGHT * HALF_HEIGHT);

/// Nearest non-negative ray parameter over the lateral surface and base.
pub fn intersect(origin: Vec3, direction: Vec3) -> Option<f32> {
    let mut roots = [f32::NAN; 3];

    // x^2 + z^2 = k (y - 0.5)^2, restricted to the lower nappe
    let (o, d) = (origin, direction);
    let a = d.x * d.x + d.z * d.z - K * d.y * d.y;
    let b = 2.0 * (o.x * d.x + o.z * d.z - K * o.y * d.y + 0.5 * K * d.y);
    let c = o.x * o.x + o.z * o.z - K * o.y * o.y + K * o.y - 0.25 * K;

    let lateral = match solve_quadratic(a, b, c) {
        Some((t0, t1)) => [t0, t1],
        // Ray parallel to a generator line: one root
        None if a.abs() < f32::EPSILON && b != 0.0 => [-c / b, f32::NAN],
        None => [f32::NAN; 2],
    };
    for (i, t) in lateral.into_iter().enumerate() {
        let y = o.y + t * d.y;
        if (-HALF_HEIGHT..=HALF_HEIGHT).contains(&y) {
            roots[i] = t;
        }
    }

    if d.y != 0.0 {
        let t = (-HALF_HEIGHT - o.y) / d.y;
        let x = o.x + t * d.x;
        let z = o.z + t * d.z;
        if x * x + z * z <= RADIUS * RADIUS {
            roots[2] = t;
        }
    }

    closest_root(roots)
}

/// Implicit-surface gradient, -Y on the base. The apex falls back to +Y.
pub fn normal(p: Vec3) -> Vec3 {
    if (p.y + HALF_HEIGHT).abs() < CAP_EPSILON {
        return Vec3::NEG_Y;
    }
    Vec3::new(p.x, -K * (p.y - HALF_HEIGHT), p.z)
        .try_normalize()
        .unwrap_or(Vec3::Y)
}

pub fn uv(p: Vec3) -> (f32, f32) {
    cap_or_lateral_uv(p, false)
}

pub fn surface_area() -> f32 {
    let height = 2.0 * HALF_HEIGHT;
    PI * RADIUS * (RADIUS + (RADIUS * RADIUS + height * height).sqrt())
}
