//! Unit cylinder: radius 0.5 around Y, capped at y = -0.5 and y = 0.5.

use lentil_math::Vec3;
use std::f32::consts::PI;

use crate::shape::{closest_root, CAP_EPSILON};
use crate::sphere::{longitude_u, solve_quadratic};

const RADIUS: f32 = 0.5;
const HALF_HEIGHT: f32 = 0.5;

/// Nearest non-negative ray parameter over the body and both caps.
pub fn intersect(origin: Vec3, direction: Vec3) -> Option<f32> {
    let mut roots = [f32::NAN; 4];

    // Lateral surface: x^2 + z^2 = r^2 within the height range
    let a = direction.x * direction.x + direction.z * direction.z;
    let b = 2.0 * (origin.x * direction.x + origin.z * direction.z);
    let c = origin.x * origin.x + origin.z * origin.z - RADIUS * RADIUS;
    if let Some((t0, t1)) = solve_quadratic(a, b, c) {
        for (i, t) in [t0, t1].into_iter().enumerate() {
            let y = origin.y + t * direction.y;
            if (-HALF_HEIGHT..=HALF_HEIGHT).contains(&y) {
                roots[i] = t;
            }
        }
    }

    // Caps
    if direction.y != 0.0 {
        for (i, cap) in [-HALF_HEIGHT, HALF_HEIGHT].into_iter().enumerate() {
            let t = (cap - origin.y) / direction.y;
            let x = origin.x + t * direction.x;
            let z = origin.z + t * direction.z;
            if x * x + z * z <= RADIUS * RADIUS {
                roots[2 + i] = t;
            }
        }
    }

    closest_root(roots)
}

pub fn normal(p: Vec3) -> Vec3 {
    if (p.y - HALF_HEIGHT).abs() < CAP_EPSILON {
        Vec3::Y
    } else if (p.y + HALF_HEIGHT).abs() < CAP_EPSILON {
        Vec3::NEG_Y
    } else {
        Vec3::new(p.x, 0.0, p.z).try_normalize().unwrap_or(Vec3::X)
    }
}

/// Lateral unwrap by longitude and height; caps are planar.
pub fn uv(p: Vec3) -> (f32, f32) {
    cap_or_lateral_uv(p, true)
}

/// Shared by the cone, which has only the bottom cap.
pub(crate) fn cap_or_lateral_uv(p: Vec3, has_top_cap: bool) -> (f32, f32) {
    if has_top_cap && (p.y - HALF_HEIGHT).abs() < CAP_EPSILON {
        (p.x + 0.5, -p.z + 0.5)
    } else if (p.y + HALF_HEIGHT).abs() < CAP_EPSILON {
        (p.x + 0.5, p.z + 0.5)
    } else {
        (longitude_u(p), p.y + 0.5)
    }
}

pub fn surface_area() -> f32 {
    let height = 2.0 * HALF_HEIGHT;
    2.0 * PI * RADIUS * (RADIUS + height)
}
