//! Unit cube: side 1 centered at the object-space origin.

use lentil_math::Vec3;

use crate::shape::closest_root;

const HALF: f32 = 0.5;

/// Slack when checking that a slab hit lies on the face.
const FACE_EPSILON: f32 = 1e-5;

/// Nearest non-negative ray parameter, or `None` on a miss.
///
/// Tests both planes of each axis-aligned slab pair and keeps hits that land
/// inside the face square.
pub fn intersect(origin: Vec3, direction: Vec3) -> Option<f32> {
    let mut roots = [f32::NAN; 6];

    for axis in 0..3 {
        if direction[axis] == 0.0 {
            continue;
        }
        for (side, plane) in [-HALF, HALF].into_iter().enumerate() {
            let t = (plane - origin[axis]) / direction[axis];
            let p = origin + t * direction;
            let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
            if p[a].abs() <= HALF + FACE_EPSILON && p[b].abs() <= HALF + FACE_EPSILON {
                roots[axis * 2 + side] = t;
            }
        }
    }

    closest_root(roots)
}

/// Face normal chosen by the largest-magnitude coordinate.
pub fn normal(p: Vec3) -> Vec3 {
    let abs = p.abs();
    if abs.x >= abs.y && abs.x >= abs.z {
        Vec3::new(p.x.signum(), 0.0, 0.0)
    } else if abs.y >= abs.z {
        Vec3::new(0.0, p.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, p.z.signum())
    }
}

/// Per-face planar unwrap, each face covering the full [0, 1] square.
pub fn uv(p: Vec3) -> (f32, f32) {
    let n = normal(p);
    if n.x > 0.0 {
        (-p.z + 0.5, p.y + 0.5)
    } else if n.x < 0.0 {
        (p.z + 0.5, p.y + 0.5)
    } else if n.y > 0.0 {
        (p.x + 0.5, -p.z + 0.5)
    } else if n.y < 0.0 {
        (p.x + 0.5, p.z + 0.5)
    } else if n.z > 0.0 {
        (p.x + 0.5, p.y + 0.5)
    } else {
        (-p.x + 0.5, p.y + 0.5)
    }
}

pub fn surface_area() -> f32 {
    6.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_entry_and_exit() {
        let origin = Vec3::new(0.0, 0.0, 3.0);
        let t = intersect(origin, Vec3::NEG_Z).unwrap();
        assert!((t - 2.5).abs() < 1e-5);

        // From inside only the far face remains
        let t = intersect(Vec3::ZERO, Vec3::NEG_Z).unwrap();
        assert!((t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_cube_diagonal_ray() {
        let origin = Vec3::new(2.0, 2.0, 2.0);
        let t = intersect(origin, -origin).unwrap();
        let p = origin - t * origin;
        assert!((p - Vec3::splat(0.5)).length() < 1e-4);
    }

    #[test]
    fn test_cube_miss() {
        assert!(intersect(Vec3::new(0.0, 0.8, 3.0), Vec3::NEG_Z).is_none());
    }

    #[test]
    fn test_cube_normals() {
        assert_eq!(normal(Vec3::new(0.5, 0.1, -0.2)), Vec3::X);
        assert_eq!(normal(Vec3::new(0.1, -0.5, 0.3)), Vec3::NEG_Y);
        assert_eq!(normal(Vec3::new(0.2, 0.3, -0.5)), Vec3::NEG_Z);
    }

    #[test]
    fn test_cube_face_uv() {
        let (u, v) = uv(Vec3::new(0.1, 0.2, 0.5));
        assert!((u - 0.6).abs() < 1e-6);
        assert!((v - 0.7).abs() < 1e-6);

        let (u, v) = uv(Vec3::new(0.5, 0.2, 0.1));
        assert!((u - 0.4).abs() < 1e-6);
        assert!((v - 0.7).abs() < 1e-6);

        let (u, v) = uv(Vec3::new(0.1, 0.5, 0.3));
        assert!((u - 0.6).abs() < 1e-6);
        assert!((v - 0.2).abs() < 1e-6);
    }
}
