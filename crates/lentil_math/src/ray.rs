use crate::Vec3;

/// A ray in 3D space with origin, direction, and time.
///
/// The direction is not required to be unit length; ray parameters are
/// preserved under affine transforms as long as the direction is transformed
/// without renormalizing. `time` lies in `[0, 1)` and selects the shutter
/// instant used for motion blur.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub time: f32,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3, time: f32) -> Self {
        Self {
            origin,
            direction,
            time,
        }
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// A secondary ray leaving `origin` along `direction` at the same instant.
    #[inline]
    pub fn spawn(&self, origin: Vec3, direction: Vec3) -> Ray {
        Ray::new(origin, direction, self.time)
    }
}
