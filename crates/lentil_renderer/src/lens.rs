//! Physical lens simulation.
//!
//! Rays leave the film at the camera-space origin heading toward -Z and are
//! refracted through each spherical interface in turn. The axial position of
//! an interface is found by subtracting thicknesses as the trace advances, so
//! the first interface sits one thickness in front of the film.

use lentil_core::LensInterface;
use lentil_math::{Ray, Vec3};

/// A compound lens with interfaces stored in ray-travel order (film side first).
#[derive(Debug, Clone, Default)]
pub struct LensSystem {
    interfaces: Vec<LensInterface>,
}

impl LensSystem {
    /// Build from a prescription listed object side first.
    pub fn from_prescription(prescription: &[LensInterface]) -> Self {
        Self {
            interfaces: prescription.iter().rev().copied().collect(),
        }
    }

    /// Interfaces in the order a ray from the film meets them.
    pub fn interfaces(&self) -> &[LensInterface] {
        &self.interfaces
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Axial distance from the film to the front of the lens.
    pub fn total_length(&self) -> f32 {
        self.interfaces.iter().map(|i| i.thickness).sum()
    }

    /// Trace a camera-space ray from the film out through the lens.
    ///
    /// Returns the ray leaving the last interface, or `None` when it is
    /// vignetted by an aperture, misses an interface, or is totally
    /// internally reflected.
    pub fn trace(&self, ray: &Ray) -> Option<Ray> {
        let mut origin = ray.origin;
        let mut direction = ray.direction;
        let mut z = 0.0;

        for (i, interface) in self.interfaces.iter().enumerate() {
            z -= interface.thickness;

            let (t, normal) = if interface.is_stop() {
                if direction.z >= 0.0 {
                    return None;
                }
                ((z - origin.z) / direction.z, None)
            } else {
                let (t, n) = intersect_interface(origin, direction, interface.radius, z + interface.radius)?;
                (t, Some(n))
            };

            let hit = origin + t * direction;
            let aperture = interface.aperture;
            if hit.x * hit.x + hit.y * hit.y > aperture * aperture {
                return None;
            }
            origin = hit;

            if let Some(n) = normal {
                let eta_i = interface.ior;
                let eta_t = self
                    .interfaces
                    .get(i + 1)
                    .map(|next| next.ior)
                    .filter(|&ior| ior != 0.0)
                    .unwrap_or(1.0);
                let wi = (-direction).normalize();
                direction = refract(wi, n, eta_i / eta_t)?;
            }
        }

        Some(Ray::new(origin, direction, ray.time))
    }
}

/// Intersect a spherical interface centered on the axis at `z_center`.
///
/// Picks the root on the side of the sphere the ray meets given its travel
/// direction and the sign of the curvature. The returned normal faces back
/// along the incoming ray.
fn intersect_interface(origin: Vec3, direction: Vec3, radius: f32, z_center: f32) -> Option<(f32, Vec3)> {
    let o = origin - Vec3::new(0.0, 0.0, z_center);
    let a = direction.length_squared();
    let b = 2.0 * direction.dot(o);
    let c = o.length_squared() - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if a == 0.0 || discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();
    let t0 = (-b - sqrtd) / (2.0 * a);
    let t1 = (-b + sqrtd) / (2.0 * a);

    let use_closer = (direction.z > 0.0) ^ (radius < 0.0);
    let t = if use_closer { t0.min(t1) } else { t0.max(t1) };
    if t < 0.0 {
        return None;
    }

    let n = (o + t * direction).normalize();
    let n = if n.dot(-direction) < 0.0 { -n } else { n };
    Some((t, n))
}

/// Vector Snell refraction.
///
/// `wi` points away from the surface on the incident side, `n` is the unit
/// normal on that same side and `eta` is `n_incident / n_transmitted`.
/// Returns the unit transmitted direction, or `None` on total internal
/// reflection.
pub fn refract(wi: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = n.dot(wi);
    let sin2_i = (1.0 - cos_i * cos_i).max(0.0);
    let sin2_t = eta * eta * sin2_i;
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(eta * -wi + (eta * cos_i - cos_t) * n)
}
