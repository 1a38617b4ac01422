//! Phong local illumination.
//!
//! Ambient light is added once per hit; every light then contributes a
//! diffuse and a specular lobe scaled by its attenuation and, for spot lights,
//! the cone falloff. Shadow rays are answered by an [`Occlusion`] source so the
//! shading code does not depend on how the scene is indexed.

use lentil_core::{Color, GlobalCoefficients, Light, Material};
use lentil_math::{reflect, Ray, Vec3};
use rand::RngCore;

use crate::sampling::gen_f32;

/// Offset applied along the normal when spawning secondary rays.
pub const RAY_EPSILON: f32 = 1e-3;

/// Answers shadow-ray queries.
pub trait Occlusion {
    /// True if anything blocks `ray` before parameter `max_t`.
    fn occluded(&self, ray: &Ray, max_t: f32) -> bool;
}

/// Geometry of the point being shaded.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    pub point: Vec3,
    /// Unit outward normal
    pub normal: Vec3,
    /// Unit vector from the point toward the viewer
    pub view: Vec3,
    /// Shutter time of the primary ray
    pub time: f32,
}

/// Per-render shading switches.
#[derive(Debug, Clone, Copy)]
pub struct ShadingOptions {
    pub shadows: bool,
    pub area_light_samples: u32,
}

/// Material terms resolved for one hit.
struct Lobes<'a> {
    material: &'a Material,
    globals: &'a GlobalCoefficients,
    /// Diffuse color after texture blending
    diffuse: Color,
}

/// Full local illumination at a surface point: ambient plus every light.
#[allow(clippy::too_many_arguments)]
pub fn shade(
    surface: &SurfacePoint,
    material: &Material,
    texture: Option<Color>,
    lights: &[Light],
    globals: &GlobalCoefficients,
    options: &ShadingOptions,
    occlusion: &dyn Occlusion,
    rng: &mut dyn RngCore,
) -> Color {
    let base = material.diffuse * globals.kd;
    let diffuse = match texture {
        Some(tex) => base.lerp(tex, material.blend),
        None => base,
    };
    let lobes = Lobes {
        material,
        globals,
        diffuse,
    };

    let mut color = ambient(material, globals);
    for light in lights {
        color += shade_light(light, surface, &lobes, options, occlusion, rng);
    }
    color
}

/// Ambient term.
pub fn ambient(material: &Material, globals: &GlobalCoefficients) -> Color {
    material.ambient * globals.ka
}

fn shade_light(
    light: &Light,
    surface: &SurfacePoint,
    lobes: &Lobes,
    options: &ShadingOptions,
    occlusion: &dyn Occlusion,
    rng: &mut dyn RngCore,
) -> Color {
    match light {
        Light::Point {
            position,
            color,
            attenuation,
        } => {
            let Some((to_light, distance)) = toward(surface.point, *position) else {
                return Color::ZERO;
            };
            if options.shadows && blocked(surface, to_light, distance, occlusion) {
                return Color::ZERO;
            }
            phong(surface, to_light, *color * attenuation.factor(distance), lobes)
        }
        Light::Directional { direction, color } => {
            let Some(to_light) = (-*direction).try_normalize() else {
                return Color::ZERO;
            };
            if options.shadows && blocked(surface, to_light, f32::INFINITY, occlusion) {
                return Color::ZERO;
            }
            phong(surface, to_light, *color, lobes)
        }
        Light::Spot {
            position,
            direction,
            color,
            attenuation,
            angle,
            penumbra,
        } => {
            let Some((to_light, distance)) = toward(surface.point, *position) else {
                return Color::ZERO;
            };
            let intensity = spot_intensity(-to_light, *direction, *angle, *penumbra);
            if intensity <= 0.0 {
                return Color::ZERO;
            }
            if options.shadows && blocked(surface, to_light, distance, occlusion) {
                return Color::ZERO;
            }
            let scale = attenuation.factor(distance) * intensity;
            phong(surface, to_light, *color * scale, lobes)
        }
        Light::Area {
            position,
            direction,
            color,
            attenuation,
            width,
            height,
        } => {
            let samples = options.area_light_samples.max(1);
            let (right, up) = area_basis(*direction);

            let mut sum = Color::ZERO;
            for _ in 0..samples {
                let offset_u = (gen_f32(rng) - 0.5) * width;
                let offset_v = (gen_f32(rng) - 0.5) * height;
                let sample = *position + right * offset_u + up * offset_v;

                let Some((to_light, distance)) = toward(surface.point, sample) else {
                    continue;
                };
                if options.shadows && blocked(surface, to_light, distance, occlusion) {
                    continue;
                }
                sum += phong(surface, to_light, *color * attenuation.factor(distance), lobes);
            }
            // Occluded samples count as zero, giving visible/total soft shadows
            sum / samples as f32
        }
    }
}

/// Diffuse plus specular for one light direction and radiance.
fn phong(surface: &SurfacePoint, to_light: Vec3, radiance: Color, lobes: &Lobes) -> Color {
    let n_dot_l = surface.normal.dot(to_light);
    if n_dot_l <= 0.0 {
        return Color::ZERO;
    }

    let diffuse = lobes.diffuse * n_dot_l;

    let reflected = reflect(-to_light, surface.normal);
    let r_dot_v = reflected.dot(surface.view);
    let specular = if r_dot_v > 0.0 {
        lobes.material.specular * lobes.globals.ks * r_dot_v.powf(lobes.material.shininess)
    } else {
        Color::ZERO
    };

    (diffuse + specular) * radiance
}

/// Unit direction and distance from `from` to `to`.
fn toward(from: Vec3, to: Vec3) -> Option<(Vec3, f32)> {
    let delta = to - from;
    let distance = delta.length();
    if distance <= f32::EPSILON {
        return None;
    }
    Some((delta / distance, distance))
}

fn blocked(surface: &SurfacePoint, to_light: Vec3, distance: f32, occlusion: &dyn Occlusion) -> bool {
    let origin = surface.point + surface.normal * RAY_EPSILON;
    let ray = Ray::new(origin, to_light, surface.time);
    occlusion.occluded(&ray, distance)
}

/// Spot-cone falloff for a ray leaving the light along `emitted`.
///
/// Full intensity inside `angle - penumbra`, zero outside `angle`, and a cubic
/// ease between the two.
pub fn spot_intensity(emitted: Vec3, axis: Vec3, angle: f32, penumbra: f32) -> f32 {
    let Some(axis) = axis.try_normalize() else {
        return 0.0;
    };
    let cos = emitted.dot(axis);
    let outer = angle.cos();
    let inner = (angle - penumbra).cos();

    if cos < outer {
        return 0.0;
    }
    if cos >= inner {
        return 1.0;
    }
    let x = (cos - inner) / (outer - inner);
    1.0 - (-2.0 * x * x * x + 3.0 * x * x)
}

/// Orthonormal (right, up) spanning the plane of an area light.
fn area_basis(direction: Vec3) -> (Vec3, Vec3) {
    let dir = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    let world_up = if dir.dot(Vec3::Y).abs() > 0.9 {
        Vec3::X
    } else {
        Vec3::Y
    };
    let right = world_up.cross(dir).normalize();
    let up = dir.cross(right);
    (right, up)
}
