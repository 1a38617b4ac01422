//! Recursive Whitted ray tracer.
//!
//! Implements:
//! - Nearest-hit search through the kd-tree (or every shape when acceleration is off)
//! - Phong shading with shadow rays
//! - Mirror reflection and Snell refraction up to a configurable depth
//! - Per-pixel strategies: depth of field, motion blur, physical lens,
//!   adaptive super-sampling and a plain pinhole

use std::fmt;
use std::time::Instant;

use lentil_core::{Color, GlobalCoefficients, Light, SceneDescription};
use lentil_math::{reflect, Ray, Vec3};
use rand::RngCore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::kdtree::{KdTree, DEFAULT_MAX_DEPTH};
use crate::lens::{refract, LensSystem};
use crate::lighting::{shade, Occlusion, ShadingOptions, SurfacePoint, RAY_EPSILON};
use crate::sampling::{gen_f32, gen_range, pixel_rng};
use crate::shape::{Hit, Shape, ShapeId};

/// Color returned by rays that escape the scene.
pub const BACKGROUND: Color = Color::ZERO;

/// Errors reported by [`render`].
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Output buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Cannot render an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Cast shadow rays toward every light
    pub shadows: bool,
    /// Follow mirror reflections
    pub reflection: bool,
    /// Follow refracted rays through transparent materials
    pub refraction: bool,
    /// Blend bound textures into the diffuse color
    pub texture_map: bool,
    /// Bilinear instead of nearest texture lookup
    pub texture_filter: bool,
    /// Render buckets on the rayon thread pool
    pub parallelism: bool,
    /// Adaptive super-sampling when no other strategy applies
    pub super_sample: bool,
    /// Use the kd-tree; otherwise every shape is tested
    pub acceleration: bool,
    pub depth_of_field: bool,
    pub motion_blur: bool,
    /// Trace through the scene's lens assembly
    pub lens: bool,
    /// Output `0.5 * (n + 1)` at the first hit instead of shading
    pub only_render_normals: bool,
    /// Maximum number of reflection/refraction bounces
    pub max_recursive_depth: u32,

    pub dof_samples: u32,
    pub motion_samples: u32,
    pub area_light_samples: u32,
    /// Per-channel color variance above which a pixel region is subdivided
    pub super_sample_threshold: f32,
    /// Maximum number of subdivisions
    pub super_sample_depth: u32,
    pub bucket_size: u32,
    pub kd_max_depth: usize,
    /// Base seed for all stochastic sampling
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shadows: true,
            reflection: true,
            refraction: true,
            texture_map: true,
            texture_filter: false,
            parallelism: true,
            super_sample: false,
            acceleration: true,
            depth_of_field: false,
            motion_blur: false,
            lens: false,
            only_render_normals: false,
            max_recursive_depth: 4,
            dof_samples: 8,
            motion_samples: 8,
            area_light_samples: 8,
            super_sample_threshold: 0.001,
            super_sample_depth: 2,
            bucket_size: DEFAULT_BUCKET_SIZE,
            kd_max_depth: DEFAULT_MAX_DEPTH,
            seed: 0,
        }
    }
}

fn clamp_count(name: &str, value: u32, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("{} = {} is outside {}..={}, using {}", name, value, min, max, clamped);
    }
    clamped
}

impl RenderConfig {
    /// Copy with sample counts clamped to their supported ranges.
    pub fn sanitized(&self) -> Self {
        Self {
            dof_samples: clamp_count("dof_samples", self.dof_samples, 6, 16),
            motion_samples: clamp_count("motion_samples", self.motion_samples, 8, 20),
            area_light_samples: clamp_count("area_light_samples", self.area_light_samples, 8, 16),
            bucket_size: self.bucket_size.max(1),
            ..self.clone()
        }
    }
}

/// How primary rays are generated for each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    DepthOfField,
    MotionBlur,
    Lens,
    SuperSample,
    Pinhole,
}

impl Strategy {
    /// Pick the first enabled strategy in priority order.
    ///
    /// A lens request with no lens loaded falls through to the next option.
    pub fn select(config: &RenderConfig, has_lens: bool) -> Self {
        if config.depth_of_field {
            Strategy::DepthOfField
        } else if config.motion_blur {
            Strategy::MotionBlur
        } else if config.lens && has_lens {
            Strategy::Lens
        } else {
            if config.lens {
                log::warn!("Lens rendering requested but the scene has no lens; ignoring");
            }
            if config.super_sample {
                Strategy::SuperSample
            } else {
                Strategy::Pinhole
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::DepthOfField => "depth of field",
            Strategy::MotionBlur => "motion blur",
            Strategy::Lens => "lens",
            Strategy::SuperSample => "adaptive super-sampling",
            Strategy::Pinhole => "pinhole",
        };
        f.write_str(name)
    }
}

/// Everything needed to trace rays for one render.
pub struct RenderScene<'a> {
    shapes: Vec<Shape>,
    tree: KdTree,
    lights: &'a [Light],
    globals: GlobalCoefficients,
    camera: Camera,
    lens: LensSystem,
    config: RenderConfig,
    strategy: Strategy,
}

impl<'a> RenderScene<'a> {
    /// Instantiate shapes, build the index and set up the camera.
    pub fn new(scene: &'a SceneDescription, config: &RenderConfig) -> Self {
        let config = config.sanitized();
        let velocity_scale = scene.globals.velocity_scale;
        let shapes: Vec<Shape> = scene
            .shapes
            .iter()
            .map(|desc| Shape::from_desc(desc, velocity_scale))
            .collect();
        let tree = KdTree::build(&shapes, config.kd_max_depth);
        let lens = LensSystem::from_prescription(&scene.lens);
        let strategy = Strategy::select(&config, !lens.is_empty());

        Self {
            shapes,
            tree,
            lights: &scene.lights,
            globals: scene.globals,
            camera: Camera::new(&scene.camera, scene.width, scene.height),
            lens,
            config,
            strategy,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Shapes that may be hit by `ray`.
    fn candidates(&self, ray: &Ray, out: &mut Vec<ShapeId>) {
        if self.config.acceleration {
            self.tree.query_into(ray, out);
        } else {
            out.clear();
            out.extend(0..self.shapes.len());
        }
    }

    /// Nearest intersection along `ray`.
    pub fn closest_hit(&self, ray: &Ray) -> Option<(ShapeId, Hit)> {
        let mut candidates = Vec::new();
        self.candidates(ray, &mut candidates);

        candidates
            .into_iter()
            .filter_map(|id| self.shapes[id].intersect(ray).map(|hit| (id, hit)))
            .min_by(|(_, a), (_, b)| a.t.total_cmp(&b.t))
    }

    /// Color seen along `ray`; `depth` counts bounces already taken.
    pub fn trace_ray(&self, ray: &Ray, depth: u32, rng: &mut dyn RngCore) -> Color {
        let Some((id, hit)) = self.closest_hit(ray) else {
            return BACKGROUND;
        };
        let shape = &self.shapes[id];
        let normal = shape.normal(hit.point, ray.time);

        if self.config.only_render_normals {
            return (normal + Vec3::ONE) * 0.5;
        }

        let Some(direction) = ray.direction.try_normalize() else {
            return BACKGROUND;
        };
        let material = &shape.material;
        let texture = if self.config.texture_map {
            shape.texture_color(hit.point, ray.time, self.config.texture_filter)
        } else {
            None
        };

        let surface = SurfacePoint {
            point: hit.point,
            normal,
            view: -direction,
            time: ray.time,
        };
        let options = ShadingOptions {
            shadows: self.config.shadows,
            area_light_samples: self.config.area_light_samples,
        };
        let mut color = shade(
            &surface,
            material,
            texture,
            self.lights,
            &self.globals,
            &options,
            self,
            rng,
        );

        let can_recurse = depth < self.config.max_recursive_depth;

        if can_recurse && self.config.reflection && material.is_reflective() {
            let reflected_dir = reflect(direction, normal);
            let reflected = ray.spawn(offset_origin(hit.point, normal, reflected_dir), reflected_dir);
            let incoming = self.trace_ray(&reflected, depth + 1, rng);
            color += self.globals.ks * material.reflective * incoming;
        }

        if can_recurse && self.config.refraction && material.is_transparent() {
            let entering = direction.dot(normal) < 0.0;
            let (eta, facing) = if entering {
                (1.0 / material.ior, normal)
            } else {
                (material.ior, -normal)
            };
            // Total internal reflection continues as a mirror bounce
            let transmitted_dir =
                refract(-direction, facing, eta).unwrap_or_else(|| reflect(direction, facing));
            let transmitted = ray.spawn(offset_origin(hit.point, facing, transmitted_dir), transmitted_dir);
            let through = self.trace_ray(&transmitted, depth + 1, rng);

            let weight = material.transparent * self.globals.kt;
            color += (through - color) * weight;
        }

        color.clamp(Color::ZERO, Color::ONE)
    }

    /// Final color of pixel (`col`, `row`) using the configured strategy.
    pub fn render_pixel(&self, col: u32, row: u32, rng: &mut dyn RngCore) -> Color {
        let x = col as f32 + 0.5;
        let y = row as f32 + 0.5;

        match self.strategy {
            Strategy::Pinhole => self.trace_ray(&self.camera.pinhole_ray(x, y, 0.0), 0, rng),
            Strategy::DepthOfField => {
                let samples = self.config.dof_samples;
                let mut sum = Color::ZERO;
                for _ in 0..samples {
                    let jx = gen_range(rng, -0.25, 0.25);
                    let jy = gen_range(rng, -0.25, 0.25);
                    let ray = self.camera.depth_of_field_ray(x + jx, y + jy, 0.0, rng);
                    sum += self.trace_ray(&ray, 0, rng);
                }
                sum / samples as f32
            }
            Strategy::MotionBlur => {
                let samples = self.config.motion_samples;
                let mut sum = Color::ZERO;
                for s in 0..samples {
                    let time = (s as f32 + gen_f32(rng)) / samples as f32;
                    sum += self.trace_ray(&self.camera.pinhole_ray(x, y, time), 0, rng);
                }
                sum / samples as f32
            }
            Strategy::Lens => match self.camera.lens_ray(x, y, &self.lens) {
                Some(ray) => self.trace_ray(&ray, 0, rng),
                None => BACKGROUND,
            },
            Strategy::SuperSample => self.adaptive_sample(
                col as f32,
                row as f32,
                1.0,
                self.config.super_sample_depth,
                rng,
            ),
        }
    }

    /// Average of the four corners of a square region, subdivided while the
    /// corners disagree by more than the configured variance.
    fn adaptive_sample(&self, x: f32, y: f32, size: f32, budget: u32, rng: &mut dyn RngCore) -> Color {
        let corners = [(x, y), (x + size, y), (x, y + size), (x + size, y + size)];
        let colors = corners.map(|(cx, cy)| self.trace_ray(&self.camera.pinhole_ray(cx, cy, 0.0), 0, rng));

        let mean = colors.iter().copied().sum::<Color>() / 4.0;
        let variance = colors
            .iter()
            .map(|c| (*c - mean) * (*c - mean))
            .sum::<Color>()
            / 4.0;

        if budget == 0 || variance.max_element() <= self.config.super_sample_threshold {
            return mean;
        }

        let half = size / 2.0;
        let quadrants = [(x, y), (x + half, y), (x, y + half), (x + half, y + half)];
        quadrants
            .iter()
            .map(|&(qx, qy)| self.adaptive_sample(qx, qy, half, budget - 1, rng))
            .sum::<Color>()
            / 4.0
    }
}

impl Occlusion for RenderScene<'_> {
    fn occluded(&self, ray: &Ray, max_t: f32) -> bool {
        let mut candidates = Vec::new();
        self.candidates(ray, &mut candidates);
        candidates.into_iter().any(|id| {
            self.shapes[id]
                .intersect(ray)
                .is_some_and(|hit| hit.t < max_t)
        })
    }
}

/// Start point for a secondary ray, nudged to the side it leaves from.
#[inline]
fn offset_origin(point: Vec3, normal: Vec3, direction: Vec3) -> Vec3 {
    if direction.dot(normal) >= 0.0 {
        point + normal * RAY_EPSILON
    } else {
        point - normal * RAY_EPSILON
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let r = (255.0 * clamp_01(color.x)) as u8;
    let g = (255.0 * clamp_01(color.y)) as u8;
    let b = (255.0 * clamp_01(color.z)) as u8;
    [r, g, b, 255]
}

/// Render `scene` into a caller-owned RGBA8 buffer in row-major order.
pub fn render(output: &mut [u8], scene: &SceneDescription, config: &RenderConfig) -> RenderResult<()> {
    let (width, height) = (scene.width, scene.height);
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if output.len() != expected {
        return Err(RenderError::BufferSize {
            expected,
            actual: output.len(),
        });
    }

    let start = Instant::now();
    let render_scene = RenderScene::new(scene, config);
    let config = &render_scene.config;

    log::info!(
        "Rendering {}x{}: {} shapes, {} lights, {} ({})",
        width,
        height,
        render_scene.shapes.len(),
        scene.lights.len(),
        render_scene.strategy,
        if config.parallelism { "parallel" } else { "serial" }
    );

    if config.parallelism {
        let buckets = generate_buckets(width, height, config.bucket_size);
        let results: Vec<BucketResult> = buckets
            .par_iter()
            .map(|bucket| BucketResult::new(*bucket, render_bucket(bucket, &render_scene, config.seed)))
            .collect();

        for result in results {
            let bucket = result.bucket;
            for (i, color) in result.pixels.iter().enumerate() {
                let col = bucket.x + i as u32 % bucket.width;
                let row = bucket.y + i as u32 / bucket.width;
                let offset = (row as usize * width as usize + col as usize) * 4;
                output[offset..offset + 4].copy_from_slice(&color_to_rgba(*color));
            }
        }
    } else {
        for (index, pixel) in output.chunks_exact_mut(4).enumerate() {
            let col = (index % width as usize) as u32;
            let row = (index / width as usize) as u32;
            let mut rng = pixel_rng(config.seed, index as u64);
            let color = render_scene.render_pixel(col, row, &mut rng);
            pixel.copy_from_slice(&color_to_rgba(color));
        }
    }

    log::info!("Render complete in {:.2?}", start.elapsed());
    Ok(())
}

/// Render into a newly allocated RGBA8 buffer.
pub fn render_image(scene: &SceneDescription, config: &RenderConfig) -> RenderResult<Vec<u8>> {
    let mut output = vec![0u8; scene.width as usize * scene.height as usize * 4];
    render(&mut output, scene, config)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lentil_core::{
        Attenuation, CameraDesc, LensInterface, Material, PrimitiveKind, ShapeDesc,
    };
    use lentil_math::{Mat4, Quat};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::FRAC_PI_4;

    fn sphere_scene(width: u32, height: u32) -> SceneDescription {
        let camera = CameraDesc::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let mut scene = SceneDescription::new(width, height, camera);
        scene.add_shape(ShapeDesc::new(
            PrimitiveKind::Sphere,
            Mat4::IDENTITY,
            Material::default(),
        ));
        scene.add_light(Light::Directional {
            direction: Vec3::NEG_Z,
            color: Color::ONE,
        });
        scene
    }

    fn serial() -> RenderConfig {
        RenderConfig {
            parallelism: false,
            ..Default::default()
        }
    }

    fn pixel(buffer: &[u8], width: u32, col: u32, row: u32) -> [u8; 4] {
        let offset = ((row * width + col) * 4) as usize;
        [buffer[offset], buffer[offset + 1], buffer[offset + 2], buffer[offset + 3]]
    }

    #[test]
    fn test_sphere_center_lit_and_background_black() {
        let scene = sphere_scene(32, 32);
        let image = render_image(&scene, &serial()).unwrap();

        let center = pixel(&image, 32, 16, 16);
        assert!(center[0] > 0, "center pixel should be lit: {:?}", center);
        // Default diffuse 0.5 * kd 0.5 facing the light
        assert!((center[0] as i32 - 63).abs() <= 1);

        for (col, row) in [(0, 0), (31, 0), (0, 31), (31, 31), (16, 0), (0, 16)] {
            assert_eq!(pixel(&image, 32, col, row), [0, 0, 0, 255]);
        }
    }

    #[test]
    fn test_render_errors() {
        let scene = sphere_scene(4, 4);
        let mut small = vec![0u8; 10];
        assert!(matches!(
            render(&mut small, &scene, &serial()),
            Err(RenderError::BufferSize { expected: 64, actual: 10 })
        ));

        let empty = sphere_scene(0, 4);
        assert!(matches!(
            render(&mut [], &empty, &serial()),
            Err(RenderError::EmptyImage { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut scene = sphere_scene(24, 20);
        scene.add_light(Light::Area {
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::new(-1.0, -2.0, -3.0),
            color: Color::splat(0.5),
            attenuation: Attenuation::default(),
            width: 1.0,
            height: 1.0,
        });

        let parallel = RenderConfig {
            parallelism: true,
            bucket_size: 8,
            seed: 77,
            ..Default::default()
        };
        let sequential = RenderConfig {
            parallelism: false,
            ..parallel.clone()
        };

        let a = render_image(&scene, &parallel).unwrap();
        let b = render_image(&scene, &sequential).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_aperture_dof_matches_pinhole() {
        let mut scene = sphere_scene(32, 32);
        scene.camera.aperture = 0.0;
        scene.camera.focal_length = 5.0;

        let pinhole = render_image(&scene, &serial()).unwrap();
        let dof = render_image(
            &scene,
            &RenderConfig {
                depth_of_field: true,
                ..serial()
            },
        )
        .unwrap();

        let differing = pinhole
            .chunks_exact(4)
            .zip(dof.chunks_exact(4))
            .filter(|(a, b)| (0..3).any(|c| (a[c] as i32 - b[c] as i32).abs() > 8))
            .count();
        // Only silhouette pixels see the sub-pixel jitter
        assert!(differing < 32 * 32 / 10, "{} pixels differ", differing);
        let (a, b) = (pixel(&pinhole, 32, 16, 16), pixel(&dof, 32, 16, 16));
        assert!((a[0] as i32 - b[0] as i32).abs() <= 2);
    }

    #[test]
    fn test_static_motion_blur_matches_still() {
        let scene = sphere_scene(24, 24);
        let still = render_image(&scene, &serial()).unwrap();
        let blurred = render_image(
            &scene,
            &RenderConfig {
                motion_blur: true,
                motion_samples: 12,
                ..serial()
            },
        )
        .unwrap();

        for (a, b) in still.iter().zip(blurred.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_moving_sphere_blurs() {
        let mut scene = sphere_scene(24, 24);
        scene.shapes[0].velocity = Vec3::new(1.0, 0.0, 0.0);

        let still = render_image(&scene, &serial()).unwrap();
        let blurred = render_image(
            &scene,
            &RenderConfig {
                motion_blur: true,
                ..serial()
            },
        )
        .unwrap();
        assert_ne!(still, blurred);
    }

    #[test]
    fn test_only_render_normals() {
        // Odd size so the middle pixel looks straight down the axis
        let scene = sphere_scene(17, 17);
        let image = render_image(
            &scene,
            &RenderConfig {
                only_render_normals: true,
                ..serial()
            },
        )
        .unwrap();

        let center = pixel(&image, 17, 8, 8);
        // Facing the camera: n = +Z
        assert!((center[0] as i32 - 127).abs() <= 1);
        assert!((center[1] as i32 - 127).abs() <= 1);
        assert!(center[2] >= 254);
    }

    #[test]
    fn test_reflection_picks_up_mirrored_object() {
        let camera = CameraDesc::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let mut scene = SceneDescription::new(16, 16, camera);
        scene.globals = GlobalCoefficients {
            ka: 1.0,
            kd: 1.0,
            ks: 1.0,
            kt: 1.0,
            velocity_scale: 1.0,
        };

        // Mirror facing (+X, +Z) turns the view ray toward +X
        let mirror = Material {
            reflective: Color::ONE,
            diffuse: Color::ZERO,
            ..Default::default()
        };
        scene.add_shape(ShapeDesc::new(
            PrimitiveKind::Cube,
            Mat4::from_rotation_y(FRAC_PI_4) * Mat4::from_scale(Vec3::new(3.0, 3.0, 0.1)),
            mirror,
        ));
        let red = Material {
            ambient: Color::new(1.0, 0.0, 0.0),
            diffuse: Color::ZERO,
            ..Default::default()
        };
        scene.add_shape(ShapeDesc::new(
            PrimitiveKind::Sphere,
            Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::new(3.0, 0.0, 0.0)),
            red,
        ));

        let on = render_image(&scene, &serial()).unwrap();
        let off = render_image(
            &scene,
            &RenderConfig {
                reflection: false,
                ..serial()
            },
        )
        .unwrap();

        assert_eq!(pixel(&on, 16, 8, 8), [255, 0, 0, 255]);
        assert_eq!(pixel(&off, 16, 8, 8), [0, 0, 0, 255]);
    }

    #[test]
    fn test_refraction_sees_through_glass() {
        let camera = CameraDesc::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let mut scene = SceneDescription::new(16, 16, camera);
        scene.globals = GlobalCoefficients {
            ka: 1.0,
            kd: 1.0,
            ks: 1.0,
            kt: 1.0,
            velocity_scale: 1.0,
        };

        let glass = Material {
            diffuse: Color::ZERO,
            transparent: Color::ONE,
            ior: 1.5,
            ..Default::default()
        };
        scene.add_shape(ShapeDesc::new(PrimitiveKind::Sphere, Mat4::IDENTITY, glass));
        let green = Material {
            ambient: Color::new(0.0, 1.0, 0.0),
            diffuse: Color::ZERO,
            ..Default::default()
        };
        scene.add_shape(ShapeDesc::new(
            PrimitiveKind::Cube,
            Mat4::from_scale_rotation_translation(
                Vec3::new(20.0, 20.0, 0.5),
                Quat::IDENTITY,
                Vec3::new(0.0, 0.0, -3.0),
            ),
            green,
        ));

        let on = render_image(&scene, &serial()).unwrap();
        let off = render_image(
            &scene,
            &RenderConfig {
                refraction: false,
                ..serial()
            },
        )
        .unwrap();

        // Straight through the center of the sphere to the green wall
        assert_eq!(pixel(&on, 16, 8, 8)[1], 255);
        assert_eq!(pixel(&off, 16, 8, 8), [0, 0, 0, 255]);
        // The wall itself is visible around the sphere either way
        assert_eq!(pixel(&off, 16, 0, 0), [0, 255, 0, 255]);
    }

    /// A thin floor slab with small boxes in the corners, lit by `light`,
    /// with an optional unit-diameter sphere at `occluder`.
    fn shadow_scene(light: Light, occluder: Option<Vec3>) -> SceneDescription {
        let mut scene = sphere_scene(8, 8);
        scene.shapes.clear();
        scene.lights = vec![light];
        scene.globals = GlobalCoefficients {
            ka: 1.0,
            kd: 1.0,
            ks: 0.0,
            kt: 0.0,
            velocity_scale: 1.0,
        };

        let floor = Material {
            ambient: Color::splat(0.1),
            diffuse: Color::splat(0.9),
            ..Default::default()
        };
        scene.add_shape(ShapeDesc::new(
            PrimitiveKind::Cube,
            Mat4::from_scale(Vec3::new(10.0, 0.1, 10.0)),
            floor,
        ));
        for (x, z) in [(-4.0, -4.0), (4.0, -4.0), (-4.0, 4.0), (4.0, 4.0)] {
            scene.add_shape(ShapeDesc::new(
                PrimitiveKind::Cube,
                Mat4::from_translation(Vec3::new(x, 0.5, z)),
                Material::default(),
            ));
        }
        if let Some(center) = occluder {
            scene.add_shape(ShapeDesc::new(
                PrimitiveKind::Sphere,
                Mat4::from_translation(center),
                Material::default(),
            ));
        }
        scene
    }

    /// Color of the floor directly under the light, seen from the side.
    fn floor_color(scene: &SceneDescription, acceleration: bool) -> Color {
        let config = RenderConfig {
            acceleration,
            ..serial()
        };
        let render_scene = RenderScene::new(scene, &config);
        let mut rng = StdRng::seed_from_u64(2);
        let origin = Vec3::new(3.0, 1.0, 0.0);
        let ray = Ray::new(origin, Vec3::new(0.0, 0.05, 0.0) - origin, 0.0);
        render_scene.trace_ray(&ray, 0, &mut rng)
    }

    #[test]
    fn test_point_light_shadowed_only_by_occluder_in_between() {
        let light = Light::Point {
            position: Vec3::new(0.0, 3.0, 0.0),
            color: Color::ONE,
            attenuation: Attenuation::default(),
        };

        for acceleration in [true, false] {
            let lit = floor_color(&shadow_scene(light.clone(), None), acceleration);
            assert!((lit - Color::ONE).length() < 1e-4, "{:?}", lit);

            // Between the floor and the light: ambient only
            let between = floor_color(&shadow_scene(light.clone(), Some(Vec3::new(0.0, 1.5, 0.0))), acceleration);
            assert!((between - Color::splat(0.1)).length() < 1e-4, "{:?}", between);

            // Past the light the shadow ray stops short of it
            let beyond = floor_color(&shadow_scene(light.clone(), Some(Vec3::new(0.0, 4.5, 0.0))), acceleration);
            assert!((beyond - Color::ONE).length() < 1e-4, "{:?}", beyond);
        }
    }

    #[test]
    fn test_directional_light_blocked_at_any_distance() {
        let light = Light::Directional {
            direction: Vec3::NEG_Y,
            color: Color::ONE,
        };

        let lit = floor_color(&shadow_scene(light.clone(), None), true);
        assert!((lit - Color::ONE).length() < 1e-4, "{:?}", lit);

        let far = floor_color(&shadow_scene(light.clone(), Some(Vec3::new(0.0, 15.0, 0.0))), true);
        assert!((far - Color::splat(0.1)).length() < 1e-4, "{:?}", far);
    }

    #[test]
    fn test_occlusion_respects_max_t() {
        let scene = shadow_scene(
            Light::Directional {
                direction: Vec3::NEG_Y,
                color: Color::ONE,
            },
            Some(Vec3::new(0.0, 1.5, 0.0)),
        );
        let render_scene = RenderScene::new(&scene, &serial());
        let up = Ray::new(Vec3::new(0.0, 0.1, 0.0), Vec3::Y, 0.0);

        // Sphere surface is 0.9 above the origin
        assert!(render_scene.occluded(&up, 1.0));
        assert!(!render_scene.occluded(&up, 0.8));
        assert!(!render_scene.occluded(&Ray::new(Vec3::new(0.0, 0.1, 0.0), Vec3::NEG_X, 0.0), 3.0));
    }

    #[test]
    fn test_depth_limit_stops_recursion() {
        let scene = sphere_scene(4, 4);
        let render_scene = RenderScene::new(&scene, &RenderConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, 0.0);

        // At the depth cap the hit is still shaded, just not recursed
        let c = render_scene.trace_ray(&ray, 4, &mut rng);
        assert!(c.x > 0.0);
    }

    #[test]
    fn test_acceleration_matches_brute_force() {
        let mut scene = sphere_scene(24, 24);
        for i in 0..12 {
            let angle = i as f32 * 0.5;
            scene.add_shape(ShapeDesc::new(
                [PrimitiveKind::Cube, PrimitiveKind::Cone, PrimitiveKind::Cylinder][i % 3],
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(0.4),
                    Quat::from_rotation_x(angle),
                    Vec3::new(angle.cos() * 1.2, angle.sin() * 1.2, -0.5 * i as f32),
                ),
                Material::default(),
            ));
        }

        let accelerated = render_image(&scene, &serial()).unwrap();
        let brute = render_image(
            &scene,
            &RenderConfig {
                acceleration: false,
                ..serial()
            },
        )
        .unwrap();
        assert_eq!(accelerated, brute);
    }

    #[test]
    fn test_lens_strategy_selection() {
        let mut scene = sphere_scene(8, 8);
        let config = RenderConfig {
            lens: true,
            ..serial()
        };

        // No lens loaded: falls back to the pinhole
        assert_eq!(RenderScene::new(&scene, &config).strategy(), Strategy::Pinhole);

        scene.lens = vec![LensInterface {
            radius: 0.0,
            thickness: 0.01,
            ior: 0.0,
            aperture: 1.0,
        }];
        assert_eq!(RenderScene::new(&scene, &config).strategy(), Strategy::Lens);

        let dof = RenderConfig {
            depth_of_field: true,
            motion_blur: true,
            ..config
        };
        assert_eq!(RenderScene::new(&scene, &dof).strategy(), Strategy::DepthOfField);
    }

    #[test]
    fn test_open_stop_lens_renders_like_pinhole() {
        let mut scene = sphere_scene(16, 16);
        let pinhole = render_image(&scene, &serial()).unwrap();

        scene.lens = vec![LensInterface {
            radius: 0.0,
            thickness: 0.001,
            ior: 0.0,
            aperture: 10.0,
        }];
        let lens = render_image(
            &scene,
            &RenderConfig {
                lens: true,
                ..serial()
            },
        )
        .unwrap();

        assert_eq!(pixel(&lens, 16, 8, 8), pixel(&pinhole, 16, 8, 8));
        assert_eq!(pixel(&lens, 16, 0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_vignetting_lens_renders_black() {
        let mut scene = sphere_scene(8, 8);
        scene.lens = vec![LensInterface {
            radius: 0.0,
            thickness: 0.01,
            ior: 0.0,
            aperture: 1e-6,
        }];
        let image = render_image(
            &scene,
            &RenderConfig {
                lens: true,
                ..serial()
            },
        )
        .unwrap();

        // Off-axis pixels are clipped by the tiny stop
        assert_eq!(pixel(&image, 8, 0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_super_sample_smooths_edges() {
        let scene = sphere_scene(16, 16);
        let config = RenderConfig {
            super_sample: true,
            super_sample_depth: 3,
            ..serial()
        };
        let render_scene = RenderScene::new(&scene, &config);
        assert_eq!(render_scene.strategy(), Strategy::SuperSample);

        let image = render_image(&scene, &config).unwrap();
        // Interior pixels stay lit, corners stay background
        assert!(pixel(&image, 16, 8, 8)[0] > 0);
        assert_eq!(pixel(&image, 16, 0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_config_sanitized_clamps_samples() {
        let config = RenderConfig {
            dof_samples: 100,
            motion_samples: 1,
            area_light_samples: 12,
            bucket_size: 0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(config.dof_samples, 16);
        assert_eq!(config.motion_samples, 8);
        assert_eq!(config.area_light_samples, 12);
        assert_eq!(config.bucket_size, 1);
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "parallelism": false, "dof_samples": 12 }"#).unwrap();

        assert!(!config.parallelism);
        assert_eq!(config.dof_samples, 12);
        assert!(config.shadows);
        assert_eq!(config.max_recursive_depth, 4);
        assert_eq!(config.kd_max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_color_to_rgba_clamps() {
        assert_eq!(color_to_rgba(Color::new(2.0, -1.0, 0.5)), [255, 0, 127, 255]);
    }
}
