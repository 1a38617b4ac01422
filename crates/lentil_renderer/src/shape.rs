//! Primitive instances placed in the world.
//!
//! A `Shape` pairs one of the four unit primitives with its cumulative
//! transform, cached inverse and normal matrix, material and velocity. All
//! intersection math happens in object space; the ray direction is carried
//! through the inverse transform without renormalizing so the ray parameter
//! `t` means the same thing in both spaces.

use std::sync::Arc;

use lentil_core::{Material, PrimitiveKind, ShapeDesc, Texture};
use lentil_math::{transform_normal, Aabb, Mat3, Mat4, Mat4Ext, Ray, Vec3};

use crate::{cone, cube, cylinder, sphere};

/// Index of a shape in the render arena.
pub type ShapeId = usize;

/// Tolerance for deciding that an object-space point lies on a cap plane.
pub(crate) const CAP_EPSILON: f32 = 1e-4;

/// Smallest finite, non-negative root.
pub(crate) fn closest_root<const N: usize>(roots: [f32; N]) -> Option<f32> {
    roots
        .into_iter()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

/// Result of a successful ray-shape intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Ray parameter of the hit
    pub t: f32,
    /// World-space hit point
    pub point: Vec3,
}

/// A primitive instance ready for rendering.
#[derive(Clone, Debug)]
pub struct Shape {
    pub kind: PrimitiveKind,
    pub material: Material,
    ctm: Mat4,
    inverse: Mat4,
    normal_matrix: Mat3,
    /// Object-space displacement per unit shutter time
    velocity: Vec3,
    texture: Option<Arc<Texture>>,
    bbox: Aabb,
}

impl Shape {
    /// Create a static shape.
    pub fn new(kind: PrimitiveKind, ctm: Mat4, material: Material) -> Self {
        Self::with_motion(kind, ctm, material, Vec3::ZERO)
    }

    /// Create a shape that moves by `velocity` (object space) over the shutter.
    pub fn with_motion(kind: PrimitiveKind, ctm: Mat4, material: Material, velocity: Vec3) -> Self {
        let rest = ctm.transform_aabb(&kind.object_bounds());
        let bbox = if velocity == Vec3::ZERO {
            rest
        } else {
            // Sweep over the whole shutter so moving hits are never culled
            let end = rest.translate(ctm.transform_vector3(velocity));
            Aabb::surrounding(&rest, &end)
        };

        Self {
            kind,
            material,
            ctm,
            inverse: ctm.inverse(),
            normal_matrix: ctm.normal_matrix(),
            velocity,
            texture: None,
            bbox,
        }
    }

    /// Instantiate from a scene description, scaling velocity by the global factor.
    pub fn from_desc(desc: &ShapeDesc, velocity_scale: f32) -> Self {
        let mut shape = Self::with_motion(
            desc.primitive,
            desc.ctm,
            desc.material.clone(),
            desc.velocity * velocity_scale,
        );
        shape.texture = desc.texture.clone();
        shape
    }

    /// Bind a texture image.
    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Object-to-world transform.
    pub fn transform(&self) -> &Mat4 {
        &self.ctm
    }

    /// World-space bounds, swept over the shutter for moving shapes.
    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Object-space surface area of the unit primitive.
    pub fn surface_area(&self) -> f32 {
        match self.kind {
            PrimitiveKind::Sphere => sphere::surface_area(),
            PrimitiveKind::Cube => cube::surface_area(),
            PrimitiveKind::Cone => cone::surface_area(),
            PrimitiveKind::Cylinder => cylinder::surface_area(),
        }
    }

    /// Map a world-space point into object space at shutter time `time`.
    #[inline]
    fn to_object(&self, point: Vec3, time: f32) -> Vec3 {
        self.inverse.transform_point3(point) - self.velocity * time
    }

    /// Intersect a world-space ray, returning the nearest hit with `t >= 0`.
    pub fn intersect(&self, ray: &Ray) -> Option<Hit> {
        let origin = self.to_object(ray.origin, ray.time);
        let direction = self.inverse.transform_vector3(ray.direction);

        let t = match self.kind {
            PrimitiveKind::Sphere => sphere::intersect(origin, direction),
            PrimitiveKind::Cube => cube::intersect(origin, direction),
            PrimitiveKind::Cone => cone::intersect(origin, direction),
            PrimitiveKind::Cylinder => cylinder::intersect(origin, direction),
        }?;

        Some(Hit {
            t,
            point: ray.at(t),
        })
    }

    /// Unit world-space outward normal at a surface point.
    pub fn normal(&self, point: Vec3, time: f32) -> Vec3 {
        let p = self.to_object(point, time);
        let n = match self.kind {
            PrimitiveKind::Sphere => sphere::normal(p),
            PrimitiveKind::Cube => cube::normal(p),
            PrimitiveKind::Cone => cone::normal(p),
            PrimitiveKind::Cylinder => cylinder::normal(p),
        };
        transform_normal(&self.normal_matrix, n)
    }

    /// Texture coordinates of a surface point.
    pub fn uv(&self, point: Vec3, time: f32) -> (f32, f32) {
        let p = self.to_object(point, time);
        match self.kind {
            PrimitiveKind::Sphere => sphere::uv(p),
            PrimitiveKind::Cube => cube::uv(p),
            PrimitiveKind::Cone => cone::uv(p),
            PrimitiveKind::Cylinder => cylinder::uv(p),
        }
    }

    /// Texture color at a surface point, or `None` when no image is bound.
    pub fn texture_color(&self, point: Vec3, time: f32, filter: bool) -> Option<Vec3> {
        let texture = self.texture.as_ref()?;
        let (repeat_u, repeat_v) = self
            .material
            .texture_map
            .as_ref()
            .map_or((1.0, 1.0), |m| (m.repeat_u, m.repeat_v));

        let (u, v) = self.uv(point, time);
        Some(if filter {
            texture.sample_bilinear(u, v, repeat_u, repeat_v)
        } else {
            texture.sample_nearest(u, v, repeat_u, repeat_v)
        })
    }
}
