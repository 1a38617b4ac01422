//! Scene description types for Lentil.
//!
//! This module defines the flattened scene a loader hands to the renderer:
//! every shape carries its cumulative object-to-world transform and every light
//! is already expressed in world space. The types are immutable for the
//! duration of a render.

use std::sync::Arc;

use lentil_math::{Aabb, Mat4, Mat4Ext, Vec3};
use serde::{Deserialize, Serialize};

use crate::lens::LensInterface;
use crate::texture::Texture;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Texture-map settings attached to a material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureMap {
    /// Image file, resolved by `TextureCache`
    pub filename: String,

    /// Number of times the image repeats across the u range
    pub repeat_u: f32,

    /// Number of times the image repeats across the v range
    pub repeat_v: f32,
}

impl Default for TextureMap {
    fn default() -> Self {
        Self {
            filename: String::new(),
            repeat_u: 1.0,
            repeat_v: 1.0,
        }
    }
}

/// A Phong material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Ambient color, scaled by the global ambient weight
    pub ambient: Color,

    /// Diffuse color, scaled by the global diffuse weight
    pub diffuse: Color,

    /// Specular color, scaled by the global specular weight
    pub specular: Color,

    /// Mirror reflectivity per channel (0 = none)
    pub reflective: Color,

    /// Transparency per channel (0 = opaque)
    pub transparent: Color,

    /// Specular exponent
    pub shininess: f32,

    /// Index of refraction used for transparent surfaces
    pub ior: f32,

    /// Blend between the diffuse color (0) and the texture color (1)
    pub blend: f32,

    /// Optional texture map
    pub texture_map: Option<TextureMap>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::ZERO,
            diffuse: Color::new(0.5, 0.5, 0.5), // Grey default
            specular: Color::ZERO,
            reflective: Color::ZERO,
            transparent: Color::ZERO,
            shininess: 1.0,
            ior: 1.0,
            blend: 0.0,
            texture_map: None,
        }
    }
}

impl Material {
    /// Check if any channel reflects.
    pub fn is_reflective(&self) -> bool {
        self.reflective.max_element() > 0.0
    }

    /// Check if any channel transmits.
    pub fn is_transparent(&self) -> bool {
        self.transparent.max_element() > 0.0
    }
}

/// The fixed set of primitive types.
///
/// Each primitive lives in the same object space: centered at the origin and
/// inscribed in the cube `[-0.5, 0.5]^3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Sphere,
    Cube,
    Cone,
    Cylinder,
}

impl PrimitiveKind {
    /// Object-space bounds shared by all primitive types.
    pub fn object_bounds(&self) -> Aabb {
        Aabb::from_points(Vec3::splat(-0.5), Vec3::splat(0.5))
    }
}

/// One primitive instance produced by flattening the scene graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapeDesc {
    /// Primitive type
    pub primitive: PrimitiveKind,

    /// Cumulative object-to-world transform
    #[serde(default)]
    pub ctm: Mat4,

    /// Surface material
    #[serde(default)]
    pub material: Material,

    /// Object-space displacement per unit shutter time
    #[serde(default)]
    pub velocity: Vec3,

    /// Texture image bound by the loader (shared, never owned by the renderer)
    #[serde(skip)]
    pub texture: Option<Arc<Texture>>,
}

impl ShapeDesc {
    /// Create a new shape with no motion and no texture.
    pub fn new(primitive: PrimitiveKind, ctm: Mat4, material: Material) -> Self {
        Self {
            primitive,
            ctm,
            material,
            velocity: Vec3::ZERO,
            texture: None,
        }
    }

    /// Set the object-space velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Bind a texture image.
    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// World-space bounds at rest.
    pub fn world_bounds(&self) -> Aabb {
        self.ctm.transform_aabb(&self.primitive.object_bounds())
    }
}

/// Distance falloff `1 / (constant + linear*d + quadratic*d^2)`, capped at 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    pub fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    /// Attenuation factor at distance `d`.
    pub fn factor(&self, d: f32) -> f32 {
        let denom = self.constant + self.linear * d + self.quadratic * d * d;
        if denom <= 0.0 {
            return 1.0;
        }
        (1.0 / denom).min(1.0)
    }
}

/// A world-space light source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Light {
    Point {
        position: Vec3,
        color: Color,
        #[serde(default)]
        attenuation: Attenuation,
    },
    Directional {
        /// Direction the light travels
        direction: Vec3,
        color: Color,
    },
    Spot {
        position: Vec3,
        direction: Vec3,
        color: Color,
        #[serde(default)]
        attenuation: Attenuation,
        /// Outer cone half-angle in radians
        angle: f32,
        /// Width of the falloff band in radians; the inner angle is `angle - penumbra`
        penumbra: f32,
    },
    Area {
        /// Center of the emitting rectangle
        position: Vec3,
        /// Facing direction; the rectangle spans the plane perpendicular to it
        direction: Vec3,
        color: Color,
        #[serde(default)]
        attenuation: Attenuation,
        width: f32,
        height: f32,
    },
}

/// Global illumination weights applied to every material.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalCoefficients {
    /// Ambient weight
    pub ka: f32,
    /// Diffuse weight
    pub kd: f32,
    /// Specular weight, also scales mirror reflection
    pub ks: f32,
    /// Transmission weight
    pub kt: f32,
    /// Multiplier applied to every shape velocity
    pub velocity_scale: f32,
}

impl Default for GlobalCoefficients {
    fn default() -> Self {
        Self {
            ka: 0.5,
            kd: 0.5,
            ks: 0.5,
            kt: 0.0,
            velocity_scale: 1.0,
        }
    }
}

/// Camera parameters as read from the scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDesc {
    pub position: Vec3,
    pub look: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub height_angle: f32,
    /// Lens diameter for depth of field (0 = pinhole)
    pub aperture: f32,
    /// Distance to the plane of perfect focus
    pub focal_length: f32,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            look: Vec3::NEG_Z,
            up: Vec3::Y,
            height_angle: 30.0_f32.to_radians(),
            aperture: 0.0,
            focal_length: 1.0,
        }
    }
}

impl CameraDesc {
    /// Camera at `position` looking toward `target`.
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            position,
            look: target - position,
            up,
            ..Default::default()
        }
    }
}

/// A complete, flattened scene ready to render.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    pub camera: CameraDesc,

    pub globals: GlobalCoefficients,

    pub shapes: Vec<ShapeDesc>,

    pub lights: Vec<Light>,

    /// Lens interfaces in prescription order (object side first)
    pub lens: Vec<LensInterface>,
}

impl SceneDescription {
    /// Create an empty scene.
    pub fn new(width: u32, height: u32, camera: CameraDesc) -> Self {
        Self {
            width,
            height,
            camera,
            ..Default::default()
        }
    }

    /// Add a shape to the scene and return its index.
    pub fn add_shape(&mut self, shape: ShapeDesc) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    /// Add a light to the scene.
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// True when a lens assembly was loaded.
    pub fn has_lens(&self) -> bool {
        !self.lens.is_empty()
    }

    /// Compute the world-space bounding box of all shapes at rest.
    pub fn world_bounds(&self) -> Aabb {
        self.shapes
            .iter()
            .map(ShapeDesc::world_bounds)
            .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, &b))
    }
}
