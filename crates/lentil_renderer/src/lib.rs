//! Lentil Renderer - recursive Whitted ray tracing on the CPU
//!
//! Renders a flattened `SceneDescription` of unit primitives (sphere, cube,
//! cone, cylinder) with Phong shading, shadows, mirror reflection and
//! refraction. Rays can be generated by a pinhole, a thin lens with depth of
//! field, a motion-blurred shutter, adaptive super-sampling or a traced
//! compound lens.

mod bucket;
mod camera;
mod cone;
mod cube;
mod cylinder;
mod kdtree;
mod lens;
mod lighting;
mod renderer;
mod sampling;
mod shape;
mod sphere;

pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use kdtree::{KdNode, KdStats, KdTree, DEFAULT_MAX_DEPTH};
pub use lens::{refract, LensSystem};
pub use lighting::{shade, spot_intensity, Occlusion, ShadingOptions, SurfacePoint, RAY_EPSILON};
pub use renderer::{
    color_to_rgba, render, render_image, RenderConfig, RenderError, RenderResult, RenderScene,
    Strategy, BACKGROUND,
};
pub use sampling::pixel_rng;
pub use shape::{Hit, Shape, ShapeId};

/// Re-export the scene types renderers are driven with
pub use lentil_core::{Color, Light, Material, PrimitiveKind, SceneDescription, ShapeDesc};
pub use lentil_math::{Aabb, Ray, Vec3};
