//! Lentil Core - renderer-agnostic scene data.
//!
//! This crate provides:
//!
//! - **Scene description types**: `SceneDescription`, `ShapeDesc`, `Material`,
//!   `Light`, `CameraDesc`, already flattened into world space by whatever
//!   loader produced them
//! - **Textures**: RGBA8 images shared between primitives, with a loading cache
//! - **Lens prescriptions**: parsing of compound-lens interface tables
//!
//! # Example
//!
//! ```ignore
//! use lentil_core::{load_lens_file, SceneDescription, TextureCache};
//!
//! let mut scene: SceneDescription = serde_json::from_str(&json)?;
//! scene.lens = load_lens_file("wide.22mm.dat")?;
//!
//! let mut textures = TextureCache::with_base_dir("assets");
//! textures.attach_textures(&mut scene.shapes);
//! ```

pub mod lens;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use lens::{load_lens_file, parse_lens_prescription, LensError, LensInterface, LensResult};
pub use scene::{
    Attenuation, CameraDesc, Color, GlobalCoefficients, Light, Material, PrimitiveKind,
    SceneDescription, ShapeDesc, TextureMap,
};
pub use texture::{Texture, TextureCache, TextureError, TextureResult};
