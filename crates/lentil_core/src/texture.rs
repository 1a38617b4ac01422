//! Texture loading and caching for materials.
//!
//! Textures are decoded once into RGBA8 and shared between every shape whose
//! material names the same file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lentil_math::Vec3;
use thiserror::Error;

use crate::scene::ShapeDesc;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Failed to load texture: {0}")]
    LoadError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A decoded texture image.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data as [R, G, B, A] bytes, row-major with row 0 at the top
    pub pixels: Vec<[u8; 4]>,

    /// Original file path (for debugging)
    pub path: String,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 4]>, path: impl Into<String>) -> Self {
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Color at integer pixel coordinates, in [0, 1].
    pub fn texel(&self, x: u32, y: u32) -> Vec3 {
        let idx = (y as usize) * (self.width as usize) + x as usize;
        let p = self.pixels.get(idx).copied().unwrap_or([0, 0, 0, 255]);
        Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32) / 255.0
    }

    /// Nearest-texel lookup.
    ///
    /// `v = 0` is the bottom row of the image. Coordinates wrap, so a repeat
    /// count of `n` tiles the image `n` times across the unit range. The edges
    /// `u = 1` and `v = 0` map to the last column and row instead of wrapping
    /// back to the first.
    pub fn sample_nearest(&self, u: f32, v: f32, repeat_u: f32, repeat_v: f32) -> Vec3 {
        if self.width == 0 || self.height == 0 {
            return Vec3::ZERO;
        }
        let w = self.width as i64;
        let h = self.height as i64;

        let x = if u == 1.0 {
            w - 1
        } else {
            ((u * repeat_u * w as f32).floor() as i64).rem_euclid(w)
        };
        let y = if v == 0.0 {
            h - 1
        } else {
            (((1.0 - v) * repeat_v * h as f32).floor() as i64).rem_euclid(h)
        };

        self.texel(x as u32, y as u32)
    }

    /// Bilinear lookup with the same wrapping as `sample_nearest`.
    pub fn sample_bilinear(&self, u: f32, v: f32, repeat_u: f32, repeat_v: f32) -> Vec3 {
        if self.width == 0 || self.height == 0 {
            return Vec3::ZERO;
        }
        let w = self.width as i64;
        let h = self.height as i64;

        // Texel centers sit at half-integer coordinates
        let x = u * repeat_u * w as f32 - 0.5;
        let y = (1.0 - v) * repeat_v * h as f32 - 0.5;

        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let wrap = |c: i64, n: i64| c.rem_euclid(n) as u32;
        let x0i = x0 as i64;
        let y0i = y0 as i64;

        let p00 = self.texel(wrap(x0i, w), wrap(y0i, h));
        let p10 = self.texel(wrap(x0i + 1, w), wrap(y0i, h));
        let p01 = self.texel(wrap(x0i, w), wrap(y0i + 1, h));
        let p11 = self.texel(wrap(x0i + 1, w), wrap(y0i + 1, h));

        let top = p00.lerp(p10, fx);
        let bottom = p01.lerp(p11, fx);
        top.lerp(bottom, fy)
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<[u8; 4]>()
    }
}

/// Cache for loaded textures.
///
/// Textures are loaded on-demand and cached for reuse.
pub struct TextureCache {
    /// Cached textures by file path
    textures: HashMap<String, Arc<Texture>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: None,
        }
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str) -> TextureResult<Arc<Texture>> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let full_path = self.resolve_path(path);
        let texture = Arc::new(load_texture_file(&full_path)?);
        self.textures.insert(path.to_string(), texture.clone());

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(texture)
    }

    /// Bind textures to every shape whose material names one.
    ///
    /// A file that fails to load is logged and the shape renders untextured.
    /// Returns the number of shapes that received a texture.
    pub fn attach_textures(&mut self, shapes: &mut [ShapeDesc]) -> usize {
        let mut bound = 0;
        for shape in shapes.iter_mut() {
            let Some(map) = shape.material.texture_map.as_ref() else {
                continue;
            };
            if map.filename.is_empty() {
                continue;
            }
            match self.load(&map.filename) {
                Ok(texture) => {
                    shape.texture = Some(texture);
                    bound += 1;
                }
                Err(e) => {
                    log::warn!("Texture '{}' unavailable, rendering untextured: {}", map.filename, e);
                    shape.texture = None;
                }
            }
        }
        bound
    }

    /// Get the number of cached textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = &self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode a texture file into RGBA8.
fn load_texture_file(path: &Path) -> TextureResult<Texture> {
    let bytes = std::fs::read(path)?;
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    if width == 0 || height == 0 {
        return Err(TextureError::LoadError(format!(
            "{} has no pixels",
            path.display()
        )));
    }

    let pixels: Vec<[u8; 4]> = rgba.pixels().map(|p| p.0).collect();

    Ok(Texture::new(
        width,
        height,
        pixels,
        path.to_string_lossy().to_string(),
    ))
}
