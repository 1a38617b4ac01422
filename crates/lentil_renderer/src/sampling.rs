//! Random sampling helpers.

use lentil_math::Vec3;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Generate a random f32 in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    // Top 24 bits give every representable value in [0, 1) with a 2^-24 step
    (rng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Generate a random f32 in [min, max).
#[inline]
pub fn gen_range(rng: &mut dyn RngCore, min: f32, max: f32) -> f32 {
    min + (max - min) * gen_f32(rng)
}

/// Sample a random point in the unit disk (z = 0) by rejection.
pub fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(gen_range(rng, -1.0, 1.0), gen_range(rng, -1.0, 1.0), 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}

/// Deterministic generator for one pixel.
///
/// Mixing the pixel index into the seed makes the output independent of the
/// order pixels are rendered in.
pub fn pixel_rng(seed: u64, pixel_index: u64) -> StdRng {
    let mixed = seed ^ pixel_index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed)
}
