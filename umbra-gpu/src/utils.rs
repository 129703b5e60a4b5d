mod f32_ext;

use glam::{IVec2, UVec2};
use spirv_std::Image;

pub use self::f32_ext::*;

pub type TexRgba32<'a> = &'a Image!(2D, format = rgba32f, sampled = false);

/// Returns whether given point lays inside of a `size`-sized image.
pub fn contains(size: IVec2, pos: IVec2) -> bool {
    pos.x >= 0 && pos.y >= 0 && pos.x < size.x && pos.y < size.y
}

/// Given a point in screen-coordinates, returns a unique index for it; used
/// to index screen-space buffers.
pub fn screen_to_idx(size: UVec2, pos: UVec2) -> usize {
    (pos.y * size.x + pos.x) as usize
}

/// PCG-based integer hash.
pub fn hash(value: u32) -> u32 {
    let state = value.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);

    (word >> 22) ^ word
}
