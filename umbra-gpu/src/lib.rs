//! Common structs, algorithms etc. used by Umbra's shaders and renderer.
//!
//! Everything here compiles both for SPIR-V (through rust-gpu) and for the
//! host, so that kernels can be unit-tested on the CPU.

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::too_many_arguments)]

mod ambient_occlusion;
mod bvh_view;
mod camera;
mod compose;
mod denoise;
mod gbuffer;
mod hit;
mod instance;
mod material;
mod passes;
mod ray;
mod reduce;
mod resample;
mod samples;
mod scene;
mod shader_table;
mod utils;

pub use self::ambient_occlusion::*;
pub use self::bvh_view::*;
pub use self::camera::*;
pub use self::compose::*;
pub use self::denoise::*;
pub use self::gbuffer::*;
pub use self::hit::*;
pub use self::instance::*;
pub use self::material::*;
pub use self::passes::*;
pub use self::ray::*;
pub use self::reduce::*;
pub use self::resample::*;
pub use self::samples::*;
pub use self::scene::*;
pub use self::shader_table::*;
pub use self::utils::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use spirv_std::arch::IndexUnchecked;
    pub use spirv_std::glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::{spirv, Image};

    pub use crate::*;
}

/// Maximum stack size per each invocation when traversing a BVH.
///
/// Affects the maximum depth of a BVH tree (it must not grow deeper than
/// `BVH_STACK_SIZE` levels).
pub const BVH_STACK_SIZE: usize = 32;

pub const UMBRA_EPSILON: f32 = 0.00001;
