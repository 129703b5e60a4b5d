#![cfg_attr(target_arch = "spirv", no_std)]

pub mod ambient_occlusion;
pub mod compose;
pub mod denoising;
pub mod gbuffer;
pub mod output_drawing;
pub mod reduce_sum;
pub mod resampling;
