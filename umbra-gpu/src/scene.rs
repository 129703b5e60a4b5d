use bytemuck::{Pod, Zeroable};
use glam::{UVec2, UVec4, Vec3, Vec4, Vec4Swizzles};

use crate::Camera;

pub const VIEW_MODE_COMPOSED: u32 = 0;
pub const VIEW_MODE_AMBIENT_OCCLUSION: u32 = 1;
pub const VIEW_MODE_RAW_AMBIENT_OCCLUSION: u32 = 2;
pub const VIEW_MODE_NORMALS: u32 = 3;
pub const VIEW_MODE_DEPTH: u32 = 4;
pub const VIEW_MODE_VARIANCE: u32 = 5;

/// Per-frame scene constants, shared by all of the passes.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Scene {
    pub camera: Camera,

    /// x, y, z - direction towards the light
    /// w - light's intensity
    pub light: Vec4,

    /// x, y, z - light's color
    /// w - intensity of the ambient term
    pub light_color: Vec4,

    /// x, y, z - color of pixels that didn't hit anything
    pub background: Vec4,

    /// x - maximum distance of occlusion rays
    /// y - minimum distance of occlusion rays
    pub ao_range: Vec4,

    /// x - occlusion rays per pixel
    /// y - frame number
    /// z - number of sample sets
    /// w - number of samples per set
    pub ao_sampling: UVec4,

    /// x, y - size of the G-buffer
    /// z, w - size of the ambient occlusion buffers
    pub resolution: UVec4,

    /// x, y, z - offsets (in words) of ray-generation, hit-group and miss
    ///           tables
    /// w - number of ray types
    pub shader_table_offsets: UVec4,

    /// x, y, z - strides (in words) of ray-generation, hit-group and miss
    ///           tables
    pub shader_table_strides: UVec4,

    /// x - view mode (one of `VIEW_MODE_*`)
    pub view: UVec4,
}

impl Scene {
    pub fn light_direction(&self) -> Vec3 {
        self.light.xyz()
    }

    pub fn light_intensity(&self) -> f32 {
        self.light.w
    }

    pub fn ambient(&self) -> f32 {
        self.light_color.w
    }

    pub fn ao_max_distance(&self) -> f32 {
        self.ao_range.x
    }

    pub fn ao_min_distance(&self) -> f32 {
        self.ao_range.y
    }

    pub fn spp(&self) -> u32 {
        self.ao_sampling.x
    }

    pub fn frame(&self) -> u32 {
        self.ao_sampling.y
    }

    pub fn sample_set_count(&self) -> u32 {
        self.ao_sampling.z
    }

    pub fn samples_per_set(&self) -> u32 {
        self.ao_sampling.w
    }

    pub fn render_size(&self) -> UVec2 {
        self.resolution.xy()
    }

    pub fn ao_size(&self) -> UVec2 {
        self.resolution.zw()
    }

    pub fn view_mode(&self) -> u32 {
        self.view.x
    }
}
