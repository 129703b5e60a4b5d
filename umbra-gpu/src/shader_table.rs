use glam::UVec4;
use spirv_std::arch::IndexUnchecked;

/// Alignment (in bytes) every shader record's stride is rounded up to.
pub const SHADER_RECORD_ALIGNMENT: u32 = 32;

pub const RAY_TYPE_RADIANCE: u32 = 0;
pub const RAY_TYPE_OCCLUSION: u32 = 1;
pub const RAY_TYPE_COUNT: u32 = 2;

pub const RAYGEN_GBUFFER: u32 = 0;
pub const RAYGEN_AMBIENT_OCCLUSION: u32 = 1;

pub const SHADER_RAYGEN_GBUFFER: u32 = 1;
pub const SHADER_RAYGEN_AMBIENT_OCCLUSION: u32 = 2;
pub const SHADER_HIT_TRIANGLE: u32 = 3;
pub const SHADER_HIT_AABB: u32 = 4;
pub const SHADER_HIT_OCCLUSION: u32 = 5;
pub const SHADER_MISS_RADIANCE: u32 = 6;
pub const SHADER_MISS_OCCLUSION: u32 = 7;

/// Returns stride (in words) of a table whose largest record has given size
/// (in words).
pub const fn shader_record_stride(words: u32) -> u32 {
    let bytes = words * 4;
    let bytes = (bytes + SHADER_RECORD_ALIGNMENT - 1) / SHADER_RECORD_ALIGNMENT
        * SHADER_RECORD_ALIGNMENT;

    bytes / 4
}

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq, Eq))]
pub struct RayGenRecord {
    pub shader: u32,
    pub ray_type: u32,
    pub miss_index: u32,
}

impl RayGenRecord {
    pub const WORDS: u32 = 3;

    pub fn encode(&self) -> [u32; 3] {
        [self.shader, self.ray_type, self.miss_index]
    }

    pub fn decode(get: impl Fn(u32) -> u32, ptr: u32) -> Self {
        Self {
            shader: get(ptr),
            ray_type: get(ptr + 1),
            miss_index: get(ptr + 2),
        }
    }
}

/// Local arguments of a hit group, i.e. everything the hit shaders need to
/// know about the instance that got hit.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq, Eq))]
pub struct HitGroupRecord {
    pub shader: u32,
    pub material_id: u32,
    pub blas_ptr: u32,
    pub instance_id: u32,
    pub geometry_kind: u32,
}

impl HitGroupRecord {
    pub const WORDS: u32 = 5;

    pub fn encode(&self) -> [u32; 5] {
        [
            self.shader,
            self.material_id,
            self.blas_ptr,
            self.instance_id,
            self.geometry_kind,
        ]
    }

    pub fn decode(get: impl Fn(u32) -> u32, ptr: u32) -> Self {
        Self {
            shader: get(ptr),
            material_id: get(ptr + 1),
            blas_ptr: get(ptr + 2),
            instance_id: get(ptr + 3),
            geometry_kind: get(ptr + 4),
        }
    }
}

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct MissRecord {
    pub shader: u32,

    /// Depth reported by radiance rays or visibility reported by occlusion
    /// rays
    pub value: f32,
}

impl MissRecord {
    pub const WORDS: u32 = 2;

    pub fn encode(&self) -> [u32; 2] {
        [self.shader, self.value.to_bits()]
    }

    pub fn decode(get: impl Fn(u32) -> u32, ptr: u32) -> Self {
        Self {
            shader: get(ptr),
            value: f32::from_bits(get(ptr + 1)),
        }
    }
}

/// View over the shader tables, laid out back-to-back in a single buffer.
#[derive(Clone, Copy)]
pub struct ShaderTableView<'a> {
    words: &'a [u32],
    offsets: UVec4,
    strides: UVec4,
}

impl<'a> ShaderTableView<'a> {
    pub fn new(words: &'a [u32], offsets: UVec4, strides: UVec4) -> Self {
        Self {
            words,
            offsets,
            strides,
        }
    }

    fn get(&self, ptr: u32) -> u32 {
        unsafe { *self.words.index_unchecked(ptr as usize) }
    }

    pub fn raygen(&self, idx: u32) -> RayGenRecord {
        RayGenRecord::decode(
            |ptr| self.get(ptr),
            self.offsets.x + idx * self.strides.x,
        )
    }

    /// Returns the hit group for given instance contribution and ray type.
    pub fn hit_group(
        &self,
        hit_group_index: u32,
        ray_type: u32,
    ) -> HitGroupRecord {
        HitGroupRecord::decode(
            |ptr| self.get(ptr),
            self.offsets.y + (hit_group_index + ray_type) * self.strides.y,
        )
    }

    pub fn miss(&self, idx: u32) -> MissRecord {
        MissRecord::decode(
            |ptr| self.get(ptr),
            self.offsets.z + idx * self.strides.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use glam::uvec4;

    use super::*;

    #[test]
    fn stride_is_aligned() {
        assert_eq!(8, shader_record_stride(RayGenRecord::WORDS));
        assert_eq!(8, shader_record_stride(HitGroupRecord::WORDS));
        assert_eq!(8, shader_record_stride(8));
        assert_eq!(16, shader_record_stride(9));
    }

    #[test]
    fn view() {
        let mut words = vec![0; 8 + 4 * 8 + 8];

        words[..3].copy_from_slice(
            &RayGenRecord {
                shader: SHADER_RAYGEN_GBUFFER,
                ray_type: RAY_TYPE_RADIANCE,
                miss_index: 0,
            }
            .encode(),
        );

        for i in 0..4 {
            let ptr = 8 + i * 8;

            words[ptr..ptr + 5].copy_from_slice(
                &HitGroupRecord {
                    shader: SHADER_HIT_TRIANGLE,
                    material_id: i as u32 / 2,
                    blas_ptr: 100,
                    instance_id: i as u32 / 2,
                    geometry_kind: 0,
                }
                .encode(),
            );
        }

        words[40..42].copy_from_slice(
            &MissRecord {
                shader: SHADER_MISS_OCCLUSION,
                value: 1.0,
            }
            .encode(),
        );

        let view =
            ShaderTableView::new(&words, uvec4(0, 8, 40, 2), uvec4(8, 8, 8, 0));

        assert_eq!(SHADER_RAYGEN_GBUFFER, view.raygen(0).shader);
        assert_eq!(1, view.hit_group(2, RAY_TYPE_OCCLUSION).instance_id);
        assert_eq!(0, view.hit_group(0, RAY_TYPE_OCCLUSION).material_id);
        assert_eq!(1.0, view.miss(0).value);
    }
}
