use umbra_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)] tlas: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 2, storage_buffer)] blas: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 3, storage_buffer)]
    shader_tables: &[u32],
    #[spirv(descriptor_set = 0, binding = 4, storage_buffer)] samples: &[Vec4],
    #[spirv(descriptor_set = 0, binding = 5)] gbuffer_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 6)] gbuffer_d1: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 7)] ao: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 8, storage_buffer)]
    ray_hits: &mut [u32],
) {
    let screen_pos = global_id.xy();
    let screen_size = scene.ao_size();

    if screen_pos.x >= screen_size.x || screen_pos.y >= screen_size.y {
        return;
    }

    let screen_idx = screen_to_idx(screen_size, screen_pos);

    let gbuffer = GBufferEntry::unpack([
        gbuffer_d0.read(screen_pos),
        gbuffer_d1.read(screen_pos),
    ]);

    if !gbuffer.is_some() {
        unsafe {
            ao.write(screen_pos, vec4(1.0, 0.0, 0.0, 0.0));
        }

        ray_hits[screen_idx] = 0;
        return;
    }

    let tables = ShaderTableView::new(
        shader_tables,
        scene.shader_table_offsets,
        scene.shader_table_strides,
    );

    let miss = tables.miss(tables.raygen(RAYGEN_AMBIENT_OCCLUSION).miss_index);
    let bvh = BvhView::new(tlas, blas);

    let sets = SampleSets::new(
        samples,
        scene.sample_set_count(),
        scene.samples_per_set(),
    );

    let occlusion = trace_ambient_occlusion(
        bvh,
        sets,
        sets.set_for(screen_pos, scene.frame()),
        scene,
        gbuffer.position,
        gbuffer.normal,
        miss.value,
    );

    unsafe {
        ao.write(screen_pos, vec4(occlusion.visibility, 0.0, 0.0, 0.0));
    }

    ray_hits[screen_idx] = occlusion.hits;
}
