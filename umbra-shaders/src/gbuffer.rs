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
    #[spirv(descriptor_set = 0, binding = 4)] gbuffer_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 5)] gbuffer_d1: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 6, storage_buffer)]
    ray_hits: &mut [u32],
) {
    let screen_pos = global_id.xy();
    let screen_size = scene.render_size();

    if screen_pos.x >= screen_size.x || screen_pos.y >= screen_size.y {
        return;
    }

    let tables = ShaderTableView::new(
        shader_tables,
        scene.shader_table_offsets,
        scene.shader_table_strides,
    );

    let raygen = tables.raygen(RAYGEN_GBUFFER);
    let ray = scene.camera.ray(screen_pos);
    let hit = BvhView::new(tlas, blas).trace_nearest(ray, 0.0, f32::MAX);

    let entry = if hit.is_some() {
        let record = tables.hit_group(hit.hit_group_index, raygen.ray_type);
        let mut normal = hit.normal;

        if normal.dot(ray.direction()) > 0.0 {
            normal = -normal;
        }

        GBufferEntry {
            normal,
            depth: hit.distance,
            position: ray.at(hit.distance),
            material_id: record.material_id,
        }
    } else {
        GBufferEntry {
            depth: tables.miss(raygen.miss_index).value,
            ..Default::default()
        }
    };

    let [d0, d1] = entry.pack();

    unsafe {
        gbuffer_d0.write(screen_pos, d0);
        gbuffer_d1.write(screen_pos, d1);
    }

    ray_hits[screen_to_idx(screen_size, screen_pos)] = hit.is_some() as u32;
}
