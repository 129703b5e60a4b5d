use umbra_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
#[allow(clippy::too_many_arguments)]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    materials: &[Material],
    #[spirv(descriptor_set = 0, binding = 2)] gbuffer_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] gbuffer_d1: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 4)] ao: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 5)] raw_ao: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 6)] ao_variance: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 7)] output: TexRgba32,
) {
    let screen_pos = global_id.xy();
    let screen_size = scene.render_size();

    if screen_pos.x >= screen_size.x || screen_pos.y >= screen_size.y {
        return;
    }

    let gbuffer = GBufferEntry::unpack([
        gbuffer_d0.read(screen_pos),
        gbuffer_d1.read(screen_pos),
    ]);

    let base_color = if gbuffer.is_some() {
        unsafe {
            materials
                .index_unchecked(gbuffer.material_id as usize)
                .base_color
                .xyz()
        }
    } else {
        Vec3::ZERO
    };

    // Raw ambient occlusion and its variance can live in a smaller image
    let ao_pos = (screen_pos * scene.ao_size()) / screen_size;

    let color = compose(
        scene,
        &gbuffer,
        base_color,
        ao.read(screen_pos).x,
        raw_ao.read(ao_pos).x,
        ao_variance.read(ao_pos).y,
    );

    unsafe {
        output.write(screen_pos, color);
    }
}
