use umbra_gpu::prelude::*;

/// Picks representative G-buffer texels for the lower-resolution ambient
/// occlusion passes.
#[spirv(compute(threads(8, 8)))]
pub fn downsample_gbuffer(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] src_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] src_d1: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] dst_d0: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 4)] dst_d1: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();

    if !contains(scene.ao_size().as_ivec2(), screen_pos) {
        return;
    }

    let src_surface_map = SurfaceMap::new(src_d0);

    let src_pos = umbra_gpu::downsample_gbuffer(
        screen_pos,
        scene.render_size().as_ivec2(),
        |pos| src_surface_map.get(pos.as_uvec2()),
    );

    unsafe {
        dst_d0.write(screen_pos, src_d0.read(src_pos));
        dst_d1.write(screen_pos, src_d1.read(src_pos));
    }
}

#[spirv(compute(threads(8, 8)))]
pub fn upsample_bilateral(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &UpsamplingPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] lo_surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] hi_surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] input: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 4)] output: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();

    if !contains(scene.render_size().as_ivec2(), screen_pos) {
        return;
    }

    let lo_surface_map = SurfaceMap::new(lo_surface_map);
    let hi_surface_map = SurfaceMap::new(hi_surface_map);

    let value = umbra_gpu::upsample_bilateral(
        screen_pos,
        params.scale,
        scene.ao_size().as_ivec2(),
        hi_surface_map.get(screen_pos.as_uvec2()),
        params.sigma_depth,
        params.sigma_normal,
        |pos| (input.read(pos), lo_surface_map.get(pos.as_uvec2())),
    );

    unsafe {
        output.write(screen_pos, value);
    }
}

/// Resolves the supersampled image by averaging 2x2 blocks.
#[spirv(compute(threads(8, 8)))]
pub fn downsample_box(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] input: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] output: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();
    let src_size = scene.render_size().as_ivec2();

    if !contains(src_size / 2, screen_pos) {
        return;
    }

    let value = umbra_gpu::downsample_box(screen_pos, src_size, |pos| {
        input.read(pos)
    });

    unsafe {
        output.write(screen_pos, value);
    }
}

/// Resolves the supersampled image with a gaussian kernel.
#[spirv(compute(threads(8, 8)))]
pub fn downsample_gaussian(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &DownsamplingPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] input: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] output: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();
    let src_size = scene.render_size().as_ivec2();

    if !contains(src_size / 2, screen_pos) {
        return;
    }

    let value = umbra_gpu::downsample_gaussian(
        screen_pos,
        src_size,
        params.taps,
        |pos| input.read(pos),
    );

    unsafe {
        output.write(screen_pos, value);
    }
}
