use umbra_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn estimate_variance(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &VarianceEstimationPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] raw_ao: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] output: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();
    let screen_size = scene.ao_size().as_ivec2();

    if !contains(screen_size, screen_pos) {
        return;
    }

    let surface_map = SurfaceMap::new(surface_map);

    let variance = umbra_gpu::estimate_variance(
        screen_pos,
        screen_size,
        params.radius as i32,
        |pos| (raw_ao.read(pos).x, surface_map.get(pos.as_uvec2())),
    );

    unsafe {
        output.write(
            screen_pos,
            vec4(raw_ao.read(screen_pos).x, variance, 0.0, 0.0),
        );
    }
}

#[spirv(compute(threads(8, 8)))]
pub fn wavelet(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &WaveletPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] input: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] output: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();
    let screen_size = scene.ao_size().as_ivec2();

    if !contains(screen_size, screen_pos) {
        return;
    }

    let surface_map = SurfaceMap::new(surface_map);

    let filtered = atrous_filter(screen_pos, screen_size, params, |pos| {
        (input.read(pos).xy(), surface_map.get(pos.as_uvec2()))
    });

    unsafe {
        output.write(screen_pos, filtered.extend(0.0).extend(0.0));
    }
}

#[spirv(compute(threads(8, 8)))]
pub fn gaussian(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &GaussianPassParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] scene: &Scene,
    #[spirv(descriptor_set = 0, binding = 1)] surface_map: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 2)] input: TexRgba32,
    #[spirv(descriptor_set = 0, binding = 3)] output: TexRgba32,
) {
    let screen_pos = global_id.xy().as_ivec2();
    let screen_size = scene.ao_size().as_ivec2();

    if !contains(screen_size, screen_pos) {
        return;
    }

    let surface_map = SurfaceMap::new(surface_map);

    let direction = if params.direction == 0 {
        IVec2::X
    } else {
        IVec2::Y
    };

    let blurred = gaussian_blur(screen_pos, screen_size, direction, |pos| {
        (input.read(pos), surface_map.get(pos.as_uvec2()))
    });

    unsafe {
        output.write(screen_pos, blurred);
    }
}
