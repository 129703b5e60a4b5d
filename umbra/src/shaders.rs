use log::info;

/// Compiled shader module together with its entry point.
pub type Shader = (wgpu::ShaderModule, &'static str);

macro_rules! shaders {
    ([ $( $name:ident, )* ]) => {
        #[derive(Debug)]
        pub struct Shaders {
            $( pub $name: Shader, )*
        }

        impl Shaders {
            pub fn new(device: &wgpu::Device) -> Self {
                info!("Initializing shaders");

                Self {
                    $(
                        $name: {
                            let module = device.create_shader_module(
                                wgpu::ShaderModuleDescriptor {
                                    label: Some(concat!(
                                        "umbra_",
                                        stringify!($name)
                                    )),
                                    source: wgpu::util::make_spirv(
                                        include_bytes!(env!(concat!(
                                            "umbra_shaders::",
                                            stringify!($name),
                                            ".path"
                                        ))),
                                    ),
                                },
                            );

                            let entry_point = env!(concat!(
                                "umbra_shaders::",
                                stringify!($name),
                                ".entry_point"
                            ));

                            (module, entry_point)
                        },
                    )*
                }
            }
        }
    };
}

shaders!([
    ambient_occlusion,
    compose,
    denoising_estimate_variance,
    denoising_gaussian,
    denoising_wavelet,
    gbuffer,
    output_drawing_main_fs,
    output_drawing_main_vs,
    reduce_sum,
    resampling_downsample_box,
    resampling_downsample_gaussian,
    resampling_downsample_gbuffer,
    resampling_upsample_bilateral,
]);
