use log::debug;
use spirv_std::glam::UVec2;

use super::Bindable;

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Screen-sized storage image.
///
/// Both binders expose the texture as a read-write storage image, since
/// that's what the shaders declare; they're kept separate so that pass
/// definitions document which way the data flows.
#[derive(Debug)]
pub struct Texture {
    size: UVec2,
    tex_view: wgpu::TextureView,
}

impl Texture {
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: UVec2,
    ) -> Self {
        let label = label.as_ref();

        debug!("Allocating texture `{label}`; size={:?}", size);

        assert!(size.x > 0);
        assert!(size.y > 0);

        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label}_tex")),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING,
            view_formats: &[],
        });

        let tex_view = tex.create_view(&Default::default());

        Self { size, tex_view }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn bind_readable(&self) -> impl Bindable + '_ {
        TextureBinder { parent: self }
    }

    pub fn bind_writable(&self) -> impl Bindable + '_ {
        TextureBinder { parent: self }
    }
}

struct TextureBinder<'a> {
    parent: &'a Texture,
}

impl Bindable for TextureBinder<'_> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let tex_layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT
                | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::ReadWrite,
                format: FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        };

        let tex_resource =
            wgpu::BindingResource::TextureView(&self.parent.tex_view);

        vec![(tex_layout, tex_resource)]
    }
}
