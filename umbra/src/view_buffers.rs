use fxhash::FxHashMap;
use log::debug;

use crate::schedule::{AO_RAY_HITS, CAMERA_RAY_HITS};
use crate::{
    Error, ResourceId, Result, Schedule, Texture, UnmappedStorageBuffer,
};

/// Window-size-dependent resources: the G-buffer, ambient occlusion buffers,
/// the composed image and the per-pixel ray-hit masks.
///
/// Recreated (after the GPU goes idle) whenever the resolution or the
/// configuration changes.
#[derive(Debug)]
pub struct ViewBuffers {
    textures: FxHashMap<ResourceId, Texture>,
    camera_ray_hits: UnmappedStorageBuffer,
    ao_ray_hits: UnmappedStorageBuffer,
}

impl ViewBuffers {
    pub fn new(device: &wgpu::Device, schedule: &Schedule) -> Self {
        let res = schedule.resolutions();

        debug!(
            "Allocating view buffers; output={}, render={}, ao={}",
            res.output, res.render, res.ao
        );

        let textures = schedule
            .textures()
            .into_iter()
            .map(|(id, size)| {
                (id, Texture::new(device, format!("umbra_{id}"), size))
            })
            .collect();

        let camera_ray_hits = UnmappedStorageBuffer::new(
            device,
            format!("umbra_{CAMERA_RAY_HITS}"),
            (res.render_pixels() as usize) * 4,
        );

        let ao_ray_hits = UnmappedStorageBuffer::new(
            device,
            format!("umbra_{AO_RAY_HITS}"),
            (res.ao_pixels() as usize) * 4,
        );

        Self {
            textures,
            camera_ray_hits,
            ao_ray_hits,
        }
    }

    /// Returns texture for given resource, as requested by `pass`.
    pub fn texture(
        &self,
        pass: &'static str,
        id: ResourceId,
    ) -> Result<&Texture> {
        self.textures.get(&id).ok_or(Error::InvalidAccess {
            pass,
            resource: id.name(),
        })
    }

    pub fn camera_ray_hits(&self) -> &UnmappedStorageBuffer {
        &self.camera_ray_hits
    }

    pub fn ao_ray_hits(&self) -> &UnmappedStorageBuffer {
        &self.ao_ray_hits
    }
}
