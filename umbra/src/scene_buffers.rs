use std::mem;

use spirv_std::glam::Vec4;

use crate::{
    gpu, AccelerationStructures, FrameSlot, MappedStorageBuffer,
    MappedUniformBuffer, Materials, PerFrame, RendererConfig, Result,
    SampleSets, ShaderTables, Tlas, FRAME_COUNT, MAX_SAMPLES,
};

/// Scene-wide GPU resources: scene constants, acceleration structures,
/// shader tables, samples and materials.
///
/// Resources the host rewrites every frame (scene constants and the
/// top-level structure) exist in one version per frame in flight.
#[derive(Debug)]
pub struct SceneBuffers {
    pub scene: PerFrame<MappedUniformBuffer<gpu::Scene>>,
    pub tlas: PerFrame<MappedStorageBuffer<Vec<Vec4>>>,
    pub blas: MappedStorageBuffer<Vec<Vec4>>,
    pub shader_tables: MappedStorageBuffer<Vec<u32>>,
    pub samples: MappedStorageBuffer<Vec<Vec4>>,
    pub materials: MappedStorageBuffer<Vec<gpu::Material>>,
    tlas_versions: [Option<u64>; FRAME_COUNT],
    blas_version: Option<u64>,
}

impl SceneBuffers {
    pub fn new(device: &wgpu::Device, config: &RendererConfig) -> Self {
        let vec4_size = mem::size_of::<Vec4>();

        let scene = PerFrame::new(|idx| {
            MappedUniformBuffer::new_default(
                device,
                format!("umbra_scene_{idx}"),
            )
        });

        let tlas = PerFrame::new(|idx| {
            MappedStorageBuffer::new_default(
                device,
                format!("umbra_tlas_{idx}"),
                Tlas::max_serialized_len(config.max_instances) * vec4_size,
            )
        });

        let blas = MappedStorageBuffer::new_default(
            device,
            "umbra_blas",
            config.max_blas_memory,
        );

        let shader_tables = MappedStorageBuffer::new_default(
            device,
            "umbra_shader_tables",
            ShaderTables::max_serialized_len(config.max_instances)
                * mem::size_of::<u32>(),
        );

        let samples = MappedStorageBuffer::new_default(
            device,
            "umbra_samples",
            MAX_SAMPLES * vec4_size,
        );

        let materials = MappedStorageBuffer::new_default(
            device,
            "umbra_materials",
            config.max_materials * mem::size_of::<gpu::Material>(),
        );

        Self {
            scene,
            tlas,
            blas,
            shader_tables,
            samples,
            materials,
            tlas_versions: Default::default(),
            blas_version: None,
        }
    }

    /// Uploads acceleration structures that have changed since the given
    /// slot was last used.
    pub fn upload_structures(
        &mut self,
        queue: &wgpu::Queue,
        slot: FrameSlot,
        structures: &AccelerationStructures,
    ) -> Result<()> {
        if self.blas_version != Some(structures.blas_version()) {
            *self.blas = structures.blas_data().to_vec();
            self.blas.flush(queue)?;
            self.blas_version = Some(structures.blas_version());
        }

        let tlas_version = &mut self.tlas_versions[slot.index()];

        if *tlas_version != Some(structures.tlas_version()) {
            let tlas = self.tlas.get_mut(slot);

            **tlas = structures.tlas_data().to_vec();
            tlas.flush(queue)?;

            *tlas_version = Some(structures.tlas_version());
        }

        Ok(())
    }

    pub fn upload_shader_tables(
        &mut self,
        queue: &wgpu::Queue,
        words: Vec<u32>,
    ) -> Result<()> {
        *self.shader_tables = words;
        self.shader_tables.flush(queue)
    }

    pub fn upload_samples(
        &mut self,
        queue: &wgpu::Queue,
        samples: &SampleSets,
    ) -> Result<()> {
        *self.samples = samples.samples().to_vec();
        self.samples.flush(queue)
    }

    pub fn upload_materials(
        &mut self,
        queue: &wgpu::Queue,
        materials: &mut Materials,
    ) -> Result<()> {
        if let Some(items) = materials.take_dirty() {
            *self.materials = items.to_vec();
            self.materials.flush(queue)?;
        }

        Ok(())
    }

    pub fn upload_scene(
        &mut self,
        queue: &wgpu::Queue,
        slot: FrameSlot,
        scene: gpu::Scene,
    ) {
        let buffer = self.scene.get_mut(slot);

        **buffer = scene;
        buffer.flush(queue);
    }

    /// Forgets what's been uploaded, so that everything gets re-uploaded
    /// during the next frame.
    pub fn invalidate(&mut self) {
        self.tlas_versions = Default::default();
        self.blas_version = None;
    }
}
