//! Real-time raytraced ambient occlusion.
//!
//! Scene (geometries, instances, materials) lives on the host, which builds
//! acceleration structures and shader tables out of it; every frame is then
//! raytraced at a few samples per pixel and denoised on the GPU.
//!
//! The host application owns the window, the device and the camera - it
//! drives [`Renderer`] through the [`Pipeline`] trait.

#![allow(clippy::too_many_arguments)]

mod acceleration;
mod buffers;
mod bvh;
mod camera;
mod config;
mod error;
mod frames;
mod geometry;
mod instances;
mod materials;
mod passes;
mod requests;
mod resources;
mod samples;
mod scene_buffers;
mod schedule;
mod shader_table;
mod shaders;
mod stats;
mod utils;
mod view_buffers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use derivative::Derivative;
use glam::{uvec4, vec4, UVec2, UVec4};
use log::{debug, info, trace, warn};
pub use umbra_gpu as gpu;

pub use self::acceleration::*;
pub(crate) use self::buffers::*;
pub(crate) use self::bvh::*;
pub use self::camera::*;
pub use self::config::*;
pub use self::error::*;
pub use self::frames::*;
pub use self::geometry::*;
pub use self::instances::*;
pub use self::materials::*;
pub(crate) use self::passes::*;
pub use self::requests::*;
pub use self::resources::*;
pub use self::samples::*;
pub(crate) use self::scene_buffers::*;
pub use self::schedule::{Resolutions, Schedule, Step};
pub use self::shader_table::*;
pub(crate) use self::shaders::*;
pub use self::stats::*;
pub use self::utils::*;
pub(crate) use self::view_buffers::*;

/// Device and queue the renderer works with.
///
/// Creating them (together with the surface) is up to the application; see
/// [`Renderer::required_features()`] and [`Renderer::required_limits()`].
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

/// Lifecycle of a rendering pipeline, as driven by the application.
pub trait Pipeline {
    /// Prepares everything needed to render the first frame.
    fn initialize(&mut self, ctx: &Context) -> Result<()>;

    /// Handles pending requests and brings acceleration structures and
    /// shader tables up to date with the scene.
    fn update(
        &mut self,
        ctx: &Context,
        camera: &Camera,
        frame_time: Duration,
    ) -> Result<()>;

    /// Records and submits a frame, drawing it onto `target`.
    fn render(
        &mut self,
        ctx: &Context,
        target: &wgpu::TextureView,
    ) -> Result<()>;

    /// Recreates window-size-dependent resources.
    fn resize(&mut self, ctx: &Context, size: UVec2) -> Result<()>;
}

/// Raytraced ambient occlusion renderer.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Renderer {
    config: RendererConfig,
    format: wgpu::TextureFormat,
    output_size: UVec2,
    shaders: Shaders,
    geometries: Geometries,
    instances: Instances,
    materials: Materials,
    structures: AccelerationStructures,
    shader_tables: ShaderTableBuilder,
    shader_table_layout: (UVec4, UVec4),

    #[derivative(Debug = "ignore")]
    samples: Option<SampleSets>,

    requests: RequestQueue,
    frames: FrameResourcePool,
    timeline: GpuTimeline,
    scene: SceneBuffers,
    view: Option<View>,
    camera: Camera,
    frame: u64,
    report: BuildReport,
    stats: Stats,
    device_errors: Arc<Mutex<Vec<String>>>,
}

/// Window-size-dependent part of the renderer.
#[derive(Debug)]
struct View {
    schedule: Schedule,
    passes: Passes,

    // Kept alive for the passes' bind groups
    _buffers: ViewBuffers,
}

impl Renderer {
    /// Features the device has to be created with.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::PUSH_CONSTANTS
            | wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
    }

    /// Limits the device has to be created with.
    pub fn required_limits(config: &RendererConfig) -> wgpu::Limits {
        wgpu::Limits {
            max_push_constant_size: 16,
            max_storage_textures_per_shader_stage: 8,
            max_storage_buffer_binding_size: config
                .max_blas_memory
                .max(128 << 20) as u32,
            ..Default::default()
        }
    }

    pub fn new(
        ctx: &Context,
        config: RendererConfig,
        format: wgpu::TextureFormat,
        output_size: UVec2,
    ) -> Result<Self> {
        info!("Creating renderer");

        config.validate()?;

        let device_errors = Arc::new(Mutex::new(Vec::new()));

        ctx.device.on_uncaptured_error({
            let device_errors = Arc::clone(&device_errors);

            Box::new(move |err| {
                warn!("Device error: {err}");

                if let Ok(mut errors) = device_errors.lock() {
                    errors.push(err.to_string());
                }
            })
        });

        let shaders = Shaders::new(&ctx.device);
        let scene = SceneBuffers::new(&ctx.device, &config);

        Ok(Self {
            format,
            output_size,
            shaders,
            geometries: Geometries::new(config.max_geometries),
            instances: Instances::new(config.max_instances),
            materials: Materials::new(config.max_materials),
            structures: AccelerationStructures::new(&config),
            shader_tables: Default::default(),
            shader_table_layout: Default::default(),
            samples: None,
            requests: Default::default(),
            frames: Default::default(),
            timeline: Default::default(),
            scene,
            view: None,
            camera: Default::default(),
            frame: 0,
            report: Default::default(),
            stats: Default::default(),
            device_errors,
            config,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Changes the configuration.
    ///
    /// Changes to the view mode, light, background and ray range apply
    /// immediately, other ones get applied during the next update.
    /// Capacity limits can't be changed after the renderer's been created.
    pub fn set_config(&mut self, config: RendererConfig) -> Result<()> {
        config.validate()?;

        if !same_capacities(&self.config, &config) {
            return Err(Error::InvalidConfig(
                "capacity limits can't be changed after creation".into(),
            ));
        }

        for request in requests_for_config_change(&self.config, &config) {
            self.requests.push(request);
        }

        if self.config.max_refits_before_rebuild
            != config.max_refits_before_rebuild
        {
            let max = config.max_refits_before_rebuild;

            self.structures.set_max_refits_before_rebuild(max);

            self.requests.push(Request::InitializeAccelerationStructures);
        }

        self.config = config;

        Ok(())
    }

    /// Queues a deferred request, handled during the next update.
    pub fn request(&mut self, request: Request) {
        self.requests.push(request);
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Outcome of the last acceleration structure update.
    pub fn build_report(&self) -> BuildReport {
        self.report
    }

    pub fn structures(&self) -> &AccelerationStructures {
        &self.structures
    }

    /// Returns schedule of the current view, if it's been created already.
    pub fn schedule(&self) -> Option<&Schedule> {
        self.view.as_ref().map(|view| &view.schedule)
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> Result<GeometryId> {
        self.geometries.add(geometry)
    }

    /// Replaces geometry's data; if the number of primitives stays the same,
    /// its bottom-level structure gets refit instead of rebuilt.
    pub fn update_geometry(
        &mut self,
        id: GeometryId,
        geometry: Geometry,
    ) -> Result<()> {
        self.geometries.update(id, geometry)
    }

    pub fn remove_geometry(&mut self, id: GeometryId) -> Result<Geometry> {
        let in_use = self
            .instances
            .iter()
            .any(|(_, instance)| instance.geometry == id);

        if in_use {
            return Err(Error::InvalidGeometry(format!(
                "{id:?} is still referenced by instances"
            )));
        }

        self.geometries.remove(id)
    }

    pub fn add_material(&mut self, material: Material) -> Result<MaterialId> {
        self.materials.add(material)
    }

    pub fn update_material(
        &mut self,
        id: MaterialId,
        material: Material,
    ) -> Result<()> {
        self.materials.update(id, material)
    }

    pub fn add_instance(
        &mut self,
        instance: GeometryInstance,
    ) -> Result<InstanceId> {
        if self.geometries.get(instance.geometry).is_none() {
            return Err(Error::UnknownGeometry(instance.geometry));
        }

        if !self.materials.contains(instance.material) {
            return Err(Error::UnknownMaterial(instance.material));
        }

        self.instances.add(instance)
    }

    pub fn set_instance_transform(
        &mut self,
        id: InstanceId,
        transform: glam::Affine3A,
    ) -> Result<()> {
        self.instances.set_transform(id, transform)
    }

    pub fn set_instance_material(
        &mut self,
        id: InstanceId,
        material: MaterialId,
    ) -> Result<()> {
        if !self.materials.contains(material) {
            return Err(Error::UnknownMaterial(material));
        }

        self.instances.set_material(id, material)
    }

    pub fn remove_instance(
        &mut self,
        id: InstanceId,
    ) -> Result<GeometryInstance> {
        self.instances.remove(id)
    }

    /// Waits for the GPU to become idle and releases all device-dependent
    /// resources; the next [`Pipeline::initialize()`] creates them again.
    pub fn release(&mut self, ctx: &Context) {
        info!("Releasing renderer's resources");

        self.frames.recreate(&self.timeline.fence(&ctx.device));
        self.view = None;
        self.samples = None;
        self.structures.release();
        self.shader_tables.invalidate();
        self.scene.invalidate();
    }

    fn check_device(&self) -> Result<()> {
        let errors = match self.device_errors.lock() {
            Ok(mut errors) => std::mem::take(&mut *errors),
            Err(_) => vec!["device error handler panicked".into()],
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Device(errors.join("; ")))
        }
    }

    fn process_requests(&mut self, ctx: &Context) -> Result<()> {
        let mut requests = std::mem::take(&mut self.requests);

        let result =
            requests.process(|request| self.process_request(ctx, request));

        requests.append(&mut self.requests);
        self.requests = requests;

        result
    }

    fn process_request(
        &mut self,
        ctx: &Context,
        request: Request,
    ) -> Result<()> {
        debug!("Processing request: {request:?}");

        match request {
            Request::InitializeGeometry => {
                self.geometries.invalidate();
                self.structures.request_build();
            }

            Request::InitializeAccelerationStructures => {
                self.structures.request_build();
                self.shader_tables.invalidate();
            }

            Request::RecreateRaytracingResources => {
                self.recreate_view(ctx)?;
            }

            Request::RecreateAoSamples => {
                let samples = SampleSets::from_config(
                    &self.config,
                    &mut rand::thread_rng(),
                )?;

                self.scene.upload_samples(&ctx.queue, &samples)?;
                self.samples = Some(samples);
            }

            Request::InitializeScene => {
                self.materials.invalidate();
                self.scene.invalidate();
                self.shader_tables.invalidate();
            }
        }

        Ok(())
    }

    fn recreate_view(&mut self, ctx: &Context) -> Result<()> {
        self.frames.recreate(&self.timeline.fence(&ctx.device));
        self.view = None;

        let schedule = Schedule::new(&self.config, self.output_size)?;
        let buffers = ViewBuffers::new(&ctx.device, &schedule);

        let passes = Passes::new(
            &ctx.device,
            &self.shaders,
            &self.config,
            &schedule,
            &self.scene,
            &buffers,
            self.format,
        )?;

        self.view = Some(View {
            schedule,
            passes,
            _buffers: buffers,
        });

        Ok(())
    }

    fn upload(
        &mut self,
        ctx: &Context,
        slot: FrameSlot,
        res: &Resolutions,
    ) -> Result<()> {
        self.scene
            .upload_structures(&ctx.queue, slot, &self.structures)?;

        self.scene.upload_materials(&ctx.queue, &mut self.materials)?;

        let scene = scene_constants(
            &self.config,
            &self.camera,
            res,
            self.samples.as_ref(),
            self.frame,
            self.shader_table_layout,
        );

        self.scene.upload_scene(&ctx.queue, slot, scene);

        Ok(())
    }
}

impl Pipeline for Renderer {
    fn initialize(&mut self, ctx: &Context) -> Result<()> {
        info!("Initializing renderer; output_size={}", self.output_size);

        for request in [
            Request::InitializeGeometry,
            Request::InitializeAccelerationStructures,
            Request::RecreateRaytracingResources,
            Request::RecreateAoSamples,
            Request::InitializeScene,
        ] {
            self.requests.push(request);
        }

        self.process_requests(ctx)
    }

    fn update(
        &mut self,
        ctx: &Context,
        camera: &Camera,
        frame_time: Duration,
    ) -> Result<()> {
        self.check_device()?;

        utils::measure("tick.requests", || self.process_requests(ctx))?;

        self.report = self.structures.update(
            false,
            &mut self.geometries,
            &mut self.instances,
        )?;

        let rebuilt = utils::measure("tick.shader_tables", || {
            self.shader_tables.update(
                &self.instances,
                &self.materials,
                &self.geometries,
                &self.structures,
            )
        })?;

        if rebuilt {
            if let Some(tables) = self.shader_tables.tables() {
                let (words, offsets, strides) = tables.serialize();

                self.scene.upload_shader_tables(&ctx.queue, words)?;
                self.shader_table_layout = (offsets, strides);
            }
        }

        self.camera = *camera;

        if let Some(view) = &self.view {
            let res = view.schedule.resolutions();

            view.passes.hit_count.read(&mut self.stats);
            self.stats
                .record_frame(frame_time, rays_per_frame(&self.config, res));
        }

        Ok(())
    }

    fn render(
        &mut self,
        ctx: &Context,
        target: &wgpu::TextureView,
    ) -> Result<()> {
        self.check_device()?;

        let Some(res) = self.view.as_ref().map(|view| {
            *view.schedule.resolutions()
        }) else {
            trace!("Skipping frame; renderer hasn't been initialized");
            return Ok(());
        };

        if self.samples.is_none() {
            trace!("Skipping frame; sample sets haven't been generated yet");
            return Ok(());
        }

        let slot = self
            .frames
            .acquire_slot(self.frame, &self.timeline.fence(&ctx.device));

        utils::measure("render.upload", || self.upload(ctx, slot, &res))?;

        let Some(view) = &self.view else {
            return Ok(());
        };

        let mut encoder =
            ctx.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("umbra_frame"),
                });

        view.passes.run(slot, &mut encoder, &view.schedule, target);

        ctx.queue.submit(Some(encoder.finish()));

        let fence_value = self.timeline.signal(&ctx.queue);

        self.frames.release_slot(slot, fence_value);
        view.passes.hit_count.map();
        ctx.device.poll(wgpu::Maintain::Poll);

        self.frame += 1;

        self.check_device()
    }

    fn resize(&mut self, ctx: &Context, size: UVec2) -> Result<()> {
        if size == self.output_size && self.view.is_some() {
            return Ok(());
        }

        debug!("Resizing to {size}");

        self.output_size = size;
        self.recreate_view(ctx)
    }
}

/// Builds scene constants for the upcoming frame.
fn scene_constants(
    config: &RendererConfig,
    camera: &Camera,
    res: &Resolutions,
    samples: Option<&SampleSets>,
    frame: u64,
    (offsets, strides): (UVec4, UVec4),
) -> gpu::Scene {
    let (light, light_color) = config.light_params();

    let (set_count, samples_per_set) = samples
        .map(|samples| (samples.set_count(), samples.samples_per_set()))
        .unwrap_or_default();

    gpu::Scene {
        camera: camera.serialize(res.render),
        light,
        light_color,
        background: config.background.extend(0.0),
        ao_range: vec4(config.ao_max_distance, config.ao_min_t, 0.0, 0.0),
        ao_sampling: uvec4(
            config.ao_samples_per_pixel,
            frame as u32,
            set_count,
            samples_per_set,
        ),
        resolution: uvec4(res.render.x, res.render.y, res.ao.x, res.ao.y),
        shader_table_offsets: offsets,
        shader_table_strides: strides,
        view: uvec4(config.view_mode.serialize(), 0, 0, 0),
    }
}

/// Number of rays a single frame casts (one camera ray per pixel plus the
/// occlusion rays).
fn rays_per_frame(config: &RendererConfig, res: &Resolutions) -> u64 {
    (res.render_pixels() as u64)
        + (res.ao_pixels() as u64) * (config.ao_samples_per_pixel as u64)
}

fn same_capacities(a: &RendererConfig, b: &RendererConfig) -> bool {
    a.max_instances == b.max_instances
        && a.max_geometries == b.max_geometries
        && a.max_materials == b.max_materials
        && a.max_blas_memory == b.max_blas_memory
}

/// Returns requests needed to apply configuration change from `old` to
/// `new`; parameters that are uploaded each frame don't need any.
fn requests_for_config_change(
    old: &RendererConfig,
    new: &RendererConfig,
) -> Vec<Request> {
    let mut requests = Vec::new();

    if old.ao_resolution_scale != new.ao_resolution_scale
        || old.supersampling != new.supersampling
        || old.denoiser != new.denoiser
    {
        requests.push(Request::RecreateRaytracingResources);
    }

    if old.ao_samples_per_pixel != new.ao_samples_per_pixel
        || old.sample_set_count != new.sample_set_count
        || old.ao_cosine_exponent != new.ao_cosine_exponent
    {
        requests.push(Request::RecreateAoSamples);
    }

    requests
}
