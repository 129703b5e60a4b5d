mod blas;
mod tlas;

use std::mem;

use fxhash::FxHashMap;
use log::{debug, trace};
use spirv_std::glam::Vec4;

pub use self::blas::*;
pub use self::tlas::*;
use crate::{
    utils, Error, GeometryChange, GeometryId, Geometries, Instances,
    RendererConfig, Result,
};

/// What happened to the top-level structure during an update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TlasAction {
    Build,
    Refit,

    /// Structures from the previous frame are reused as-is.
    #[default]
    Skip,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub blas_builds: usize,
    pub blas_refits: usize,
    pub tlas: TlasAction,

    /// Number of updates since the last full build of the top-level
    /// structure, including this one
    pub frames_since_build: u32,
}

/// Owns the acceleration structures and decides, once per frame, whether
/// they have to be built, refit or can be reused.
///
/// Structures are kept serialized in the layout the shaders traverse; the
/// renderer uploads [`Self::blas_data()`] and [`Self::tlas_data()`] whenever
/// their versions change.
#[derive(Debug)]
pub struct AccelerationStructures {
    blases: FxHashMap<GeometryId, Blas>,
    blas_ptrs: FxHashMap<GeometryId, u32>,
    blas_data: Vec<Vec4>,
    blas_version: u64,
    tlas: Option<Tlas>,
    tlas_data: Vec<Vec4>,
    tlas_version: u64,
    pending_build: bool,
    refits_since_build: u32,
    frames_since_build: u32,
    builds: u64,
    refits: u64,
    max_refits_before_rebuild: u32,
    max_blas_memory: usize,
}

impl AccelerationStructures {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            blases: Default::default(),
            blas_ptrs: Default::default(),
            blas_data: Default::default(),
            blas_version: 0,
            tlas: None,
            tlas_data: Default::default(),
            tlas_version: 0,
            pending_build: true,
            refits_since_build: 0,
            frames_since_build: 0,
            builds: 0,
            refits: 0,
            max_refits_before_rebuild: config.max_refits_before_rebuild,
            max_blas_memory: config.max_blas_memory,
        }
    }

    /// Schedules a full build of all structures for the next update.
    pub fn request_build(&mut self) {
        self.pending_build = true;
    }

    /// Changes the refit-vs-rebuild threshold.
    ///
    /// Versions and counters are preserved, so that whatever's been uploaded
    /// so far doesn't get mistaken for the new data.
    pub fn set_max_refits_before_rebuild(&mut self, max: u32) {
        self.max_refits_before_rebuild = max;
        self.request_build();
    }

    pub fn update(
        &mut self,
        force_build: bool,
        geometries: &mut Geometries,
        instances: &mut Instances,
    ) -> Result<BuildReport> {
        let result = utils::measure("tick.acceleration_structures", || {
            self.try_update(force_build, geometries, instances)
        });

        match result {
            Ok(report) => {
                trace!("Acceleration structures updated: {report:?}");

                Ok(report)
            }

            Err(err) => {
                // Whatever got half-updated cannot be trusted anymore
                self.pending_build = true;

                Err(err)
            }
        }
    }

    fn try_update(
        &mut self,
        force_build: bool,
        geometries: &mut Geometries,
        instances: &mut Instances,
    ) -> Result<BuildReport> {
        let changes = geometries.take_changes();
        let full_build = force_build || mem::take(&mut self.pending_build);
        let mut report = BuildReport::default();
        let mut topology_changed = full_build;
        let mut blases_changed = full_build;

        if full_build {
            debug!("Building all acceleration structures");

            self.blases.clear();

            for (id, geometry) in geometries.iter() {
                self.blases.insert(id, Blas::build(geometry));
                report.blas_builds += 1;
            }
        } else {
            for (id, change) in changes {
                blases_changed = true;

                if let GeometryChange::Removed = change {
                    self.blases.remove(&id);
                    topology_changed = true;
                    continue;
                }

                let geometry =
                    geometries.get(id).ok_or(Error::UnknownGeometry(id))?;

                match (change, self.blases.get_mut(&id)) {
                    (GeometryChange::Refit, Some(blas)) => {
                        blas.refit(geometry);
                        report.blas_refits += 1;
                    }

                    _ => {
                        self.blases.insert(id, Blas::build(geometry));
                        report.blas_builds += 1;
                        topology_changed = true;
                    }
                }
            }
        }

        if blases_changed {
            self.serialize_blases(geometries)?;
        }

        report.tlas = if topology_changed
            || instances.set_changed()
            || self.tlas.is_none()
        {
            TlasAction::Build
        } else if instances.transforms_changed() || report.blas_refits > 0 {
            if self.refits_since_build >= self.max_refits_before_rebuild {
                TlasAction::Build
            } else {
                TlasAction::Refit
            }
        } else {
            TlasAction::Skip
        };

        match report.tlas {
            TlasAction::Build => {
                self.tlas = Some(Tlas::build(instances, &self.blases)?);
                self.refits_since_build = 0;
                self.frames_since_build = 0;
                self.builds += 1;
            }

            TlasAction::Refit => {
                if let Some(tlas) = &mut self.tlas {
                    tlas.refit(instances, &self.blases)?;
                }

                self.refits_since_build += 1;
                self.refits += 1;
            }

            TlasAction::Skip => {
                //
            }
        }

        if report.tlas != TlasAction::Skip {
            if let Some(tlas) = &self.tlas {
                tlas.serialize(&self.blas_ptrs, &mut self.tlas_data)?;
            }

            self.tlas_version += 1;
        }

        self.frames_since_build += 1;
        report.frames_since_build = self.frames_since_build;

        instances.clear_changes();

        Ok(report)
    }

    fn serialize_blases(&mut self, geometries: &Geometries) -> Result<()> {
        let mut ids: Vec<_> = self.blases.keys().copied().collect();

        ids.sort();

        self.blas_data.clear();
        self.blas_ptrs.clear();

        for id in ids {
            let geometry =
                geometries.get(id).ok_or(Error::UnknownGeometry(id))?;

            let ptr = self.blases[&id].serialize(geometry, &mut self.blas_data);

            self.blas_ptrs.insert(id, ptr);
        }

        let requested = self.blas_data.len() * mem::size_of::<Vec4>();

        if requested > self.max_blas_memory {
            return Err(Error::OutOfMemory {
                what: "bottom-level acceleration structures".into(),
                requested,
                available: self.max_blas_memory,
            });
        }

        self.blas_version += 1;

        Ok(())
    }

    pub fn blas_data(&self) -> &[Vec4] {
        &self.blas_data
    }

    pub fn tlas_data(&self) -> &[Vec4] {
        &self.tlas_data
    }

    /// Incremented each time [`Self::blas_data()`] changes.
    pub fn blas_version(&self) -> u64 {
        self.blas_version
    }

    /// Incremented each time [`Self::tlas_data()`] changes.
    pub fn tlas_version(&self) -> u64 {
        self.tlas_version
    }

    /// Returns pointer of geometry's BLAS root node within
    /// [`Self::blas_data()`].
    pub fn blas_ptr(&self, id: GeometryId) -> Option<u32> {
        self.blas_ptrs.get(&id).copied()
    }

    pub fn tlas(&self) -> Option<&Tlas> {
        self.tlas.as_ref()
    }

    /// Number of full builds of the top-level structure so far.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Number of refits of the top-level structure so far.
    pub fn refits(&self) -> u64 {
        self.refits
    }

    pub fn frames_since_build(&self) -> u32 {
        self.frames_since_build
    }

    /// Drops all structures, e.g. after the device has been lost.
    pub fn release(&mut self) {
        debug!("Releasing acceleration structures");

        self.blases.clear();
        self.blas_ptrs.clear();
        self.blas_data.clear();
        self.tlas = None;
        self.tlas_data.clear();
        self.pending_build = true;
    }
}

#[cfg(test)]
mod tests {
    use spirv_std::glam::{vec3, Affine3A, Vec3};

    use super::*;
    use crate::{gpu, BoundingBox, Geometry, GeometryInstance, MaterialId};

    struct Scene {
        target: AccelerationStructures,
        geometries: Geometries,
        instances: Instances,
    }

    impl Scene {
        fn new(config: RendererConfig) -> Self {
            Self {
                target: AccelerationStructures::new(&config),
                geometries: Geometries::new(config.max_geometries),
                instances: Instances::new(config.max_instances),
            }
        }

        fn update(&mut self, force_build: bool) -> Result<BuildReport> {
            self.target.update(
                force_build,
                &mut self.geometries,
                &mut self.instances,
            )
        }

        fn trace(&self, origin: Vec3, direction: Vec3) -> gpu::Hit {
            gpu::BvhView::new(self.target.tlas_data(), self.target.blas_data())
                .trace_nearest(gpu::Ray::new(origin, direction), 0.0, f32::MAX)
        }
    }

    /// A unit quad (made of two triangles) laying on the `z = 0` plane.
    fn quad() -> Geometry {
        let a = vec3(-0.5, -0.5, 0.0);
        let b = vec3(0.5, -0.5, 0.0);
        let c = vec3(0.5, 0.5, 0.0);
        let d = vec3(-0.5, 0.5, 0.0);

        Geometry::Triangles(vec![[a, b, c], [a, c, d]])
    }

    fn cube() -> Geometry {
        Geometry::Aabbs(vec![BoundingBox::new(
            -Vec3::splat(0.5),
            Vec3::splat(0.5),
        )])
    }

    fn instance(geometry: GeometryId, at: Vec3) -> GeometryInstance {
        GeometryInstance {
            geometry,
            material: MaterialId::new(0),
            transform: Affine3A::from_translation(at),
        }
    }

    #[test]
    fn static_scene_is_built_once() {
        let mut scene = Scene::new(Default::default());
        let quad = scene.geometries.add(quad()).unwrap();

        scene.instances.add(instance(quad, Vec3::ZERO)).unwrap();

        let first = scene.update(false).unwrap();

        assert_eq!(1, first.blas_builds);
        assert_eq!(TlasAction::Build, first.tlas);

        for frame in 2..=10 {
            let report = scene.update(false).unwrap();

            assert_eq!(0, report.blas_builds, "frame {frame}");
            assert_eq!(TlasAction::Skip, report.tlas, "frame {frame}");
            assert_eq!(frame, report.frames_since_build);
        }

        assert_eq!(1, scene.target.builds());
        assert_eq!(0, scene.target.refits());
    }

    #[test]
    fn changing_refit_threshold_keeps_versions_growing() {
        let mut scene = Scene::new(Default::default());
        let quad = scene.geometries.add(quad()).unwrap();

        scene.instances.add(instance(quad, Vec3::ZERO)).unwrap();
        scene.update(false).unwrap();

        let versions =
            (scene.target.blas_version(), scene.target.tlas_version());

        let triangle =
            Geometry::Triangles(vec![[Vec3::ZERO, Vec3::X, Vec3::Y]]);

        scene.geometries.update(quad, triangle).unwrap();

        scene.target.set_max_refits_before_rebuild(5);

        let report = scene.update(false).unwrap();

        assert_eq!(TlasAction::Build, report.tlas);
        assert!(scene.target.blas_version() > versions.0);
        assert!(scene.target.tlas_version() > versions.1);
        assert_eq!(2, scene.target.builds());
    }

    #[test]
    fn force_build_rebuilds_everything() {
        let mut scene = Scene::new(Default::default());
        let quad = scene.geometries.add(quad()).unwrap();
        let cube = scene.geometries.add(cube()).unwrap();

        scene.instances.add(instance(quad, Vec3::ZERO)).unwrap();
        scene.instances.add(instance(cube, Vec3::X * 3.0)).unwrap();
        scene.update(false).unwrap();

        let report = scene.update(true).unwrap();

        assert_eq!(2, report.blas_builds);
        assert_eq!(TlasAction::Build, report.tlas);
        assert_eq!(1, report.frames_since_build);

        scene.target.request_build();

        assert_eq!(TlasAction::Build, scene.update(false).unwrap().tlas);
    }

    #[test]
    fn moving_instances_refits_until_threshold() {
        let mut scene = Scene::new(RendererConfig {
            max_refits_before_rebuild: 3,
            ..Default::default()
        });

        let quad = scene.geometries.add(quad()).unwrap();
        let id = scene.instances.add(instance(quad, Vec3::ZERO)).unwrap();

        scene.update(false).unwrap();

        let mut actions = Vec::new();

        for frame in 1..=5 {
            scene
                .instances
                .set_transform(
                    id,
                    Affine3A::from_translation(Vec3::X * (frame as f32)),
                )
                .unwrap();

            actions.push(scene.update(false).unwrap().tlas);
        }

        assert_eq!(
            vec![
                TlasAction::Refit,
                TlasAction::Refit,
                TlasAction::Refit,
                TlasAction::Build,
                TlasAction::Refit,
            ],
            actions
        );
    }

    #[test]
    fn refit_matches_rebuild() {
        let mut scene = Scene::new(Default::default());
        let quad = scene.geometries.add(quad()).unwrap();
        let cube = scene.geometries.add(cube()).unwrap();

        let ids: Vec<_> = (0..20)
            .map(|i| {
                let geometry = if i % 2 == 0 { quad } else { cube };
                let at = vec3((i as f32) * 2.0, 0.0, (i % 3) as f32);

                scene.instances.add(instance(geometry, at)).unwrap()
            })
            .collect();

        scene.update(false).unwrap();

        for (i, id) in ids.iter().enumerate() {
            let transform = Affine3A::from_rotation_translation(
                spirv_std::glam::Quat::from_rotation_y(i as f32),
                vec3(0.0, (i as f32) * 1.5, -3.0),
            );

            scene.instances.set_transform(*id, transform).unwrap();
        }

        assert_eq!(TlasAction::Refit, scene.update(false).unwrap().tlas);

        let refit = scene.target.tlas().unwrap().bounds();

        assert_eq!(TlasAction::Build, scene.update(true).unwrap().tlas);

        let rebuilt = scene.target.tlas().unwrap().bounds();

        assert!(refit.abs_diff_eq(rebuilt, 0.0001));
    }

    #[test]
    fn geometry_refit_propagates_to_tlas() {
        let mut scene = Scene::new(Default::default());
        let quad_id = scene.geometries.add(quad()).unwrap();

        scene.instances.add(instance(quad_id, Vec3::ZERO)).unwrap();
        scene.update(false).unwrap();

        let Geometry::Triangles(mut triangles) = quad() else {
            unreachable!();
        };

        for vertex in triangles.iter_mut().flatten() {
            *vertex *= 4.0;
        }

        scene
            .geometries
            .update(quad_id, Geometry::Triangles(triangles))
            .unwrap();

        let report = scene.update(false).unwrap();

        assert_eq!(1, report.blas_refits);
        assert_eq!(0, report.blas_builds);
        assert_eq!(TlasAction::Refit, report.tlas);

        let hit = scene.trace(vec3(1.5, 1.5, 5.0), -Vec3::Z);

        assert!(hit.is_some());
    }

    #[test]
    fn traced_structure_reports_instances_and_hit_groups() {
        let mut scene = Scene::new(Default::default());
        let quad = scene.geometries.add(quad()).unwrap();
        let cube = scene.geometries.add(cube()).unwrap();

        let mut add = |geometry, at| {
            scene.instances.add(instance(geometry, at)).unwrap()
        };

        let a = add(quad, vec3(0.0, 0.0, 0.0));
        let b = add(cube, vec3(5.0, 0.0, 0.0));
        let c = add(quad, vec3(-5.0, 0.0, 2.0));

        scene.update(false).unwrap();

        let cases = [
            (vec3(0.0, 0.0, 10.0), a, 0, 10.0),
            (vec3(5.0, 0.0, 10.0), b, gpu::RAY_TYPE_COUNT, 9.5),
            (vec3(-5.0, 0.0, 10.0), c, 2 * gpu::RAY_TYPE_COUNT, 8.0),
        ];

        for (origin, id, hit_group_index, distance) in cases {
            let hit = scene.trace(origin, -Vec3::Z);

            assert!(hit.is_some(), "{origin:?}");
            assert_eq!(id.get(), hit.instance_id, "{origin:?}");
            assert_eq!(hit_group_index, hit.hit_group_index, "{origin:?}");
            assert!((hit.distance - distance).abs() < 0.001, "{origin:?}");
        }

        assert!(scene.trace(vec3(2.5, 0.0, 10.0), -Vec3::Z).is_none());

        // Moving an instance moves its hits as well
        scene
            .instances
            .set_transform(b, Affine3A::from_translation(vec3(0.0, 5.0, 0.0)))
            .unwrap();

        assert_eq!(TlasAction::Refit, scene.update(false).unwrap().tlas);
        assert!(scene.trace(vec3(5.0, 0.0, 10.0), -Vec3::Z).is_none());

        let hit = scene.trace(vec3(0.0, 5.0, 10.0), -Vec3::Z);

        assert_eq!(b.get(), hit.instance_id);

        // ... and removing it removes them
        scene.instances.remove(b).unwrap();

        assert_eq!(TlasAction::Build, scene.update(false).unwrap().tlas);
        assert!(scene.trace(vec3(0.0, 5.0, 10.0), -Vec3::Z).is_none());

        let hit = scene.trace(vec3(-5.0, 0.0, 10.0), -Vec3::Z);

        assert_eq!(c.get(), hit.instance_id);
        assert_eq!(gpu::RAY_TYPE_COUNT, hit.hit_group_index);
    }

    #[test]
    fn instance_of_removed_geometry_fails_the_build() {
        let mut scene = Scene::new(Default::default());
        let quad = scene.geometries.add(quad()).unwrap();

        scene.instances.add(instance(quad, Vec3::ZERO)).unwrap();
        scene.update(false).unwrap();
        scene.geometries.remove(quad).unwrap();

        assert!(matches!(
            scene.update(false),
            Err(Error::UnknownGeometry(id)) if id == quad
        ));
    }

    #[test]
    fn blas_memory_is_limited() {
        let mut scene = Scene::new(RendererConfig {
            max_blas_memory: 64,
            ..Default::default()
        });

        scene.geometries.add(quad()).unwrap();

        assert!(matches!(
            scene.update(false),
            Err(Error::OutOfMemory { available: 64, .. })
        ));
    }

    #[test]
    fn empty_scene() {
        let mut scene = Scene::new(Default::default());

        assert_eq!(TlasAction::Build, scene.update(false).unwrap().tlas);
        assert_eq!(TlasAction::Skip, scene.update(false).unwrap().tlas);
        assert!(scene.trace(Vec3::ZERO, Vec3::Z).is_none());
    }
}
