use std::hash::{Hash, Hasher};

use fxhash::FxHasher;
use log::debug;
use spirv_std::glam::{uvec4, UVec4};

use crate::{
    gpu, AccelerationStructures, Error, Geometries, Instances, Materials,
    Result,
};

/// Table of fixed-stride shader records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderTable {
    name: &'static str,
    records: Vec<Vec<u32>>,

    /// Size of a single record, in words
    stride: u32,
}

impl ShaderTable {
    fn new(name: &'static str, min_words: u32, records: Vec<Vec<u32>>) -> Self {
        let words = records
            .iter()
            .map(|record| record.len() as u32)
            .max()
            .unwrap_or_default()
            .max(min_words);

        Self {
            name,
            records,
            stride: gpu::shader_record_stride(words),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    fn serialize(&self, out: &mut Vec<u32>) {
        for record in &self.records {
            let ptr = out.len();

            out.extend(record);
            out.resize(ptr + self.stride as usize, 0);
        }
    }
}

/// Ray-generation, hit-group and miss tables, as consumed by the tracing
/// passes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderTables {
    raygen: ShaderTable,
    hit_groups: ShaderTable,
    miss: ShaderTable,
}

impl ShaderTables {
    pub fn raygen(&self) -> &ShaderTable {
        &self.raygen
    }

    pub fn hit_groups(&self) -> &ShaderTable {
        &self.hit_groups
    }

    pub fn miss(&self) -> &ShaderTable {
        &self.miss
    }

    /// Checks that the hit-group record at index `i` describes the instance
    /// whose hit-group index is `i`, for each ray type.
    pub fn validate(&self, instances: &Instances) -> Result<()> {
        let expected = instances.len() * (gpu::RAY_TYPE_COUNT as usize);

        if self.hit_groups.len() != expected {
            return Err(Error::ShaderTableMismatch(format!(
                "expected {expected} hit groups, found {}",
                self.hit_groups.len()
            )));
        }

        for (id, instance, hit_group_index) in instances.iter_with_hit_groups()
        {
            for ray_type in 0..gpu::RAY_TYPE_COUNT {
                let idx = (hit_group_index + ray_type) as usize;
                let record = &self.hit_groups.records[idx];

                let record = gpu::HitGroupRecord::decode(
                    |ptr| record.get(ptr as usize).copied().unwrap_or(u32::MAX),
                    0,
                );

                let is_valid = record.instance_id == id.get()
                    && record.material_id == instance.material.get();

                if !is_valid {
                    return Err(Error::ShaderTableMismatch(format!(
                        "hit group #{idx} belongs to instance #{}, but \
                         instance #{} expects it",
                        record.instance_id,
                        id.get(),
                    )));
                }
            }
        }

        Ok(())
    }

    /// Lays all the tables back-to-back, returning them together with
    /// offsets and strides to put into [`gpu::Scene`].
    pub fn serialize(&self) -> (Vec<u32>, UVec4, UVec4) {
        let mut out = Vec::new();

        self.raygen.serialize(&mut out);

        let hit_groups_offset = out.len() as u32;

        self.hit_groups.serialize(&mut out);

        let miss_offset = out.len() as u32;

        self.miss.serialize(&mut out);

        let offsets =
            uvec4(0, hit_groups_offset, miss_offset, gpu::RAY_TYPE_COUNT);

        let strides = uvec4(
            self.raygen.stride(),
            self.hit_groups.stride(),
            self.miss.stride(),
            0,
        );

        (out, offsets, strides)
    }

    /// Upper bound of [`Self::serialize()`]'s output for given number of
    /// instances, in words.
    pub fn max_serialized_len(max_instances: usize) -> usize {
        let stride = |words| gpu::shader_record_stride(words) as usize;

        2 * stride(gpu::RayGenRecord::WORDS)
            + max_instances
                * (gpu::RAY_TYPE_COUNT as usize)
                * stride(gpu::HitGroupRecord::WORDS)
            + 2 * stride(gpu::MissRecord::WORDS)
    }
}

/// Assembles shader tables, rebuilding them only when the set of instances
/// or materials they describe changes.
#[derive(Debug, Default)]
pub struct ShaderTableBuilder {
    signature: Option<u64>,
    tables: Option<ShaderTables>,
}

impl ShaderTableBuilder {
    pub fn tables(&self) -> Option<&ShaderTables> {
        self.tables.as_ref()
    }

    /// Rebuilds the tables if needed, returning whether that happened.
    pub fn update(
        &mut self,
        instances: &Instances,
        materials: &Materials,
        geometries: &Geometries,
        structures: &AccelerationStructures,
    ) -> Result<bool> {
        let signature = Self::signature(instances, materials, structures);

        if self.tables.is_some() && self.signature == Some(signature) {
            return Ok(false);
        }

        let tables =
            Self::rebuild(instances, materials, geometries, structures)?;

        tables.validate(instances)?;

        self.tables = Some(tables);
        self.signature = Some(signature);

        Ok(true)
    }

    pub fn invalidate(&mut self) {
        self.signature = None;
    }

    pub fn rebuild(
        instances: &Instances,
        materials: &Materials,
        geometries: &Geometries,
        structures: &AccelerationStructures,
    ) -> Result<ShaderTables> {
        debug!(
            "Rebuilding shader tables (instances={}, materials={})",
            instances.len(),
            materials.len()
        );

        let raygen = vec![
            gpu::RayGenRecord {
                shader: gpu::SHADER_RAYGEN_GBUFFER,
                ray_type: gpu::RAY_TYPE_RADIANCE,
                miss_index: gpu::RAY_TYPE_RADIANCE,
            },
            gpu::RayGenRecord {
                shader: gpu::SHADER_RAYGEN_AMBIENT_OCCLUSION,
                ray_type: gpu::RAY_TYPE_OCCLUSION,
                miss_index: gpu::RAY_TYPE_OCCLUSION,
            },
        ];

        let mut hit_groups = Vec::new();

        for (id, instance, hit_group_index) in instances.iter_with_hit_groups()
        {
            if !materials.contains(instance.material) {
                return Err(Error::UnknownMaterial(instance.material));
            }

            let geometry = geometries
                .get(instance.geometry)
                .ok_or(Error::UnknownGeometry(instance.geometry))?;

            let blas_ptr = structures
                .blas_ptr(instance.geometry)
                .ok_or(Error::UnknownGeometry(instance.geometry))?;

            let radiance_shader = match geometry.kind() {
                gpu::GEOMETRY_KIND_AABBS => gpu::SHADER_HIT_AABB,
                _ => gpu::SHADER_HIT_TRIANGLE,
            };

            debug_assert_eq!(hit_groups.len(), hit_group_index as usize);

            for shader in [radiance_shader, gpu::SHADER_HIT_OCCLUSION] {
                hit_groups.push(gpu::HitGroupRecord {
                    shader,
                    material_id: instance.material.get(),
                    blas_ptr,
                    instance_id: id.get(),
                    geometry_kind: geometry.kind(),
                });
            }
        }

        let miss = vec![
            // Radiance rays report depth; nothing was hit, so it's zero
            gpu::MissRecord {
                shader: gpu::SHADER_MISS_RADIANCE,
                value: 0.0,
            },
            // Occlusion rays report visibility
            gpu::MissRecord {
                shader: gpu::SHADER_MISS_OCCLUSION,
                value: 1.0,
            },
        ];

        Ok(ShaderTables {
            raygen: ShaderTable::new(
                "raygen",
                gpu::RayGenRecord::WORDS,
                raygen.iter().map(|r| r.encode().to_vec()).collect(),
            ),
            hit_groups: ShaderTable::new(
                "hit_groups",
                gpu::HitGroupRecord::WORDS,
                hit_groups.iter().map(|r| r.encode().to_vec()).collect(),
            ),
            miss: ShaderTable::new(
                "miss",
                gpu::MissRecord::WORDS,
                miss.iter().map(|r| r.encode().to_vec()).collect(),
            ),
        })
    }

    fn signature(
        instances: &Instances,
        materials: &Materials,
        structures: &AccelerationStructures,
    ) -> u64 {
        let mut hasher = FxHasher::default();

        materials.len().hash(&mut hasher);

        for (id, instance) in instances.iter() {
            id.hash(&mut hasher);
            instance.geometry.hash(&mut hasher);
            instance.material.hash(&mut hasher);
            structures.blas_ptr(instance.geometry).hash(&mut hasher);
        }

        hasher.finish()
    }
}
