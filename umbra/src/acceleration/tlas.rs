use fxhash::FxHashMap;
use spirv_std::glam::{vec4, Affine3A, Vec4};

use super::Blas;
use crate::{
    gpu, BoundingBox, Bvh, BvhPrimitive, Error, GeometryId, InstanceId,
    Instances, Result,
};

/// Top-level acceleration structure - a BVH over world-space bounds of all
/// the instances.
#[derive(Clone, Debug, Default)]
pub struct Tlas {
    bvh: Bvh,
    entries: Vec<TlasEntry>,
}

#[derive(Clone, Copy, Debug)]
struct TlasEntry {
    id: InstanceId,
    geometry: GeometryId,
    geometry_kind: u32,
    hit_group_index: u32,
    transform: Affine3A,
    local_bounds: BoundingBox,
}

impl TlasEntry {
    fn world_bounds(&self) -> BoundingBox {
        self.local_bounds.with_transform(self.transform)
    }
}

impl Tlas {
    pub fn build(
        instances: &Instances,
        blases: &FxHashMap<GeometryId, Blas>,
    ) -> Result<Self> {
        let entries = instances
            .iter_with_hit_groups()
            .map(|(id, instance, hit_group_index)| {
                let blas = blases
                    .get(&instance.geometry)
                    .ok_or(Error::UnknownGeometry(instance.geometry))?;

                Ok(TlasEntry {
                    id,
                    geometry: instance.geometry,
                    geometry_kind: blas.kind(),
                    hit_group_index,
                    transform: instance.transform,
                    local_bounds: blas.bounds(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let primitives = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                BvhPrimitive::new(idx as u32, entry.world_bounds())
            })
            .collect();

        Ok(Self {
            bvh: Bvh::build(primitives),
            entries,
        })
    }

    /// Picks up new transforms (and new bounds of refit bottom-level
    /// structures) without changing the tree's topology.
    pub fn refit(
        &mut self,
        instances: &Instances,
        blases: &FxHashMap<GeometryId, Blas>,
    ) -> Result<()> {
        for entry in &mut self.entries {
            let instance = instances
                .get(entry.id)
                .ok_or(Error::UnknownInstance(entry.id))?;

            let blas = blases
                .get(&entry.geometry)
                .ok_or(Error::UnknownGeometry(entry.geometry))?;

            entry.transform = instance.transform;
            entry.local_bounds = blas.bounds();
        }

        let entries = &self.entries;

        self.bvh.refit(|idx| entries[idx as usize].world_bounds());

        Ok(())
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bvh.root_bounds()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes header, nodes and instance records into `out`.
    ///
    /// Instance records are laid out in leaf order, so that each leaf can
    /// simply point at its first record.
    pub fn serialize(
        &self,
        blas_ptrs: &FxHashMap<GeometryId, u32>,
        out: &mut Vec<Vec4>,
    ) -> Result<()> {
        let node_count = self.bvh.nodes().len() as u32;

        let instances_ptr =
            gpu::TLAS_HEADER_SIZE + node_count * gpu::BVH_NODE_SIZE;

        out.clear();

        out.push(vec4(
            f32::from_bits(instances_ptr),
            f32::from_bits(self.entries.len() as u32),
            f32::from_bits(node_count),
            0.0,
        ));

        self.bvh.serialize(out, gpu::BVH_NODE_INSTANCES, |first| first as u32);

        for idx in self.bvh.primitives() {
            let entry = &self.entries[*idx as usize];

            let blas_ptr = *blas_ptrs
                .get(&entry.geometry)
                .ok_or(Error::UnknownGeometry(entry.geometry))?;

            let record = gpu::InstanceRecord {
                world_to_local: entry.transform.inverse(),
                local_to_world: entry.transform,
                blas_ptr,
                hit_group_index: entry.hit_group_index,
                instance_id: entry.id.get(),
                geometry_kind: entry.geometry_kind,
            };

            out.extend(record.encode());
        }

        Ok(())
    }

    /// Upper bound of [`Self::serialize()`]'s output for given number of
    /// instances, in `Vec4`s.
    pub fn max_serialized_len(max_instances: usize) -> usize {
        let max_nodes = (2 * max_instances).saturating_sub(1);

        (gpu::TLAS_HEADER_SIZE as usize)
            + max_nodes * (gpu::BVH_NODE_SIZE as usize)
            + max_instances * (gpu::InstanceRecord::SIZE as usize)
    }
}
