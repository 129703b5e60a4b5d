use std::mem;

use log::debug;
use spirv_std::glam::{Vec3, Vec4};

use crate::{gpu, BoundingBox, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u32);

impl GeometryId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Geometry in its local space, as supplied by the scene loader.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Triangles(Vec<[Vec3; 3]>),

    /// Procedural geometry, intersected as solid boxes.
    Aabbs(Vec<BoundingBox>),
}

impl Geometry {
    pub fn kind(&self) -> u32 {
        match self {
            Geometry::Triangles(_) => gpu::GEOMETRY_KIND_TRIANGLES,
            Geometry::Aabbs(_) => gpu::GEOMETRY_KIND_AABBS,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Geometry::Triangles(triangles) => triangles.len(),
            Geometry::Aabbs(aabbs) => aabbs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidGeometry("geometry is empty".into()));
        }

        match self {
            Geometry::Triangles(triangles) => {
                let is_finite = triangles
                    .iter()
                    .flatten()
                    .all(|vertex| vertex.is_finite());

                if !is_finite {
                    return Err(Error::InvalidGeometry(
                        "triangle has a non-finite vertex".into(),
                    ));
                }
            }

            Geometry::Aabbs(aabbs) => {
                for (idx, aabb) in aabbs.iter().enumerate() {
                    let is_valid = aabb.min().is_finite()
                        && aabb.max().is_finite()
                        && aabb.min().cmple(aabb.max()).all();

                    if !is_valid {
                        return Err(Error::InvalidGeometry(format!(
                            "AABB #{idx} is degenerate: {:?}..{:?}",
                            aabb.min(),
                            aabb.max(),
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Returns bounds of given primitive.
    pub fn primitive_bounds(&self, idx: usize) -> BoundingBox {
        match self {
            Geometry::Triangles(triangles) => {
                triangles[idx].into_iter().collect()
            }
            Geometry::Aabbs(aabbs) => aabbs[idx],
        }
    }

    pub fn bvh_node_kind(&self) -> u32 {
        match self {
            Geometry::Triangles(_) => gpu::BVH_NODE_TRIANGLES,
            Geometry::Aabbs(_) => gpu::BVH_NODE_AABBS,
        }
    }

    /// Number of `Vec4`s a single primitive occupies once serialized.
    pub fn record_size(&self) -> u32 {
        match self {
            Geometry::Triangles(_) => gpu::TRIANGLE_RECORD_SIZE,
            Geometry::Aabbs(_) => gpu::AABB_RECORD_SIZE,
        }
    }

    pub fn serialize_primitive(&self, idx: usize, out: &mut Vec<Vec4>) {
        let id = f32::from_bits(idx as u32);

        match self {
            Geometry::Triangles(triangles) => {
                let [v0, v1, v2] = triangles[idx];

                out.push(v0.extend(id));
                out.push(v1.extend(0.0));
                out.push(v2.extend(0.0));
            }

            Geometry::Aabbs(aabbs) => {
                let aabb = aabbs[idx];

                out.push(aabb.min().extend(id));
                out.push(aabb.max().extend(0.0));
            }
        }
    }
}

/// What happened to a geometry since the acceleration structures were last
/// updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryChange {
    /// Geometry is new or its topology has changed.
    Rebuild,

    /// Only vertex data has changed; the primitive count and kind are intact.
    Refit,

    Removed,
}

#[derive(Debug)]
pub struct Geometries {
    items: Vec<Option<Geometry>>,
    len: usize,
    max_len: usize,
    changes: Vec<(GeometryId, GeometryChange)>,
}

impl Geometries {
    pub fn new(max_len: usize) -> Self {
        Self {
            items: Default::default(),
            len: 0,
            max_len,
            changes: Default::default(),
        }
    }

    pub fn add(&mut self, geometry: Geometry) -> Result<GeometryId> {
        geometry.validate()?;

        if self.len >= self.max_len {
            return Err(Error::CapacityExceeded {
                what: "geometries",
                limit: self.max_len,
                requested: self.len + 1,
            });
        }

        let idx = match self.items.iter().position(Option::is_none) {
            Some(idx) => idx,
            None => {
                self.items.push(None);
                self.items.len() - 1
            }
        };

        let id = GeometryId::new(idx as u32);

        debug!(
            "Geometry added: {id:?} (kind={}, primitives={})",
            geometry.kind(),
            geometry.len()
        );

        self.items[idx] = Some(geometry);
        self.len += 1;
        self.changes.push((id, GeometryChange::Rebuild));

        Ok(id)
    }

    /// Replaces geometry's data; if the topology stays the same, its
    /// bottom-level structure gets refit instead of being rebuilt.
    pub fn update(&mut self, id: GeometryId, geometry: Geometry) -> Result<()> {
        geometry.validate()?;

        let item = self
            .items
            .get_mut(id.get() as usize)
            .and_then(|item| item.as_mut())
            .ok_or(Error::UnknownGeometry(id))?;

        let change =
            if item.kind() == geometry.kind() && item.len() == geometry.len() {
                GeometryChange::Refit
            } else {
                GeometryChange::Rebuild
            };

        debug!("Geometry updated: {id:?} ({change:?})");

        *item = geometry;
        self.changes.push((id, change));

        Ok(())
    }

    pub fn remove(&mut self, id: GeometryId) -> Result<Geometry> {
        let geometry = self
            .items
            .get_mut(id.get() as usize)
            .and_then(|item| item.take())
            .ok_or(Error::UnknownGeometry(id))?;

        debug!("Geometry removed: {id:?}");

        self.len -= 1;
        self.changes.push((id, GeometryChange::Removed));

        Ok(geometry)
    }

    pub fn get(&self, id: GeometryId) -> Option<&Geometry> {
        self.items.get(id.get() as usize)?.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GeometryId, &Geometry)> {
        self.items.iter().enumerate().filter_map(|(id, item)| {
            Some((GeometryId::new(id as u32), item.as_ref()?))
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Marks every geometry as requiring a rebuild.
    pub fn invalidate(&mut self) {
        self.changes = self
            .iter()
            .map(|(id, _)| (id, GeometryChange::Rebuild))
            .collect();
    }

    /// Returns changes since the last call, collapsed so that each geometry
    /// appears at most once.
    pub fn take_changes(&mut self) -> Vec<(GeometryId, GeometryChange)> {
        let mut changes: Vec<(GeometryId, GeometryChange)> = Vec::new();

        for (id, change) in mem::take(&mut self.changes) {
            if let Some((_, prev)) =
                changes.iter_mut().find(|(prev_id, _)| *prev_id == id)
            {
                *prev = match (*prev, change) {
                    (_, GeometryChange::Removed) => GeometryChange::Removed,
                    (GeometryChange::Refit, GeometryChange::Refit) => {
                        GeometryChange::Refit
                    }
                    _ => GeometryChange::Rebuild,
                };
            } else {
                changes.push((id, change));
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use spirv_std::glam::vec3;

    use super::*;

    fn triangle() -> Geometry {
        Geometry::Triangles(vec![[Vec3::ZERO, Vec3::X, Vec3::Y]])
    }

    #[test]
    fn rejects_invalid_geometry() {
        let cases = [
            Geometry::Triangles(vec![]),
            Geometry::Aabbs(vec![]),
            Geometry::Triangles(vec![[Vec3::ZERO, Vec3::NAN, Vec3::ONE]]),
            Geometry::Aabbs(vec![BoundingBox::new(Vec3::ONE, Vec3::ZERO)]),
        ];

        for case in cases {
            assert!(
                matches!(case.validate(), Err(Error::InvalidGeometry(_))),
                "{case:?}"
            );
        }
    }

    #[test]
    fn capacity_is_enforced() {
        let mut target = Geometries::new(2);

        target.add(triangle()).unwrap();
        target.add(triangle()).unwrap();

        assert!(matches!(
            target.add(triangle()),
            Err(Error::CapacityExceeded {
                what: "geometries",
                limit: 2,
                requested: 3,
            })
        ));
    }

    #[test]
    fn tracks_changes() {
        let mut target = Geometries::new(10);
        let a = target.add(triangle()).unwrap();
        let b = target.add(triangle()).unwrap();

        assert_eq!(
            vec![(a, GeometryChange::Rebuild), (b, GeometryChange::Rebuild)],
            target.take_changes()
        );

        target
            .update(
                a,
                Geometry::Triangles(vec![[Vec3::ZERO, Vec3::Z, Vec3::Y]]),
            )
            .unwrap();

        target
            .update(
                b,
                Geometry::Aabbs(vec![BoundingBox::new(
                    Vec3::ZERO,
                    vec3(1.0, 1.0, 1.0),
                )]),
            )
            .unwrap();

        assert_eq!(
            vec![(a, GeometryChange::Refit), (b, GeometryChange::Rebuild)],
            target.take_changes()
        );

        target.remove(a).unwrap();

        assert_eq!(vec![(a, GeometryChange::Removed)], target.take_changes());
        assert!(target.take_changes().is_empty());
        assert_eq!(1, target.len());
        assert!(target.get(a).is_none());
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut target = Geometries::new(2);
        let a = target.add(triangle()).unwrap();
        let b = target.add(triangle()).unwrap();

        target.take_changes();
        target.remove(a).unwrap();

        let c = target.add(triangle()).unwrap();

        assert_eq!(a, c);
        assert_ne!(b, c);
        assert_eq!(2, target.len());
        assert!(target.get(c).is_some());

        assert_eq!(vec![(c, GeometryChange::Rebuild)], target.take_changes());
    }

    #[test]
    fn unknown_geometry() {
        let mut target = Geometries::new(10);

        assert!(matches!(
            target.remove(GeometryId::new(3)),
            Err(Error::UnknownGeometry(_))
        ));
    }

    #[test]
    fn serialization() {
        let geometry = Geometry::Aabbs(vec![
            BoundingBox::new(Vec3::ZERO, Vec3::ONE),
            BoundingBox::new(-Vec3::ONE, Vec3::ZERO),
        ]);

        let mut out = Vec::new();

        geometry.serialize_primitive(1, &mut out);

        assert_eq!(geometry.record_size() as usize, out.len());
        assert_eq!(-Vec3::ONE, out[0].truncate());
        assert_eq!(1, out[0].w.to_bits());
    }
}
