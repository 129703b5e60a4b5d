use log::debug;
use spirv_std::glam::Affine3A;

use crate::{gpu, Error, GeometryId, MaterialId, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u32);

impl InstanceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Placement of a geometry within the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryInstance {
    pub geometry: GeometryId,
    pub material: MaterialId,

    /// Local-to-world transform.
    pub transform: Affine3A,
}

#[derive(Debug)]
pub struct Instances {
    items: Vec<Option<GeometryInstance>>,
    len: usize,
    max_len: usize,
    transforms_changed: bool,
    set_changed: bool,
}

impl Instances {
    pub fn new(max_len: usize) -> Self {
        Self {
            items: Default::default(),
            len: 0,
            max_len,
            transforms_changed: false,
            set_changed: false,
        }
    }

    pub fn add(&mut self, instance: GeometryInstance) -> Result<InstanceId> {
        if self.len >= self.max_len {
            return Err(Error::CapacityExceeded {
                what: "instances",
                limit: self.max_len,
                requested: self.len + 1,
            });
        }

        let idx = self.free_slot();
        let id = InstanceId::new(idx as u32);

        debug!(
            "Instance added: {id:?} (geometry={:?}, material={:?})",
            instance.geometry, instance.material
        );

        self.items[idx] = Some(instance);
        self.len += 1;
        self.set_changed = true;

        Ok(id)
    }

    /// Returns the first slot left behind by a removed instance, growing
    /// the list if there's none.
    fn free_slot(&mut self) -> usize {
        if let Some(idx) = self.items.iter().position(Option::is_none) {
            idx
        } else {
            self.items.push(None);
            self.items.len() - 1
        }
    }

    pub fn set_transform(
        &mut self,
        id: InstanceId,
        transform: Affine3A,
    ) -> Result<()> {
        let instance = self.get_mut(id)?;

        if instance.transform != transform {
            instance.transform = transform;
            self.transforms_changed = true;
        }

        Ok(())
    }

    /// Changes instance's material; that affects only the shader tables.
    pub fn set_material(
        &mut self,
        id: InstanceId,
        material: MaterialId,
    ) -> Result<()> {
        self.get_mut(id)?.material = material;

        Ok(())
    }

    pub fn remove(&mut self, id: InstanceId) -> Result<GeometryInstance> {
        let instance = self
            .items
            .get_mut(id.get() as usize)
            .and_then(|item| item.take())
            .ok_or(Error::UnknownInstance(id))?;

        debug!("Instance removed: {id:?}");

        self.len -= 1;
        self.set_changed = true;

        Ok(instance)
    }

    pub fn get(&self, id: InstanceId) -> Option<&GeometryInstance> {
        self.items.get(id.get() as usize)?.as_ref()
    }

    fn get_mut(&mut self, id: InstanceId) -> Result<&mut GeometryInstance> {
        self.items
            .get_mut(id.get() as usize)
            .and_then(|item| item.as_mut())
            .ok_or(Error::UnknownInstance(id))
    }

    /// Iterates over live instances, in the order their hit groups are laid
    /// out in the shader tables.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (InstanceId, &GeometryInstance)> {
        self.items.iter().enumerate().filter_map(|(id, item)| {
            Some((InstanceId::new(id as u32), item.as_ref()?))
        })
    }

    /// Iterates over live instances together with their hit-group indices.
    pub fn iter_with_hit_groups(
        &self,
    ) -> impl Iterator<Item = (InstanceId, &GeometryInstance, u32)> {
        self.iter().enumerate().map(|(idx, (id, instance))| {
            (id, instance, hit_group_index(idx))
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn transforms_changed(&self) -> bool {
        self.transforms_changed
    }

    /// Returns whether instances have been added or removed.
    pub fn set_changed(&self) -> bool {
        self.set_changed
    }

    pub fn clear_changes(&mut self) {
        self.transforms_changed = false;
        self.set_changed = false;
    }
}

/// Returns the hit-group index of the `idx`-th live instance; each instance
/// owns one hit-group record per ray type.
pub fn hit_group_index(idx: usize) -> u32 {
    (idx as u32) * gpu::RAY_TYPE_COUNT
}

#[cfg(test)]
mod tests {
    use spirv_std::glam::vec3;

    use super::*;

    fn instance() -> GeometryInstance {
        GeometryInstance {
            geometry: GeometryId::new(0),
            material: MaterialId::new(0),
            transform: Affine3A::IDENTITY,
        }
    }

    #[test]
    fn tracks_changes() {
        let mut target = Instances::new(10);
        let id = target.add(instance()).unwrap();

        assert!(target.set_changed());
        assert!(!target.transforms_changed());

        target.clear_changes();
        target.set_transform(id, Affine3A::IDENTITY).unwrap();

        assert!(!target.transforms_changed());

        target
            .set_transform(id, Affine3A::from_translation(vec3(1.0, 0.0, 0.0)))
            .unwrap();

        assert!(target.transforms_changed());
        assert!(!target.set_changed());
    }

    #[test]
    fn hit_groups_follow_live_instances() {
        let mut target = Instances::new(10);
        let a = target.add(instance()).unwrap();
        let b = target.add(instance()).unwrap();
        let c = target.add(instance()).unwrap();

        target.remove(b).unwrap();

        let actual: Vec<_> = target
            .iter_with_hit_groups()
            .map(|(id, _, hit_group)| (id, hit_group))
            .collect();

        assert_eq!(vec![(a, 0), (c, gpu::RAY_TYPE_COUNT)], actual);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut target = Instances::new(2);
        let a = target.add(instance()).unwrap();
        let b = target.add(instance()).unwrap();

        target.remove(a).unwrap();
        target.clear_changes();

        let c = target.add(instance()).unwrap();

        assert_eq!(a, c);
        assert_eq!(2, target.len());
        assert!(target.set_changed());

        let actual: Vec<_> = target
            .iter_with_hit_groups()
            .map(|(id, _, hit_group)| (id, hit_group))
            .collect();

        assert_eq!(vec![(c, 0), (b, gpu::RAY_TYPE_COUNT)], actual);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut target = Instances::new(1);

        target.add(instance()).unwrap();

        assert!(matches!(
            target.add(instance()),
            Err(Error::CapacityExceeded {
                what: "instances",
                limit: 1,
                requested: 2,
            })
        ));
    }

    #[test]
    fn unknown_instance() {
        let mut target = Instances::new(1);

        assert!(matches!(
            target.set_transform(InstanceId::new(0), Affine3A::IDENTITY),
            Err(Error::UnknownInstance(_))
        ));
    }
}
