use log::debug;
use spirv_std::glam::Vec3;

use crate::{gpu, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u32);

impl MaterialId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub base_color: Vec3,
}

impl Material {
    fn serialize(&self) -> gpu::Material {
        gpu::Material {
            base_color: self.base_color.extend(1.0),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: Vec3::ONE,
        }
    }
}

#[derive(Debug)]
pub struct Materials {
    items: Vec<gpu::Material>,
    max_len: usize,
    dirty: bool,
}

impl Materials {
    pub fn new(max_len: usize) -> Self {
        Self {
            items: Default::default(),
            max_len,
            dirty: true,
        }
    }

    pub fn add(&mut self, material: Material) -> Result<MaterialId> {
        if self.items.len() >= self.max_len {
            return Err(Error::CapacityExceeded {
                what: "materials",
                limit: self.max_len,
                requested: self.items.len() + 1,
            });
        }

        let id = MaterialId::new(self.items.len() as u32);

        debug!("Material added: {id:?}");

        self.items.push(material.serialize());
        self.dirty = true;

        Ok(id)
    }

    pub fn update(&mut self, id: MaterialId, material: Material) -> Result<()> {
        let item = self
            .items
            .get_mut(id.get() as usize)
            .ok_or(Error::UnknownMaterial(id))?;

        *item = material.serialize();
        self.dirty = true;

        Ok(())
    }

    pub fn contains(&self, id: MaterialId) -> bool {
        (id.get() as usize) < self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns materials in the layout expected by the compose pass, if
    /// they've changed since the last call.
    pub fn take_dirty(&mut self) -> Option<&[gpu::Material]> {
        if std::mem::take(&mut self.dirty) {
            Some(&self.items)
        } else {
            None
        }
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn serialized(&self) -> &[gpu::Material] {
        &self.items
    }
}
