use glam::{UVec2, Vec3, Vec4, Vec4Swizzles};

use crate::TexRgba32;

/// Per-pixel output of the G-buffer pass.
///
/// Stored as two textures:
///
/// - `d0 = (normal, depth)`, also read as a `Surface` by the filters,
/// - `d1 = (position, bits(material_id))`.
///
/// Sky pixels have depth of zero.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct GBufferEntry {
    pub normal: Vec3,

    /// Distance from the camera, measured along the primary ray
    pub depth: f32,

    pub position: Vec3,
    pub material_id: u32,
}

impl GBufferEntry {
    pub fn unpack([d0, d1]: [Vec4; 2]) -> Self {
        Self {
            normal: d0.xyz(),
            depth: d0.w,
            position: d1.xyz(),
            material_id: d1.w.to_bits(),
        }
    }

    pub fn pack(self) -> [Vec4; 2] {
        [
            self.normal.extend(self.depth),
            self.position.extend(f32::from_bits(self.material_id)),
        ]
    }

    pub fn is_some(&self) -> bool {
        self.depth > 0.0
    }

    pub fn as_surface(&self) -> Surface {
        Surface {
            normal: self.normal,
            depth: self.depth,
        }
    }
}

/// Guide data used by the edge-aware filters.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct Surface {
    pub normal: Vec3,
    pub depth: f32,
}

impl Surface {
    pub fn sky() -> Self {
        Self::default()
    }

    pub fn unpack(d0: Vec4) -> Self {
        Self {
            normal: d0.xyz(),
            depth: d0.w,
        }
    }

    pub fn is_sky(&self) -> bool {
        self.depth <= 0.0
    }
}

#[derive(Clone, Copy)]
pub struct SurfaceMap<'a> {
    tex: TexRgba32<'a>,
}

impl<'a> SurfaceMap<'a> {
    pub fn new(tex: TexRgba32<'a>) -> Self {
        Self { tex }
    }

    pub fn get(&self, screen_pos: UVec2) -> Surface {
        Surface::unpack(self.tex.read(screen_pos))
    }
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;

    #[test]
    fn serialization() {
        let target = GBufferEntry {
            normal: vec3(0.26, 0.53, 0.80),
            depth: 123.456,
            position: vec3(-1.0, 2.0, 3.5),
            material_id: 17,
        };

        assert_eq!(target, GBufferEntry::unpack(target.pack()));
        assert_eq!(target.as_surface(), Surface::unpack(target.pack()[0]));
    }

    #[test]
    fn sky() {
        assert!(!GBufferEntry::default().is_some());
        assert!(Surface::sky().is_sky());
        assert!(GBufferEntry::default().as_surface().is_sky());
    }
}
