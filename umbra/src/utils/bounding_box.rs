use std::ops::{Add, AddAssign};

use spirv_std::glam::{vec3, Affine3A, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn half_area(&self) -> f32 {
        if !self.is_set() {
            return f32::MAX;
        }

        let extent = self.extent();

        extent.x * extent.y + extent.y * extent.z + extent.z * extent.x
    }

    /// Returns the box enclosing this one after applying given transform.
    pub fn with_transform(&self, transform: Affine3A) -> Self {
        (0..8)
            .map(|i| {
                let point = vec3(
                    if i & 1 > 0 { self.max.x } else { self.min.x },
                    if i & 2 > 0 { self.max.y } else { self.min.y },
                    if i & 4 > 0 { self.max.z } else { self.min.z },
                );

                transform.transform_point3(point)
            })
            .collect()
    }

    pub fn is_set(&self) -> bool {
        self.min.x != Self::default().min.x
    }

    pub fn abs_diff_eq(&self, other: Self, max_abs_diff: f32) -> bool {
        self.min.abs_diff_eq(other.min, max_abs_diff)
            && self.max.abs_diff_eq(other.max, max_abs_diff)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Vec3::MAX, Vec3::MIN)
    }
}

impl Add<Vec3> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Vec3) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Vec3> for BoundingBox {
    fn add_assign(&mut self, rhs: Vec3) {
        self.min = self.min.min(rhs);
        self.max = self.max.max(rhs);
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec3>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

impl Add<Self> for BoundingBox {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign<Self> for BoundingBox {
    fn add_assign(&mut self, rhs: Self) {
        *self += rhs.min;
        *self += rhs.max;
    }
}

impl FromIterator<Self> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Self>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

#[cfg(test)]
mod tests {
    use spirv_std::glam::Quat;

    use super::*;

    #[test]
    fn from_points() {
        let target: BoundingBox =
            [vec3(1.0, -2.0, 3.0), vec3(-1.0, 4.0, 0.0), Vec3::ZERO]
                .into_iter()
                .collect();

        assert_eq!(vec3(-1.0, -2.0, 0.0), target.min());
        assert_eq!(vec3(1.0, 4.0, 3.0), target.max());
        assert_eq!(vec3(0.0, 1.0, 1.5), target.center());
        assert_eq!(2.0 * 6.0 + 6.0 * 3.0 + 3.0 * 2.0, target.half_area());
    }

    #[test]
    fn unset_box_is_infinitely_expensive() {
        assert!(!BoundingBox::default().is_set());
        assert_eq!(f32::MAX, BoundingBox::default().half_area());
    }

    #[test]
    fn with_transform() {
        let target = BoundingBox::new(Vec3::ZERO, Vec3::ONE);

        let moved = target.with_transform(Affine3A::from_translation(vec3(
            1.0, 2.0, 3.0,
        )));

        assert_eq!(vec3(1.0, 2.0, 3.0), moved.min());
        assert_eq!(vec3(2.0, 3.0, 4.0), moved.max());

        let rotated = target.with_transform(Affine3A::from_quat(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        ));

        assert!(rotated.abs_diff_eq(
            BoundingBox::new(vec3(-1.0, 0.0, 0.0), vec3(0.0, 1.0, 1.0)),
            0.0001
        ));
    }
}
