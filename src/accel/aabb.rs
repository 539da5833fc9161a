// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;

use crate::constants::AABB_EPS;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expand(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Surface area used for the SAH cost metric.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Widens axes thinner than `AABB_EPS`. Axis-aligned triangles would
    /// otherwise produce zero-width slabs.
    pub fn pad(self) -> Self {
        (0..3).fold(self, |b, axis| b.pad_axis(axis, AABB_EPS))
    }

    fn pad_axis(mut self, axis: usize, eps: f32) -> Self {
        if self.max[axis] - self.min[axis] < eps {
            self.min[axis] -= eps;
            self.max[axis] += eps;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_area() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_point(Vec3::splat(2.0));
        let u = a.union(b);
        assert_eq!(u.max, Vec3::splat(2.0));
        assert!((a.surface_area() - 6.0).abs() < 1e-6);
        assert!(u.contains(&a));
        assert_eq!(Aabb::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn test_pad_flat_box() {
        let flat = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0)).pad();
        assert!(flat.max.y > flat.min.y);
        assert_eq!(flat.max.x, 1.0);
    }
}
