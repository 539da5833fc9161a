// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::dispatch::Extent;
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::gpu::buffers;

/// Material index stored for pixels whose primary ray escaped.
pub const MISS_MATERIAL: u32 = u32::MAX;

/// Per-pixel surface record. Must match the WGSL `GeomData` struct layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GeomData {
    pub normal: [f32; 3],
    pub mat_index: u32,
    pub tangent: [f32; 3],
    pub _pad0: u32,
    pub position: [f32; 3],
    pub _pad1: u32,
    pub vert_color: [f32; 3],
    pub _pad2: u32,
    pub texcoord: [f32; 2],
    pub _pad3: [f32; 2],
}

impl GeomData {
    pub fn is_miss(&self) -> bool {
        self.mat_index == MISS_MATERIAL
    }

    /// Same surface within `tol`; the material index must match exactly.
    pub fn approx_eq(&self, other: &Self, tol: f32) -> bool {
        let close = |a: [f32; 3], b: [f32; 3]| (Vec3::from(a) - Vec3::from(b)).abs().max_element() <= tol;
        self.mat_index == other.mat_index
            && close(self.normal, other.normal)
            && close(self.tangent, other.tangent)
            && close(self.position, other.position)
            && close(self.vert_color, other.vert_color)
            && (self.texcoord[0] - other.texcoord[0]).abs() <= tol
            && (self.texcoord[1] - other.texcoord[1]).abs() <= tol
    }
}

pub const GEOM_DATA_SIZE: u64 = std::mem::size_of::<GeomData>() as u64;

/// Grow-only pixel capacity. Shrinking never frees memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowOnlyCapacity {
    capacity: u64,
    reallocations: u32,
}

impl GrowOnlyCapacity {
    pub fn new(pixels: u64) -> Self {
        Self {
            capacity: pixels.max(1),
            reallocations: 0,
        }
    }

    /// The capacity after a request for `pixels`, or `None` if it already fits.
    pub fn grown(&self, pixels: u64) -> Option<Self> {
        (pixels > self.capacity).then(|| Self {
            capacity: pixels,
            reallocations: self.reallocations + 1,
        })
    }

    /// Returns true if `pixels` exceeds the current capacity, which then
    /// becomes exactly `pixels`.
    pub fn request(&mut self, pixels: u64) -> bool {
        match self.grown(pixels) {
            Some(next) => {
                *self = next;
                true
            }
            None => false,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }
}

/// Device-local G-Buffer of one backend, one `GeomData` per pixel.
pub struct GBuffer {
    pub buffer: wgpu::Buffer,
    capacity: GrowOnlyCapacity,
    label: String,
}

impl GBuffer {
    pub fn new(gpu: &GpuContext, extent: Extent, label: &str) -> Result<Self> {
        let capacity = GrowOnlyCapacity::new(extent.pixel_count());
        let buffer = buffers::try_create_storage_buffer(
            gpu,
            capacity.capacity() * GEOM_DATA_SIZE,
            label,
        )?;
        Ok(Self {
            buffer,
            capacity,
            label: label.to_string(),
        })
    }

    /// A larger replacement when `extent` needs more pixels than allocated.
    /// `self` is left untouched; the caller swaps the result in once every
    /// dependent resource is rebuilt.
    pub fn grown(&self, gpu: &GpuContext, extent: Extent) -> Result<Option<Self>> {
        let Some(capacity) = self.capacity.grown(extent.pixel_count()) else {
            return Ok(None);
        };
        let bytes = capacity.capacity() * GEOM_DATA_SIZE;
        let buffer = buffers::try_create_storage_buffer(gpu, bytes, &self.label)?;
        log::info!(
            "{}: grown to {} pixels ({} bytes)",
            self.label,
            capacity.capacity(),
            bytes
        );
        Ok(Some(Self {
            buffer,
            capacity,
            label: self.label.clone(),
        }))
    }

    pub fn capacity(&self) -> &GrowOnlyCapacity {
        &self.capacity
    }

    /// Copy the first `extent` pixels back to the host, row-major.
    pub fn read(&self, gpu: &GpuContext, extent: Extent) -> Result<Vec<GeomData>> {
        buffers::read_buffer(
            &gpu.device,
            &gpu.queue,
            &self.buffer,
            extent.pixel_count() as usize,
        )
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_layout() {
        assert_eq!(GEOM_DATA_SIZE, 80);
    }

    #[test]
    fn test_grow_then_shrink_reallocates_once() {
        let s1 = 64 * 64;
        let s2 = 128 * 96;
        let mut cap = GrowOnlyCapacity::new(s1);
        assert!(!cap.request(s1));
        assert!(cap.request(s2));
        assert!(!cap.request(s1));
        assert_eq!(cap.reallocations(), 1);
        assert!(cap.capacity() >= s2);
    }

    #[test]
    fn test_uncommitted_growth_leaves_capacity() {
        let cap = GrowOnlyCapacity::new(100);
        let next = cap.grown(200).unwrap();
        assert_eq!((next.capacity(), next.reallocations()), (200, 1));
        // Dropped without committing: the same request still grows.
        assert_eq!(cap.capacity(), 100);
        assert_eq!(cap.grown(200), Some(next));
        assert_eq!(cap.grown(100), None);
    }

    #[test]
    fn test_empty_viewport_keeps_allocation() {
        let mut cap = GrowOnlyCapacity::new(0);
        assert_eq!(cap.capacity(), 1);
        assert!(!cap.request(0));
        assert_eq!(cap.reallocations(), 0);
    }

    #[test]
    fn test_approx_eq_requires_exact_material() {
        let a = GeomData {
            mat_index: 2,
            normal: [0.0, 1.0, 0.0],
            ..GeomData::zeroed()
        };
        let mut b = a;
        b.normal[1] = 0.99995;
        assert!(a.approx_eq(&b, 1e-3));
        b.mat_index = 3;
        assert!(!a.approx_eq(&b, 1e-3));
    }
}
