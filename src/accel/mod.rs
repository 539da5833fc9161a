// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod aabb;
pub mod bvh;

use std::time::Instant;

use crate::error::Result;
use crate::gpu::GpuContext;
use crate::gpu::buffers;
use crate::gpu::pipeline::{buffer_bind_group, storage_entry};
use crate::scene::geometry::GeometryData;
use bvh::Bvh;

/// Scene-wide acceleration structure, descriptor set 0.
///
/// Binding 0 holds the flattened nodes, binding 1 maps leaf slots to global
/// triangle indices and binding 2 maps triangles to their instance.
pub struct AccelStructure {
    pub node_count: usize,
    pub triangle_count: u32,
    pub node_buffer: wgpu::Buffer,
    pub prim_buffer: wgpu::Buffer,
    pub instance_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl AccelStructure {
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("accel layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
            ],
        })
    }

    pub fn build(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        geometry: &GeometryData,
    ) -> Result<Self> {
        let start = Instant::now();
        let bvh = Bvh::build(&geometry.triangle_aabbs());
        log::info!(
            "BVH: {} nodes over {} triangles in {:.1?}",
            bvh.nodes.len(),
            geometry.triangle_count(),
            start.elapsed()
        );

        let node_buffer = buffers::create_storage_buffer(&gpu.device, &bvh.nodes, "bvh nodes", true);
        let prim_buffer =
            buffers::create_nonempty_storage_buffer(&gpu.device, &bvh.prim_indices, "bvh prims");
        let instance_buffer = buffers::create_nonempty_storage_buffer(
            &gpu.device,
            &geometry.triangle_instances,
            "triangle instances",
        );
        let bind_group = buffer_bind_group(
            gpu,
            layout,
            &[&node_buffer, &prim_buffer, &instance_buffer],
            "accel",
        )?;

        Ok(Self {
            node_count: bvh.nodes.len(),
            triangle_count: geometry.triangle_count() as u32,
            node_buffer,
            prim_buffer,
            instance_buffer,
            bind_group,
        })
    }
}
