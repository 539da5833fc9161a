// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::geometry::GeometryData;
use crate::camera::GpuCamera;
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::gpu::buffers;
use crate::gpu::pipeline::{buffer_bind_group, storage_entry, uniform_entry};
use crate::lights::LightIndex;

/// Descriptor set 2: camera, materials, instance lookup, vertex/index data
/// and the light tables. Read-only for the whole frame.
pub struct SceneBinding {
    pub camera_buffer: wgpu::Buffer,
    pub material_buffer: wgpu::Buffer,
    pub instance_buffer: wgpu::Buffer,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub punc_light_buffer: wgpu::Buffer,
    pub trig_light_buffer: wgpu::Buffer,
    pub light_info_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl SceneBinding {
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, true),
                storage_entry(5, true),
                storage_entry(6, true),
                uniform_entry(7),
            ],
        })
    }

    pub fn new(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        camera: &GpuCamera,
        geometry: &GeometryData,
        lights: &LightIndex,
    ) -> Result<Self> {
        let device = &gpu.device;
        let camera_buffer = buffers::create_uniform_buffer(device, camera, "camera");
        let material_buffer =
            buffers::create_nonempty_storage_buffer(device, &geometry.materials, "materials");
        let instance_buffer =
            buffers::create_nonempty_storage_buffer(device, &geometry.instances, "instances");
        let vertex_buffer =
            buffers::create_nonempty_storage_buffer(device, &geometry.vertices, "vertices");
        let index_buffer =
            buffers::create_nonempty_storage_buffer(device, &geometry.indices, "indices");
        let punc_light_buffer =
            buffers::create_nonempty_storage_buffer(device, &lights.punctual, "punctual lights");
        let trig_light_buffer =
            buffers::create_nonempty_storage_buffer(device, &lights.triangles, "triangle lights");
        let light_info_buffer = buffers::create_uniform_buffer(device, &lights.info, "light info");

        let bind_group = buffer_bind_group(
            gpu,
            layout,
            &[
                &camera_buffer,
                &material_buffer,
                &instance_buffer,
                &vertex_buffer,
                &index_buffer,
                &punc_light_buffer,
                &trig_light_buffer,
                &light_info_buffer,
            ],
            "scene",
        )?;

        Ok(Self {
            camera_buffer,
            material_buffer,
            instance_buffer,
            vertex_buffer,
            index_buffer,
            punc_light_buffer,
            trig_light_buffer,
            light_info_buffer,
            bind_group,
        })
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &GpuCamera) {
        buffers::update_uniform_buffer(queue, &self.camera_buffer, camera);
    }
}
