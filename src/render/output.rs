// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use super::dispatch::Extent;
use crate::constants::{ACCUM_BYTES_PER_PIXEL, OUTPUT_FORMAT};
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::gpu::buffers;
use crate::gpu::pipeline::storage_entry;

/// Descriptor set 1: running-mean accumulation buffer and the tonemapped
/// RGBA8 image handed downstream.
pub struct OutputTarget {
    pub extent: Extent,
    pub accumulation: wgpu::Buffer,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
}

impl OutputTarget {
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("output layout"),
            entries: &[
                storage_entry(0, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: OUTPUT_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        })
    }

    /// Size-dependent resources; recreated on every viewport change.
    pub fn new(gpu: &GpuContext, layout: &wgpu::BindGroupLayout, extent: Extent) -> Result<Self> {
        let width = extent.width.max(1);
        let height = extent.height.max(1);
        let accum_size = (width as u64 * height as u64) * ACCUM_BYTES_PER_PIXEL;
        let accumulation = buffers::try_create_storage_buffer(gpu, accum_size, "accumulation")?;

        let (texture, view) = gpu.scoped(
            |device| buffers::create_output_texture(device, width, height, "output"),
            |_| RenderError::OutOfMemory {
                label: "output".into(),
                bytes: width as u64 * height as u64 * 4,
            },
        )?;

        let bind_group = gpu.scoped(
            |device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("output"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: accumulation.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&view),
                        },
                    ],
                })
            },
            |e| RenderError::Descriptor {
                label: "output".into(),
                message: e.to_string(),
            },
        )?;

        Ok(Self {
            extent,
            accumulation,
            texture,
            view,
            bind_group,
        })
    }

    /// Tightly packed RGBA8 rows of the displayed image.
    pub fn read_pixels(&self, gpu: &GpuContext) -> Result<Vec<u8>> {
        buffers::read_texture_rgba8(&gpu.device, &gpu.queue, &self.texture)
    }

    /// Linear running mean per pixel (RGB + alpha unused).
    pub fn read_accumulation(&self, gpu: &GpuContext) -> Result<Vec<[f32; 4]>> {
        buffers::read_buffer(
            &gpu.device,
            &gpu.queue,
            &self.accumulation,
            self.extent.pixel_count() as usize,
        )
    }
}
