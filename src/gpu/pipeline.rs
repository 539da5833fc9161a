// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Instant;

use super::context::GpuContext;
use crate::constants::PUSH_CONSTANT_SIZE;
use crate::error::{RenderError, Result};

/// Compile `shader_source` and build a compute pipeline whose layout carries
/// the frame-state push-constant range. Validation errors are captured and
/// returned instead of reaching the uncaptured-error handler.
pub fn create_compute_pipeline(
    gpu: &GpuContext,
    shader_source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    label: &str,
) -> Result<wgpu::ComputePipeline> {
    let start = Instant::now();
    let pipeline = gpu.scoped(
        |device| {
            let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{label} layout")),
                bind_group_layouts,
                push_constant_ranges: &[wgpu::PushConstantRange {
                    stages: wgpu::ShaderStages::COMPUTE,
                    range: 0..PUSH_CONSTANT_SIZE,
                }],
            });

            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        },
        |e| RenderError::Pipeline {
            label: label.to_string(),
            message: e.to_string(),
        },
    )?;
    log::info!("Pipeline '{label}' ready in {:.1?}", start.elapsed());
    Ok(pipeline)
}

/// Shorthand for the layout entries every set uses.
pub fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Bind group whose entries are whole buffers at consecutive bindings.
pub fn buffer_bind_group(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    buffers: &[&wgpu::Buffer],
    label: &str,
) -> Result<wgpu::BindGroup> {
    let entries: Vec<_> = buffers
        .iter()
        .enumerate()
        .map(|(i, buf)| wgpu::BindGroupEntry {
            binding: i as u32,
            resource: buf.as_entire_binding(),
        })
        .collect();
    gpu.scoped(
        |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &entries,
            })
        },
        |e| RenderError::Descriptor {
            label: label.to_string(),
            message: e.to_string(),
        },
    )
}
