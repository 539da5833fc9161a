// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::constants::{PUSH_CONSTANT_SIZE, REQUIRED_BIND_GROUPS, REQUIRED_STORAGE_BUFFERS};
use crate::error::{RenderError, Result};

/// Headless device/queue pair shared by every renderer component.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter: wgpu::Adapter,
}

impl GpuContext {
    pub fn new() -> Result<Self> {
        // Prefer Vulkan/Metal/DX12; the GL backend lacks push constants in compute.
        let backends = wgpu::Backends::VULKAN | wgpu::Backends::METAL | wgpu::Backends::DX12;
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            RenderError::NoAdapter("no Vulkan, Metal or DX12 adapter available".into())
        })?;

        let info = adapter.get_info();
        log::info!("Using GPU: {} (backend: {:?})", info.name, info.backend);

        Self::check_adapter(&adapter)?;

        let mut required_limits = adapter.limits();
        required_limits.max_push_constant_size =
            required_limits.max_push_constant_size.max(PUSH_CONSTANT_SIZE);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("dual-tracer device"),
                required_features: wgpu::Features::PUSH_CONSTANTS,
                required_limits,
                ..Default::default()
            },
            None,
        ))?;

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("Uncaptured wgpu error: {e}");
        }));

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    fn check_adapter(adapter: &wgpu::Adapter) -> Result<()> {
        if !adapter.features().contains(wgpu::Features::PUSH_CONSTANTS) {
            return Err(RenderError::UnsupportedDevice(
                "push constants are not supported".into(),
            ));
        }
        let limits = adapter.limits();
        if limits.max_push_constant_size < PUSH_CONSTANT_SIZE {
            return Err(RenderError::UnsupportedDevice(format!(
                "max push constant size {} < {PUSH_CONSTANT_SIZE}",
                limits.max_push_constant_size
            )));
        }
        if limits.max_bind_groups < REQUIRED_BIND_GROUPS {
            return Err(RenderError::UnsupportedDevice(format!(
                "max bind groups {} < {REQUIRED_BIND_GROUPS}",
                limits.max_bind_groups
            )));
        }
        if limits.max_storage_buffers_per_shader_stage < REQUIRED_STORAGE_BUFFERS {
            return Err(RenderError::UnsupportedDevice(format!(
                "max storage buffers per stage {} < {REQUIRED_STORAGE_BUFFERS}",
                limits.max_storage_buffers_per_shader_stage
            )));
        }
        Ok(())
    }

    /// Run `f` inside validation and out-of-memory error scopes, turning a
    /// captured error into a `RenderError` built by `on_error`.
    pub fn scoped<T>(
        &self,
        f: impl FnOnce(&wgpu::Device) -> T,
        on_error: impl FnOnce(wgpu::Error) -> RenderError,
    ) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        match validation.or(oom) {
            Some(e) => Err(on_error(e)),
            None => Ok(value),
        }
    }
}
