// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::f32::consts::PI;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SKY_COLOR;
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::gpu::buffers;
use crate::gpu::pipeline::{buffer_bind_group, storage_entry, uniform_entry};
use crate::lights::{AliasTable, ImptSampData, luminance};

const SKY_WIDTH: u32 = 256;
const SKY_HEIGHT: u32 = 128;
const UNIFORM_WIDTH: u32 = 32;
const UNIFORM_HEIGHT: u32 = 16;

/// Where the environment radiance comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvironmentSource {
    Uniform {
        color: [f32; 3],
    },
    /// Procedural horizon-to-zenith gradient with a dark ground.
    Sky {
        #[serde(default = "default_zenith")]
        zenith: [f32; 3],
        #[serde(default = "default_horizon")]
        horizon: [f32; 3],
        #[serde(default = "default_ground")]
        ground: [f32; 3],
    },
    /// Equirectangular Radiance HDR file.
    Hdr { path: PathBuf },
}

fn default_zenith() -> [f32; 3] {
    DEFAULT_SKY_COLOR
}

fn default_horizon() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_ground() -> [f32; 3] {
    [0.2, 0.2, 0.2]
}

fn default_intensity() -> f32 {
    1.0
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        Self::Sky {
            zenith: default_zenith(),
            horizon: default_horizon(),
            ground: default_ground(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentDesc {
    #[serde(flatten)]
    pub source: EnvironmentSource,

    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

impl Default for EnvironmentDesc {
    fn default() -> Self {
        Self {
            source: EnvironmentSource::default(),
            intensity: default_intensity(),
        }
    }
}

impl EnvironmentDesc {
    pub fn uniform(color: [f32; 3]) -> Self {
        Self {
            source: EnvironmentSource::Uniform { color },
            intensity: 1.0,
        }
    }

    /// Make a relative HDR path relative to `base` instead of the CWD.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let EnvironmentSource::Hdr { path } = &mut self.source {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Environment parameters at set 3, binding 0. Must match WGSL `EnvInfo`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct EnvInfo {
    pub width: u32,
    pub height: u32,
    pub intensity: f32,
    pub total_weight: f32,
}

/// Equirectangular environment with its importance table.
pub struct Environment {
    pub width: u32,
    pub height: u32,
    pub intensity: f32,
    /// Linear RGB, alpha unused. Row 0 is the zenith.
    pub texels: Vec<[f32; 4]>,
    pub table: AliasTable,
}

impl Environment {
    pub fn from_desc(desc: &EnvironmentDesc) -> Result<Self> {
        let (width, height, texels) = match &desc.source {
            EnvironmentSource::Uniform { color } => (
                UNIFORM_WIDTH,
                UNIFORM_HEIGHT,
                vec![[color[0], color[1], color[2], 1.0]; (UNIFORM_WIDTH * UNIFORM_HEIGHT) as usize],
            ),
            EnvironmentSource::Sky {
                zenith,
                horizon,
                ground,
            } => (
                SKY_WIDTH,
                SKY_HEIGHT,
                sky_texels(SKY_WIDTH, SKY_HEIGHT, (*zenith).into(), (*horizon).into(), (*ground).into()),
            ),
            EnvironmentSource::Hdr { path } => load_hdr(path)?,
        };
        Ok(Self::from_texels(width, height, texels, desc.intensity))
    }

    pub fn from_texels(width: u32, height: u32, texels: Vec<[f32; 4]>, intensity: f32) -> Self {
        let weights: Vec<f32> = texels
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let y = i as u32 / width;
                let sin_theta = (PI * (y as f32 + 0.5) / height as f32).sin();
                luminance([t[0], t[1], t[2]]) * sin_theta
            })
            .collect();
        let table = AliasTable::build(&weights);
        log::info!(
            "Environment {width}x{height}, importance table over {} texels",
            table.len()
        );
        Self {
            width,
            height,
            intensity,
            texels,
            table,
        }
    }

    pub fn info(&self) -> EnvInfo {
        EnvInfo {
            width: self.width,
            height: self.height,
            intensity: self.intensity,
            total_weight: self.table.total_weight(),
        }
    }
}

fn sky_texels(width: u32, height: u32, zenith: Vec3, horizon: Vec3, ground: Vec3) -> Vec<[f32; 4]> {
    let mut texels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let elevation = (PI * (y as f32 + 0.5) / height as f32).cos();
        let c = if elevation >= 0.0 {
            horizon.lerp(zenith, elevation.powf(0.5))
        } else {
            horizon.lerp(ground, (-elevation).powf(0.25))
        };
        texels.extend(std::iter::repeat_n([c.x, c.y, c.z, 1.0], width as usize));
    }
    texels
}

fn load_hdr(path: &Path) -> Result<(u32, u32, Vec<[f32; 4]>)> {
    let img = image::open(path)
        .map_err(|e| RenderError::InvalidScene(format!("environment {}: {e}", path.display())))?
        .into_rgb32f();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidScene(format!(
            "environment {} is empty",
            path.display()
        )));
    }
    let texels = img.pixels().map(|p| [p[0], p[1], p[2], 1.0]).collect();
    Ok((width, height, texels))
}

/// Descriptor set 3: environment info, texels and importance table.
pub struct EnvironmentBinding {
    pub info_buffer: wgpu::Buffer,
    pub texel_buffer: wgpu::Buffer,
    pub sample_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl EnvironmentBinding {
    pub fn layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("environment layout"),
            entries: &[uniform_entry(0), storage_entry(1, true), storage_entry(2, true)],
        })
    }

    pub fn new(gpu: &GpuContext, layout: &wgpu::BindGroupLayout, env: &Environment) -> Result<Self> {
        let info_buffer = buffers::create_uniform_buffer(&gpu.device, &env.info(), "env info");
        let texel_buffer =
            buffers::create_nonempty_storage_buffer(&gpu.device, &env.texels, "env texels");
        let samples: &[ImptSampData] = env.table.entries();
        let sample_buffer =
            buffers::create_nonempty_storage_buffer(&gpu.device, samples, "env samples");
        let bind_group = buffer_bind_group(
            gpu,
            layout,
            &[&info_buffer, &texel_buffer, &sample_buffer],
            "environment",
        )?;
        Ok(Self {
            info_buffer,
            texel_buffer,
            sample_buffer,
            bind_group,
        })
    }
}
