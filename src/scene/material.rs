// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum AlphaMode {
    #[default]
    Opaque = 0,
    Mask = 1,
    Blend = 2,
}

/// glTF metallic-roughness material, the subset the kernels shade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    #[serde(
        default = "default_base_color",
        skip_serializing_if = "is_default_base_color"
    )]
    pub base_color: [f32; 4],

    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub emissive: [f32; 3],

    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub metallic: f32,

    #[serde(
        default = "default_roughness",
        skip_serializing_if = "is_default_roughness"
    )]
    pub roughness: f32,

    #[serde(default, skip_serializing_if = "is_opaque")]
    pub alpha_mode: AlphaMode,

    #[serde(
        default = "default_alpha_cutoff",
        skip_serializing_if = "is_default_alpha_cutoff"
    )]
    pub alpha_cutoff: f32,

    #[serde(default = "default_ior", skip_serializing_if = "is_default_ior")]
    pub ior: f32,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub double_sided: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unlit: bool,
}

fn default_base_color() -> [f32; 4] {
    [0.8, 0.8, 0.8, 1.0]
}

fn default_roughness() -> f32 {
    0.5
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

fn default_ior() -> f32 {
    1.5
}

fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

fn is_zero_vec3(v: &[f32; 3]) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

fn is_default_base_color(v: &[f32; 4]) -> bool {
    *v == default_base_color()
}

fn is_default_roughness(v: &f32) -> bool {
    *v == default_roughness()
}

fn is_default_alpha_cutoff(v: &f32) -> bool {
    *v == default_alpha_cutoff()
}

fn is_default_ior(v: &f32) -> bool {
    *v == default_ior()
}

fn is_opaque(v: &AlphaMode) -> bool {
    *v == AlphaMode::Opaque
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: default_base_color(),
            emissive: [0.0; 3],
            metallic: 0.0,
            roughness: default_roughness(),
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: default_alpha_cutoff(),
            ior: default_ior(),
            double_sided: false,
            unlit: false,
        }
    }
}

impl Material {
    pub fn emitter(color: [f32; 3], strength: f32) -> Self {
        Self {
            base_color: [0.0, 0.0, 0.0, 1.0],
            emissive: color.map(|c| c * strength),
            ..Default::default()
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive.iter().any(|&c| c > 0.0)
    }

    /// Importance proxy of the emitted radiance.
    pub fn emissive_luminance(&self) -> f32 {
        crate::lights::luminance(self.emissive)
    }
}

/// GPU-compatible material. Must match the WGSL `Material` struct layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuMaterial {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub metallic: f32,
    pub roughness: f32,
    pub alpha_mode: u32,
    pub alpha_cutoff: f32,
    pub ior: f32,
    pub double_sided: u32,
    pub unlit: u32,
    pub _pad: [u32; 2],
}

impl From<&Material> for GpuMaterial {
    fn from(mat: &Material) -> Self {
        Self {
            base_color: mat.base_color,
            emissive: mat.emissive,
            metallic: mat.metallic.clamp(0.0, 1.0),
            roughness: mat.roughness.clamp(0.02, 1.0), // GGX is singular at zero roughness
            alpha_mode: mat.alpha_mode as u32,
            alpha_cutoff: mat.alpha_cutoff,
            ior: mat.ior,
            double_sided: mat.double_sided as u32,
            unlit: mat.unlit as u32,
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_layout() {
        assert_eq!(std::mem::size_of::<GpuMaterial>(), 64);
    }

    #[test]
    fn test_defaults_from_yaml() {
        let mat: Material = serde_yml::from_str("metallic: 1.0\nalpha_mode: mask\n").unwrap();
        assert_eq!(mat.base_color, default_base_color());
        assert_eq!(mat.alpha_mode, AlphaMode::Mask);
        assert_eq!(mat.roughness, 0.5);
        assert!(!mat.is_emissive());
    }

    #[test]
    fn test_emitter() {
        let mat = Material::emitter([1.0, 0.5, 0.0], 4.0);
        assert!(mat.is_emissive());
        assert_eq!(mat.emissive, [4.0, 2.0, 0.0]);
        let gpu = GpuMaterial::from(&mat);
        assert_eq!(gpu.alpha_mode, 0);
    }
}
