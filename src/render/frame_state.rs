// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Per-frame constants pushed right before every dispatch.
/// Field order and size must match WGSL `FrameState` (52 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameState {
    /// Accumulated frames so far, starting at 0 after a reset.
    pub frame: i32,
    pub max_depth: i32,
    pub spp: i32,
    pub firefly_clamp: f32,
    pub hdr_multiplier: f32,
    pub debug_mode: i32,
    pub pbr_mode: i32,
    pub environment_prob: f32,
    pub width: i32,
    pub height: i32,
    pub min_heatmap: i32,
    pub max_heatmap: i32,
    /// Milliseconds since the renderer started.
    pub time: u32,
}

impl FrameState {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn debug(&self) -> DebugMode {
        DebugMode::from_i32(self.debug_mode)
    }
}

/// Visualisation selected through `FrameState::debug_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum DebugMode {
    #[default]
    None = 0,
    Direct = 1,
    Indirect = 2,
    BaseColor = 3,
    Normal = 4,
    Metallic = 5,
    Emissive = 6,
    Alpha = 7,
    Roughness = 8,
    TexCoord = 9,
    Tangent = 10,
    /// Traversal cost per pixel between the heatmap bounds.
    Heatmap = 11,
}

impl DebugMode {
    pub const ALL: [DebugMode; 12] = [
        Self::None,
        Self::Direct,
        Self::Indirect,
        Self::BaseColor,
        Self::Normal,
        Self::Metallic,
        Self::Emissive,
        Self::Alpha,
        Self::Roughness,
        Self::TexCoord,
        Self::Tangent,
        Self::Heatmap,
    ];

    /// Unknown values fall back to `None`.
    pub fn from_i32(value: i32) -> Self {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Attribute views show one deterministic sample and never accumulate.
    pub fn is_static(self) -> bool {
        !matches!(self, Self::None | Self::Direct | Self::Indirect)
    }
}

/// Surface scattering model, `FrameState::pbr_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum TransportModel {
    /// Burley diffuse with GGX specular.
    #[default]
    Disney = 0,
    /// Lambert diffuse with GGX specular.
    Gltf = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_constant_size() {
        assert_eq!(std::mem::size_of::<FrameState>(), 52);
        assert_eq!(
            std::mem::size_of::<FrameState>() as u32,
            crate::constants::PUSH_CONSTANT_SIZE
        );
    }

    #[test]
    fn test_field_offsets() {
        let state = FrameState {
            width: 17,
            time: 99,
            ..FrameState::zeroed()
        };
        let bytes = state.as_bytes();
        assert_eq!(&bytes[32..36], &17i32.to_ne_bytes());
        assert_eq!(&bytes[48..52], &99u32.to_ne_bytes());
    }

    #[test]
    fn test_debug_modes() {
        assert_eq!(DebugMode::ALL.len(), 12);
        for (i, mode) in DebugMode::ALL.iter().enumerate() {
            assert_eq!(*mode as i32, i as i32);
            assert_eq!(DebugMode::from_i32(i as i32), *mode);
        }
        assert_eq!(DebugMode::from_i32(42), DebugMode::None);
        assert!(!DebugMode::Indirect.is_static());
        assert!(DebugMode::Heatmap.is_static());
    }
}
