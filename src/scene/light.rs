// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// KHR_lights_punctual light kinds. Values match the WGSL `LIGHT_*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum LightType {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

/// Punctual light as described by the scene. Cone angles are in degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PunctualLight {
    #[serde(rename = "type")]
    pub light_type: LightType,

    /// Direction the light travels along (directional, spot).
    #[serde(default = "default_direction")]
    pub direction: [f32; 3],

    #[serde(default)]
    pub position: [f32; 3],

    #[serde(default = "default_intensity")]
    pub intensity: f32,

    #[serde(default = "default_color")]
    pub color: [f32; 3],

    /// Cut-off distance; zero means unbounded. Ignored by directional lights.
    #[serde(default)]
    pub range: f32,

    #[serde(default)]
    pub inner_cone_angle: f32,

    #[serde(default = "default_outer_cone_angle")]
    pub outer_cone_angle: f32,
}

fn default_direction() -> [f32; 3] {
    [0.0, -1.0, 0.0]
}

fn default_intensity() -> f32 {
    1.0
}

fn default_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_outer_cone_angle() -> f32 {
    45.0
}

impl PunctualLight {
    pub fn directional(direction: [f32; 3], color: [f32; 3], intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            direction,
            position: [0.0; 3],
            intensity,
            color,
            range: 0.0,
            inner_cone_angle: 0.0,
            outer_cone_angle: default_outer_cone_angle(),
        }
    }

    pub fn point(position: [f32; 3], color: [f32; 3], intensity: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            ..Self::directional(default_direction(), color, intensity)
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RenderError::InvalidScene(msg));
        if !self.intensity.is_finite() || self.intensity < 0.0 {
            return invalid(format!("invalid intensity {}", self.intensity));
        }
        if self.light_type != LightType::Point
            && Vec3::from(self.direction).length_squared() < 1e-12
        {
            return invalid("direction must be non-zero".into());
        }
        if self.light_type == LightType::Spot
            && !(0.0..=90.0).contains(&self.outer_cone_angle)
        {
            return invalid(format!(
                "outer cone angle {} outside [0, 90] degrees",
                self.outer_cone_angle
            ));
        }
        // Angles in [0, 90], so inner <= outer is inner_cone_cos >= outer_cone_cos.
        if self.light_type == LightType::Spot && self.inner_cone_angle > self.outer_cone_angle {
            return invalid(format!(
                "inner cone angle {} exceeds outer cone angle {}",
                self.inner_cone_angle, self.outer_cone_angle
            ));
        }
        Ok(())
    }

    /// Importance proxy used to build the punctual alias table.
    pub fn power(&self) -> f32 {
        self.intensity * crate::lights::luminance(self.color)
    }
}
