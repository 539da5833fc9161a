// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::alias::{AliasTable, ImptSampData};
use crate::scene::geometry::GeometryData;
use crate::scene::light::PunctualLight;

/// Punctual light as read by the kernels. Must match WGSL `PuncLight`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PuncLight {
    /// Normalised travel direction (directional, spot).
    pub direction: [f32; 3],
    pub light_type: i32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub range: f32,
    pub outer_cone_cos: f32,
    pub inner_cone_cos: f32,
    pub _pad: [f32; 2],
    pub imp_samp: ImptSampData,
}

/// One emissive world-space triangle. Must match WGSL `TrigLight`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TrigLight {
    pub v0: [f32; 3],
    pub mat_index: u32,
    pub v1: [f32; 3],
    pub transform_index: u32,
    pub v2: [f32; 3],
    pub _pad0: u32,
    pub uv0: [f32; 2],
    pub uv1: [f32; 2],
    pub uv2: [f32; 2],
    pub _pad1: [f32; 2],
    pub imp_samp: ImptSampData,
}

impl TrigLight {
    pub fn area(&self) -> f32 {
        let [a, b, c] = [self.v0, self.v1, self.v2].map(Vec3::from);
        0.5 * (b - a).cross(c - a).length()
    }
}

/// Light counts and the triangle share of light sampling. Uniform at set 2.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightBufInfo {
    pub punc_light_size: u32,
    pub trig_light_size: u32,
    pub trig_samp_prob: f32,
    pub _pad: i32,
}

impl LightBufInfo {
    pub fn light_count(&self) -> u32 {
        self.punc_light_size + self.trig_light_size
    }
}

/// Alias-sampled light tables built once per scene.
pub struct LightIndex {
    pub punctual: Vec<PuncLight>,
    pub triangles: Vec<TrigLight>,
    pub info: LightBufInfo,
}

impl LightIndex {
    pub fn build(lights: &[PunctualLight], geometry: &GeometryData) -> Self {
        let mut punctual = Vec::with_capacity(lights.len());
        let mut punctual_weights = Vec::with_capacity(lights.len());
        for (i, light) in lights.iter().enumerate() {
            if let Err(e) = light.validate() {
                log::warn!("Dropping punctual light {i}: {e}");
                continue;
            }
            let weight = light.power();
            if !(weight.is_finite() && weight > 0.0) {
                log::debug!("Dropping punctual light {i}: no emitted power");
                continue;
            }
            punctual.push(to_punc_light(light));
            punctual_weights.push(weight);
        }

        let mut triangles = Vec::new();
        let mut triangle_weights = Vec::new();
        for tri in 0..geometry.triangle_count() {
            let mat_index = geometry.triangle_material(tri);
            let Some(material) = geometry.source_materials.get(mat_index as usize) else {
                continue;
            };
            if !material.is_emissive() {
                continue;
            }
            let [v0, v1, v2] = geometry.triangle(tri);
            let [uv0, uv1, uv2] = geometry.triangle_texcoords(tri);
            let light = TrigLight {
                v0: v0.into(),
                mat_index,
                v1: v1.into(),
                transform_index: geometry.triangle_instances[tri],
                v2: v2.into(),
                _pad0: 0,
                uv0,
                uv1,
                uv2,
                _pad1: [0.0; 2],
                imp_samp: ImptSampData::zeroed(),
            };
            let weight = light.area() * material.emissive_luminance();
            if weight <= 0.0 {
                continue;
            }
            triangles.push(light);
            triangle_weights.push(weight);
        }

        let punctual_table = AliasTable::build(&punctual_weights);
        let triangle_table = AliasTable::build(&triangle_weights);
        for (light, entry) in punctual.iter_mut().zip(punctual_table.entries()) {
            light.imp_samp = *entry;
        }
        for (light, entry) in triangles.iter_mut().zip(triangle_table.entries()) {
            light.imp_samp = *entry;
        }

        // Both lists hold only positive weights, so a non-empty list has a
        // positive sum.
        let punctual_power: f32 = punctual_weights.iter().sum();
        let triangle_power: f32 = triangle_weights.iter().sum();
        let trig_samp_prob = match (punctual.is_empty(), triangles.is_empty()) {
            (_, true) => 0.0,
            (true, false) => 1.0,
            (false, false) => triangle_power / (punctual_power + triangle_power),
        };

        let info = LightBufInfo {
            punc_light_size: punctual.len() as u32,
            trig_light_size: triangles.len() as u32,
            trig_samp_prob,
            _pad: 0,
        };
        if info.light_count() == 0 {
            log::warn!("Scene has no lights; direct lighting uses the environment only");
        }
        log::info!(
            "Light index: {} punctual, {} emissive triangles, triangle share {:.3}",
            info.punc_light_size,
            info.trig_light_size,
            info.trig_samp_prob
        );

        Self {
            punctual,
            triangles,
            info,
        }
    }
}

fn to_punc_light(light: &PunctualLight) -> PuncLight {
    PuncLight {
        direction: Vec3::from(light.direction)
            .normalize_or(Vec3::NEG_Y)
            .into(),
        light_type: light.light_type as i32,
        color: light.color,
        intensity: light.intensity,
        position: light.position,
        range: light.range,
        outer_cone_cos: light.outer_cone_angle.to_radians().cos(),
        inner_cone_cos: light.inner_cone_angle.to_radians().cos(),
        _pad: [0.0; 2],
        imp_samp: ImptSampData::zeroed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::light::LightType;
    use crate::scene::scene::Scene;

    #[test]
    fn test_gpu_layouts() {
        assert_eq!(std::mem::size_of::<PuncLight>(), 80);
        assert_eq!(std::mem::size_of::<TrigLight>(), 96);
        assert_eq!(std::mem::size_of::<LightBufInfo>(), 16);
    }

    #[test]
    fn test_zero_lights_route_to_environment() {
        let scene = Scene::empty();
        let geometry = GeometryData::build(&scene);
        let index = LightIndex::build(&scene.lights, &geometry);

        assert_eq!(index.info.punc_light_size, 0);
        assert_eq!(index.info.trig_light_size, 0);
        assert_eq!(index.info.light_count(), 0);
        assert_eq!(index.info.trig_samp_prob, 0.0);
    }

    #[test]
    fn test_black_punctual_light_takes_no_samples() {
        let mut scene = Scene::demo();
        for light in &mut scene.lights {
            light.intensity = 0.0;
        }
        scene.lights.push(PunctualLight::point([0.0, 2.0, 0.0], [0.0; 3], 50.0));
        let geometry = GeometryData::build(&scene);
        let index = LightIndex::build(&scene.lights, &geometry);

        assert_eq!(index.info.punc_light_size, 0);
        assert_eq!(index.info.trig_light_size, 2);
        assert_eq!(index.info.trig_samp_prob, 1.0);
    }

    #[test]
    fn test_triangle_share_uses_source_power() {
        let scene = Scene::demo();
        let geometry = GeometryData::build(&scene);
        let index = LightIndex::build(&scene.lights, &geometry);

        let punctual: f32 = scene.lights.iter().map(PunctualLight::power).sum();
        let triangles: f32 = index
            .triangles
            .iter()
            .map(|t| t.area() * geometry.source_materials[t.mat_index as usize].emissive_luminance())
            .sum();
        let expected = triangles / (punctual + triangles);
        assert!((index.info.trig_samp_prob - expected).abs() < 1e-5);
    }

    #[test]
    fn test_demo_scene_lights() {
        let scene = Scene::demo();
        let geometry = GeometryData::build(&scene);
        let index = LightIndex::build(&scene.lights, &geometry);

        assert_eq!(index.info.punc_light_size, 1);
        // The emissive panel is two triangles.
        assert_eq!(index.info.trig_light_size, 2);
        assert!(index.info.trig_samp_prob > 0.0 && index.info.trig_samp_prob < 1.0);

        // Single punctual light: always accepted.
        let sun = index.punctual[0].imp_samp;
        assert_eq!(sun.q, 1.0);
        assert_eq!(sun.alias, 0);

        // Equal-area panel halves share the probability.
        for tri in &index.triangles {
            assert!((tri.imp_samp.pdf - 0.5).abs() < 1e-5);
            assert!((tri.area() - 0.5).abs() < 1e-5);
            assert_eq!(tri.transform_index, 2);
        }
    }

    #[test]
    fn test_invalid_spot_is_dropped() {
        let mut scene = Scene::empty();
        scene.lights.push(PunctualLight {
            light_type: LightType::Spot,
            inner_cone_angle: 50.0,
            outer_cone_angle: 20.0,
            ..PunctualLight::point([0.0, 2.0, 0.0], [1.0; 3], 10.0)
        });
        scene.lights.push(PunctualLight::point([0.0, 2.0, 0.0], [1.0; 3], 10.0));
        let geometry = GeometryData::build(&scene);
        let index = LightIndex::build(&scene.lights, &geometry);
        assert_eq!(index.info.punc_light_size, 1);
        assert_eq!(index.info.trig_samp_prob, 0.0);
    }

    #[test]
    fn test_punctual_weights_follow_power() {
        let lights = [
            PunctualLight::point([0.0; 3], [1.0; 3], 1.0),
            PunctualLight::point([1.0; 3], [1.0; 3], 3.0),
        ];
        let geometry = GeometryData::build(&Scene::empty());
        let index = LightIndex::build(&lights, &geometry);
        assert!((index.punctual[0].imp_samp.pdf - 0.25).abs() < 1e-5);
        assert!((index.punctual[1].imp_samp.pdf - 0.75).abs() < 1e-5);
    }
}
