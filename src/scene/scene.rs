// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::light::PunctualLight;
use super::material::Material;
use super::mesh::Mesh;
use crate::constants::{DEFAULT_CAMERA_POSITION, DEFAULT_FOV};
use crate::environment::EnvironmentDesc;
use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_position")]
    pub position: [f32; 3],

    /// Pitch, yaw, roll in degrees.
    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub rotation: [f32; 3],

    #[serde(default = "default_fov", skip_serializing_if = "is_default_fov")]
    pub fov: f32,

    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub aperture: f32,

    #[serde(default = "default_focal_distance")]
    pub focal_distance: f32,
}

fn default_camera_position() -> [f32; 3] {
    DEFAULT_CAMERA_POSITION
}

fn default_fov() -> f32 {
    DEFAULT_FOV
}

fn default_focal_distance() -> f32 {
    5.0
}

fn default_scale() -> [f32; 3] {
    [1.0; 3]
}

fn is_zero_vec3(v: &[f32; 3]) -> bool {
    v[0] == 0.0 && v[1] == 0.0 && v[2] == 0.0
}

fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

fn is_default_fov(v: &f32) -> bool {
    *v == default_fov()
}

fn is_unit_scale(v: &[f32; 3]) -> bool {
    *v == default_scale()
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            rotation: [0.0; 3],
            fov: default_fov(),
            aperture: 0.0,
            focal_distance: default_focal_distance(),
        }
    }
}

/// One placement of a mesh in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub mesh: usize,

    #[serde(default)]
    pub material: usize,

    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub position: [f32; 3],

    /// Euler XYZ in degrees.
    #[serde(default, skip_serializing_if = "is_zero_vec3")]
    pub rotation: [f32; 3],

    #[serde(default = "default_scale", skip_serializing_if = "is_unit_scale")]
    pub scale: [f32; 3],
}

impl Instance {
    pub fn new(mesh: usize, material: usize) -> Self {
        Self {
            mesh,
            material,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: default_scale(),
        }
    }

    pub fn at(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn transform(&self) -> Mat4 {
        let [rx, ry, rz] = self.rotation.map(f32::to_radians);
        Mat4::from_scale_rotation_translation(
            Vec3::from(self.scale),
            Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            Vec3::from(self.position),
        )
    }
}

/// Ready-to-render scene handed over by the scene collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub meshes: Vec<Mesh>,

    #[serde(default)]
    pub materials: Vec<Material>,

    #[serde(default)]
    pub instances: Vec<Instance>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lights: Vec<PunctualLight>,

    #[serde(default)]
    pub environment: EnvironmentDesc,
}

impl Scene {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.instances
            .iter()
            .filter_map(|inst| self.meshes.get(inst.mesh))
            .map(Mesh::triangle_count)
            .sum()
    }

    /// Structural checks that would otherwise become out-of-bounds reads on the GPU.
    /// Invalid punctual lights are dropped later with a warning rather than rejected.
    pub fn validate(&self) -> Result<()> {
        for (i, mesh) in self.meshes.iter().enumerate() {
            if let Err(RenderError::InvalidScene(e)) = mesh.validate() {
                return Err(RenderError::InvalidScene(format!("mesh {i}: {e}")));
            }
        }
        for (i, inst) in self.instances.iter().enumerate() {
            if inst.mesh >= self.meshes.len() {
                return Err(RenderError::InvalidScene(format!(
                    "instance {i} references mesh {} of {}",
                    inst.mesh,
                    self.meshes.len()
                )));
            }
            if inst.material >= self.materials.len().max(1) {
                return Err(RenderError::InvalidScene(format!(
                    "instance {i} references material {} of {}",
                    inst.material,
                    self.materials.len()
                )));
            }
        }
        Ok(())
    }

    /// Small test scene: a floor, a box, an emissive panel and a sun.
    pub fn demo() -> Self {
        Self {
            camera: CameraConfig {
                position: [0.0, 1.5, 5.0],
                rotation: [-10.0, 0.0, 0.0],
                ..Default::default()
            },
            meshes: vec![
                Mesh::plane(4.0),
                Mesh::cuboid([0.5, 0.5, 0.5]),
                Mesh::plane(0.5),
            ],
            materials: vec![
                Material::default(),
                Material {
                    base_color: [0.9, 0.3, 0.2, 1.0],
                    metallic: 0.2,
                    roughness: 0.3,
                    ..Default::default()
                },
                Material::emitter([1.0, 0.9, 0.7], 8.0),
            ],
            instances: vec![
                Instance::new(0, 0),
                Instance::new(1, 1).at([0.0, 0.5, 0.0]),
                Instance {
                    rotation: [180.0, 0.0, 0.0],
                    ..Instance::new(2, 2).at([0.0, 2.5, 0.0])
                },
            ],
            lights: vec![PunctualLight::directional(
                [-0.3, -1.0, -0.4],
                [1.0, 0.95, 0.9],
                2.0,
            )],
            environment: EnvironmentDesc::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_is_valid() {
        let scene = Scene::demo();
        scene.validate().unwrap();
        assert_eq!(scene.triangle_count(), 2 + 12 + 2);
    }

    #[test]
    fn test_rejects_dangling_mesh() {
        let mut scene = Scene::demo();
        scene.instances.push(Instance::new(7, 0));
        assert!(matches!(scene.validate(), Err(RenderError::InvalidScene(_))));
    }

    #[test]
    fn test_instance_transform() {
        let inst = Instance {
            scale: [2.0; 3],
            ..Instance::new(0, 0).at([1.0, 2.0, 3.0])
        };
        let p = inst.transform().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_empty_scene() {
        let scene = Scene::empty();
        scene.validate().unwrap();
        assert_eq!(scene.triangle_count(), 0);
    }
}
