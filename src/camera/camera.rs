// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

use crate::constants::{CAMERA_FAR, CAMERA_NEAR, DEFAULT_CAMERA_POSITION, DEFAULT_FOV};
use crate::scene::scene::CameraConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,   // degrees
    pub pitch: f32, // degrees
    pub roll: f32,  // degrees
    pub fov: f32,   // vertical, degrees
    pub aperture: f32,
    pub focal_distance: f32,
}

impl Camera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from(config.position),
            pitch: config.rotation[0],
            yaw: config.rotation[1],
            roll: config.rotation[2],
            fov: config.fov,
            aperture: config.aperture.max(0.0),
            focal_distance: config.focal_distance.max(CAMERA_NEAR),
        }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(
            glam::EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }

    /// Right-handed: the camera looks down its local -Z.
    pub fn basis_vectors(&self) -> (Vec3, Vec3, Vec3) {
        let rot = self.orientation();
        (rot * Vec3::X, rot * Vec3::Y, rot * Vec3::NEG_Z)
    }

    pub fn view(&self) -> Mat4 {
        let (_, up, forward) = self.basis_vectors();
        Mat4::look_to_rh(self.position, forward, up)
    }

    pub fn projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov.to_radians(), aspect, CAMERA_NEAR, CAMERA_FAR)
    }

    pub fn to_gpu(&self, width: u32, height: u32, nb_lights: u32, triangle_count: u32) -> GpuCamera {
        GpuCamera {
            view_inverse: self.view().inverse().to_cols_array_2d(),
            proj_inverse: self.projection(width, height).inverse().to_cols_array_2d(),
            focal_dist: self.focal_distance,
            aperture: self.aperture,
            nb_lights: nb_lights as i32,
            triangle_count,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::from(DEFAULT_CAMERA_POSITION),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: DEFAULT_FOV,
            aperture: 0.0,
            focal_distance: 5.0,
        }
    }
}

/// Must match the WGSL `SceneCamera` struct layout exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuCamera {
    pub view_inverse: [[f32; 4]; 4],
    pub proj_inverse: [[f32; 4]; 4],
    pub focal_dist: f32,
    pub aperture: f32,
    pub nb_lights: i32,
    /// Zero tells traversal to skip the (empty) BVH.
    pub triangle_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    /// Host copy of the kernel's primary-ray construction.
    fn primary_dir(gpu: &GpuCamera, ndc_x: f32, ndc_y: f32) -> Vec3 {
        let view_inv = Mat4::from_cols_array_2d(&gpu.view_inverse);
        let proj_inv = Mat4::from_cols_array_2d(&gpu.proj_inverse);
        let target = proj_inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let local = (target.truncate() / target.w).normalize();
        (view_inv * local.extend(0.0)).truncate().normalize()
    }

    #[test]
    fn test_gpu_layout() {
        assert_eq!(std::mem::size_of::<GpuCamera>(), 144);
    }

    #[test]
    fn test_centre_ray_is_forward() {
        let cam = Camera {
            yaw: 30.0,
            pitch: -15.0,
            ..Default::default()
        };
        let gpu = cam.to_gpu(320, 200, 0, 0);
        let (_, _, forward) = cam.basis_vectors();
        assert!(primary_dir(&gpu, 0.0, 0.0).dot(forward) > 0.9999);

        let origin = Mat4::from_cols_array_2d(&gpu.view_inverse).transform_point3(Vec3::ZERO);
        assert!((origin - cam.position).length() < 1e-4);
    }

    #[test]
    fn test_top_edge_looks_up() {
        let cam = Camera::default();
        let gpu = cam.to_gpu(100, 100, 0, 0);
        let top = primary_dir(&gpu, 0.0, 1.0);
        // Half the vertical field of view above the axis.
        let expected = (DEFAULT_FOV * 0.5).to_radians();
        assert!((top.y.asin() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_default_looks_at_origin() {
        let cam = Camera::from_config(&CameraConfig {
            position: [0.0, 0.0, 5.0],
            ..Default::default()
        });
        let (_, _, forward) = cam.basis_vectors();
        assert!(forward.dot(Vec3::NEG_Z) > 0.9999);
    }
}
