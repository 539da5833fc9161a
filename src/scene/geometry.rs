// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec3};

use super::material::{GpuMaterial, Material};
use super::mesh::{oct_encode, pack_rgba8};
use super::scene::Scene;
use crate::accel::aabb::Aabb;

/// World-space vertex. Must match the WGSL `Vertex` struct layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    /// Octahedral-encoded shading normal.
    pub normal: u32,
    pub texcoord: [f32; 2],
    /// Octahedral-encoded tangent.
    pub tangent: u32,
    /// RGBA8, red in the low byte.
    pub color: u32,
}

/// Per-instance lookup used by the hit kernels. Must match WGSL `InstanceData`.
///
/// Indices are stored relative to the instance's first vertex, so a triangle
/// `t` reads `vertices[vertex_offset + indices[3t + k]]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct InstanceData {
    pub vertex_offset: u32,
    pub index_offset: u32,
    pub material_index: u32,
    pub triangle_count: u32,
}

/// Scene geometry flattened into the buffers of descriptor sets 0 and 2.
pub struct GeometryData {
    pub vertices: Vec<GpuVertex>,
    pub indices: Vec<u32>,
    pub instances: Vec<InstanceData>,
    /// Owning instance of every global triangle.
    pub triangle_instances: Vec<u32>,
    pub materials: Vec<GpuMaterial>,
    /// Host copy of the scene materials, indexed like `materials`.
    pub source_materials: Vec<Material>,
}

impl GeometryData {
    /// Bake every instance into world space. Meshes shared by several
    /// instances are duplicated so the BVH can stay single-level.
    pub fn build(scene: &Scene) -> Self {
        let mut data = Self {
            vertices: Vec::new(),
            indices: Vec::with_capacity(scene.triangle_count() * 3),
            instances: Vec::with_capacity(scene.instances.len()),
            triangle_instances: Vec::with_capacity(scene.triangle_count()),
            materials: Vec::new(),
            source_materials: scene.materials.clone(),
        };
        if data.source_materials.is_empty() {
            data.source_materials.push(Material::default());
        }
        data.materials = data.source_materials.iter().map(GpuMaterial::from).collect();

        for (inst_idx, inst) in scene.instances.iter().enumerate() {
            let mesh = &scene.meshes[inst.mesh];
            let to_world = inst.transform();
            let normal_matrix = Mat3::from_mat4(to_world).inverse().transpose();
            let computed_normals;
            let normals = if mesh.normals.is_empty() {
                computed_normals = mesh.computed_normals();
                &computed_normals
            } else {
                &mesh.normals
            };

            let vertex_offset = data.vertices.len() as u32;
            for (i, &p) in mesh.positions.iter().enumerate() {
                let n = (normal_matrix * Vec3::from(normals[i])).normalize_or(Vec3::Y);
                let t = mesh
                    .tangents
                    .get(i)
                    .map(|&t| (Mat3::from_mat4(to_world) * Vec3::from(t)).normalize_or(Vec3::X))
                    .unwrap_or_else(|| n.any_orthonormal_vector());
                data.vertices.push(GpuVertex {
                    position: to_world.transform_point3(Vec3::from(p)).into(),
                    normal: oct_encode(n),
                    texcoord: mesh.texcoords.get(i).copied().unwrap_or([0.0; 2]),
                    tangent: oct_encode(t),
                    color: pack_rgba8(mesh.colors.get(i).copied().unwrap_or([1.0; 4])),
                });
            }

            let index_offset = data.indices.len() as u32;
            data.indices.extend_from_slice(&mesh.indices);
            data.triangle_instances
                .extend(std::iter::repeat_n(inst_idx as u32, mesh.triangle_count()));
            data.instances.push(InstanceData {
                vertex_offset,
                index_offset,
                material_index: inst.material as u32,
                triangle_count: mesh.triangle_count() as u32,
            });
        }

        data
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_instances.len()
    }

    /// World-space corners of global triangle `tri`.
    pub fn triangle(&self, tri: usize) -> [Vec3; 3] {
        let inst = &self.instances[self.triangle_instances[tri] as usize];
        [0, 1, 2].map(|k| {
            let v = inst.vertex_offset + self.indices[tri * 3 + k];
            Vec3::from(self.vertices[v as usize].position)
        })
    }

    pub fn triangle_texcoords(&self, tri: usize) -> [[f32; 2]; 3] {
        let inst = &self.instances[self.triangle_instances[tri] as usize];
        [0, 1, 2].map(|k| {
            let v = inst.vertex_offset + self.indices[tri * 3 + k];
            self.vertices[v as usize].texcoord
        })
    }

    pub fn triangle_material(&self, tri: usize) -> u32 {
        self.instances[self.triangle_instances[tri] as usize].material_index
    }

    pub fn triangle_aabbs(&self) -> Vec<Aabb> {
        (0..self.triangle_count())
            .map(|t| {
                let [a, b, c] = self.triangle(t);
                Aabb::from_point(a).expand(b).expand(c).pad()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mesh::Mesh;
    use crate::scene::scene::Instance;

    #[test]
    fn test_gpu_layouts() {
        assert_eq!(std::mem::size_of::<GpuVertex>(), 32);
        assert_eq!(std::mem::size_of::<InstanceData>(), 16);
    }

    #[test]
    fn test_offsets_follow_instances() {
        let scene = Scene::demo();
        let geo = GeometryData::build(&scene);

        assert_eq!(geo.instances.len(), 3);
        assert_eq!(geo.triangle_count(), 16);
        assert_eq!(geo.instances[0].vertex_offset, 0);
        assert_eq!(geo.instances[1].vertex_offset, 4);
        assert_eq!(geo.instances[1].index_offset, 6);
        assert_eq!(geo.instances[2].vertex_offset, 4 + 24);
        assert_eq!(geo.instances[2].material_index, 2);
        assert_eq!(geo.triangle_instances[2], 1);
        assert_eq!(geo.triangle_material(15), 2);
    }

    #[test]
    fn test_world_space_bake() {
        let mut scene = Scene::empty();
        scene.meshes.push(Mesh::plane(1.0));
        scene.instances.push(Instance::new(0, 0).at([0.0, 3.0, 0.0]));
        let geo = GeometryData::build(&scene);

        for t in 0..geo.triangle_count() {
            for p in geo.triangle(t) {
                assert!((p.y - 3.0).abs() < 1e-6);
            }
        }
        // One default material is supplied when the scene has none.
        assert_eq!(geo.materials.len(), 1);
    }

    #[test]
    fn test_flipped_instance_normals() {
        let scene = Scene::demo();
        let geo = GeometryData::build(&scene);
        let inst = geo.instances[2];
        let v = geo.vertices[inst.vertex_offset as usize];
        let n = crate::scene::mesh::oct_decode(v.normal);
        assert!(n.dot(Vec3::NEG_Y) > 0.99, "{n}");
    }
}
