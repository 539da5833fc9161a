// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// Indexed triangle mesh in object space, as handed over by the scene collaborator.
///
/// Optional attribute streams must be either empty or as long as `positions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub positions: Vec<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normals: Vec<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tangents: Vec<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texcoords: Vec<[f32; 2]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<[f32; 4]>,

    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RenderError::InvalidScene(msg));
        let n = self.positions.len();
        if self.indices.len() % 3 != 0 {
            return invalid(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            ));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            return invalid(format!("index {bad} out of range for {n} vertices"));
        }
        for (stream, len) in [
            ("normals", self.normals.len()),
            ("tangents", self.tangents.len()),
            ("texcoords", self.texcoords.len()),
            ("colors", self.colors.len()),
        ] {
            if len != 0 && len != n {
                return invalid(format!("{stream} has {len} entries, expected {n}"));
            }
        }
        Ok(())
    }

    /// Area-weighted vertex normals, used when the mesh carries none.
    pub fn computed_normals(&self) -> Vec<[f32; 3]> {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(self.positions[tri[k] as usize]));
            let n = (b - a).cross(c - a);
            for &i in tri {
                acc[i as usize] += n;
            }
        }
        acc.into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y).into())
            .collect()
    }

    /// Axis-aligned quad in the XZ plane facing +Y, centred at the origin.
    pub fn plane(half_extent: f32) -> Self {
        let h = half_extent;
        Self {
            name: Some("plane".into()),
            positions: vec![[-h, 0.0, -h], [h, 0.0, -h], [h, 0.0, h], [-h, 0.0, h]],
            normals: vec![[0.0, 1.0, 0.0]; 4],
            tangents: vec![[1.0, 0.0, 0.0]; 4],
            texcoords: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            colors: Vec::new(),
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// Box with flat-shaded faces, centred at the origin.
    pub fn cuboid(half_extents: [f32; 3]) -> Self {
        let h = Vec3::from(half_extents);
        // (normal, tangent) per face
        let faces = [
            (Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (Vec3::NEG_Y, Vec3::X),
            (Vec3::Z, Vec3::X),
            (Vec3::NEG_Z, Vec3::NEG_X),
        ];
        let mut mesh = Self {
            name: Some("cuboid".into()),
            ..Default::default()
        };
        for (n, t) in faces {
            let b = n.cross(t);
            let base = mesh.positions.len() as u32;
            for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let p = (n + t * u + b * v) * h;
                mesh.positions.push(p.into());
                mesh.normals.push(n.into());
                mesh.tangents.push(t.into());
                mesh.texcoords.push(((Vec2::new(u, v) + 1.0) * 0.5).into());
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

/// Octahedral encoding of a unit vector into two snorm16 values.
/// Decoded by `oct_decode` in `common/math.wgsl`.
pub fn oct_encode(v: Vec3) -> u32 {
    let v = v.try_normalize().unwrap_or(Vec3::Z);
    let sum = v.x.abs() + v.y.abs() + v.z.abs();
    let (mut x, mut y) = (v.x / sum, v.y / sum);
    if v.z < 0.0 {
        let sign = |s: f32| if s >= 0.0 { 1.0 } else { -1.0 };
        (x, y) = ((1.0 - y.abs()) * sign(x), (1.0 - x.abs()) * sign(y));
    }
    let snorm = |f: f32| ((f.clamp(-1.0, 1.0) * 32767.0).round() as i16) as u16 as u32;
    snorm(x) | (snorm(y) << 16)
}

/// Inverse of [`oct_encode`], matching WGSL `unpack2x16snorm` semantics.
pub fn oct_decode(packed: u32) -> Vec3 {
    let unorm = |bits: u32| ((bits as u16 as i16) as f32 / 32767.0).max(-1.0);
    let (x, y) = (unorm(packed & 0xffff), unorm(packed >> 16));
    let mut v = Vec3::new(x, y, 1.0 - x.abs() - y.abs());
    if v.z < 0.0 {
        let sign = |s: f32| if s >= 0.0 { 1.0 } else { -1.0 };
        v = Vec3::new((1.0 - y.abs()) * sign(x), (1.0 - x.abs()) * sign(y), v.z);
    }
    v.normalize()
}

/// RGBA8 packing with red in the low byte, as read by WGSL `unpack4x8unorm`.
pub fn pack_rgba8(c: [f32; 4]) -> u32 {
    c.iter().enumerate().fold(0u32, |acc, (i, &v)| {
        acc | (((v.clamp(0.0, 1.0) * 255.0).round() as u32) << (8 * i))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oct_roundtrip_precision() {
        let dirs = [
            Vec3::X,
            Vec3::NEG_Y,
            Vec3::new(0.3, -0.8, -0.52),
            Vec3::new(-0.7, 0.1, -0.7),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        for d in dirs {
            let d = d.normalize();
            let back = oct_decode(oct_encode(d));
            assert!(d.dot(back) > 0.9999, "{d} -> {back}");
        }
    }

    #[test]
    fn test_pack_rgba8_byte_order() {
        assert_eq!(pack_rgba8([1.0, 0.0, 0.0, 0.0]), 0x0000_00ff);
        assert_eq!(pack_rgba8([0.0, 0.0, 0.0, 1.0]), 0xff00_0000);
        assert_eq!(pack_rgba8([1.0; 4]), u32::MAX);
    }

    #[test]
    fn test_builders_are_valid() {
        let plane = Mesh::plane(2.0);
        plane.validate().unwrap();
        assert_eq!(plane.triangle_count(), 2);

        let cube = Mesh::cuboid([1.0, 0.5, 1.0]);
        cube.validate().unwrap();
        assert_eq!(cube.triangle_count(), 12);
        assert_eq!(cube.positions.len(), 24);
    }

    #[test]
    fn test_plane_winding_faces_up() {
        let plane = Mesh::plane(1.0);
        for n in plane.computed_normals() {
            assert!(Vec3::from(n).dot(Vec3::Y) > 0.99);
        }
    }

    #[test]
    fn test_validate_rejects_bad_streams() {
        let mut mesh = Mesh::plane(1.0);
        mesh.colors = vec![[1.0; 4]; 2];
        assert!(matches!(mesh.validate(), Err(RenderError::InvalidScene(_))));

        let mut mesh = Mesh::plane(1.0);
        mesh.indices.push(99);
        assert!(mesh.validate().is_err());
    }
}
