use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::render::{Extent, GeomData};

pub fn save_png(pixels: &[u8], extent: Extent, path: &Path) -> Result<()> {
    let img = image::RgbaImage::from_raw(extent.width, extent.height, pixels.to_vec())
        .context("Failed to create image from pixel data")?;
    img.save(path)
        .with_context(|| format!("Failed to save image to {}", path.display()))?;
    log::info!("Image saved to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct GBufferDump<'a> {
    width: u32,
    height: u32,
    entries: Vec<GBufferEntry<'a>>,
}

/// Pixels whose primary ray escaped are written with `material: null`.
#[derive(Serialize)]
struct GBufferEntry<'a> {
    material: Option<u32>,
    position: &'a [f32; 3],
    normal: &'a [f32; 3],
    tangent: &'a [f32; 3],
    texcoord: &'a [f32; 2],
    color: &'a [f32; 3],
}

pub fn save_gbuffer_json(gbuffer: &[GeomData], extent: Extent, path: &Path) -> Result<()> {
    let dump = GBufferDump {
        width: extent.width,
        height: extent.height,
        entries: gbuffer
            .iter()
            .map(|g| GBufferEntry {
                material: (!g.is_miss()).then_some(g.mat_index),
                position: &g.position,
                normal: &g.normal,
                tangent: &g.tangent,
                texcoord: &g.texcoord,
                color: &g.vert_color,
            })
            .collect(),
    };
    let json = serde_json::to_string(&dump).context("Failed to serialize G-Buffer")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write G-Buffer to {}", path.display()))?;
    log::info!("G-Buffer ({} entries) saved to {}", gbuffer.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gbuffer::MISS_MATERIAL;
    use bytemuck::Zeroable;

    #[test]
    fn test_png_roundtrip_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let extent = Extent::new(3, 2);
        let pixels: Vec<u8> = (0..extent.pixel_count() * 4).map(|i| i as u8).collect();
        save_png(&pixels, extent, &path).unwrap();
        let img = image::open(&path).unwrap().into_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(1, 0).0, [4, 5, 6, 7]);
    }

    #[test]
    fn test_short_pixel_buffer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save_png(&[0; 8], Extent::new(4, 4), &dir.path().join("x.png")).is_err());
    }

    #[test]
    fn test_gbuffer_dump_marks_misses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gbuffer.json");
        let hit = GeomData {
            mat_index: 2,
            ..GeomData::zeroed()
        };
        let miss = GeomData {
            mat_index: MISS_MATERIAL,
            ..GeomData::zeroed()
        };
        save_gbuffer_json(&[hit, miss], Extent::new(2, 1), &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["width"], 2);
        assert_eq!(value["entries"][0]["material"], 2);
        assert!(value["entries"][1]["material"].is_null());
    }
}
