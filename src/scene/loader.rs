// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::scene::Scene;

pub fn load_scene(path: &Path) -> Result<Scene> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file: {}", path.display()))?;

    let mut scene: Scene = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON scene file: {}", path.display()))?,
        _ => serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML scene file: {}", path.display()))?,
    };

    // Environment maps are looked up next to the scene, not the CWD.
    let scene_dir = path.parent().unwrap_or(Path::new("."));
    scene.environment.resolve_paths(scene_dir);

    scene
        .validate()
        .with_context(|| format!("Scene {} is inconsistent", path.display()))?;

    log::info!(
        "Loaded scene: {} meshes, {} instances, {} triangles, {} punctual lights",
        scene.meshes.len(),
        scene.instances.len(),
        scene.triangle_count(),
        scene.lights.len()
    );

    Ok(scene)
}
