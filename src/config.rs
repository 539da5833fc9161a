// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::constants::{DEFAULT_FRAMES, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::render::{Extent, RenderSettings};

/// Everything the headless driver needs besides the scene itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub backend: BackendKind,
    pub width: u32,
    pub height: u32,
    /// Progressive frames accumulated before the image is written.
    pub frames: u32,
    #[serde(flatten)]
    pub settings: RenderSettings,
    /// WGSL directory whose modules replace the embedded ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader_dir: Option<PathBuf>,
    pub output: PathBuf,
    /// Optional JSON dump of the final G-Buffer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gbuffer_output: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            frames: DEFAULT_FRAMES,
            settings: RenderSettings::default(),
            shader_dir: None,
            output: PathBuf::from("render.png"),
            gbuffer_output: None,
        }
    }
}

impl RenderConfig {
    /// Read YAML (default) or JSON by extension. Relative paths resolve
    /// against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read render config: {}", path.display()))?;

        let mut config: RenderConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON render config: {}", path.display()))?,
            _ => serde_yml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML render config: {}", path.display()))?,
        };

        let base = path.parent().unwrap_or(Path::new("."));
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(dir) = config.shader_dir.as_mut() {
            resolve(dir);
        }
        resolve(&mut config.output);
        if let Some(dump) = config.gbuffer_output.as_mut() {
            resolve(dump);
        }
        config.settings = config.settings.sanitized();

        log::info!(
            "Render config: {} at {}x{}, {} frames",
            config.backend,
            config.width,
            config.height,
            config.frames
        );
        Ok(config)
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DebugMode, TransportModel};

    #[test]
    fn test_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.yaml");
        fs::write(
            &path,
            "backend: query\nwidth: 17\nheight: 9\nspp: 4\ndebug_mode: normal\ntransport: gltf\n",
        )
        .unwrap();

        let config = RenderConfig::load(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Query);
        assert_eq!(config.extent(), Extent::new(17, 9));
        assert_eq!(config.settings.spp, 4);
        assert_eq!(config.settings.debug_mode, DebugMode::Normal);
        assert_eq!(config.settings.transport, TransportModel::Gltf);
        assert_eq!(config.frames, DEFAULT_FRAMES);
        assert_eq!(config.output, dir.path().join("render.png"));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = RenderConfig {
            frames: 3,
            gbuffer_output: Some(PathBuf::from("/tmp/gbuffer.json")),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = RenderConfig::load(&path).unwrap();
        assert_eq!(loaded.frames, 3);
        assert_eq!(loaded.gbuffer_output, config.gbuffer_output);
        assert_eq!(loaded.settings, config.settings);
    }

    #[test]
    fn test_out_of_range_settings_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.yaml");
        fs::write(&path, "spp: 0\nenvironment_prob: 7.0\n").unwrap();
        let config = RenderConfig::load(&path).unwrap();
        assert_eq!(config.settings.spp, 1);
        assert_eq!(config.settings.environment_prob, 1.0);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "width: [not a number").unwrap();
        let err = RenderConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.yaml"));
    }
}
