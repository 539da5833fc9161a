// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use dual_tracer::scene::loader::load_scene;
use dual_tracer::{GpuContext, RenderConfig, Renderer, Scene, ShaderComposer};

/// Usage: `dual-tracer [scene.yaml|scene.json] [render.yaml]`.
/// Without a scene the built-in demo is rendered.
fn main() -> Result<()> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let scene = match args.next() {
        Some(path) => load_scene(Path::new(&path))?,
        None => {
            log::info!("No scene given, rendering the demo scene");
            Scene::demo()
        }
    };
    let config = match args.next() {
        Some(path) => RenderConfig::load(Path::new(&path))?,
        None => RenderConfig::default(),
    };
    run(&scene, &config)
}

fn run(scene: &Scene, config: &RenderConfig) -> Result<()> {
    let gpu = Arc::new(GpuContext::new().context("GPU initialisation failed")?);
    let composer = match &config.shader_dir {
        Some(dir) => ShaderComposer::with_overrides(dir)?,
        None => ShaderComposer::embedded(),
    };

    let mut renderer = Renderer::new(
        gpu,
        composer,
        scene,
        config.extent(),
        config.settings,
        config.backend,
    )?;

    let start = Instant::now();
    for _ in 0..config.frames {
        if renderer.render_frame()?.is_none() {
            log::warn!("Viewport is empty, nothing to render");
            return Ok(());
        }
    }
    renderer.gpu().device.poll(wgpu::Maintain::Wait);
    log::info!(
        "{} frames with {} in {:.2?}",
        renderer.frames_rendered(),
        renderer.active_backend(),
        start.elapsed()
    );

    renderer.save_screenshot(&config.output)?;
    if let Some(path) = &config.gbuffer_output {
        renderer.save_gbuffer(path)?;
    }
    Ok(())
}
