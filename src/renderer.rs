// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::accel::AccelStructure;
use crate::backend::{BackendKind, ExternalLayouts, ExternalSets, TracerBackend};
use crate::camera::Camera;
use crate::environment::{Environment, EnvironmentBinding};
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::io;
use crate::lights::LightIndex;
use crate::render::{Extent, FrameState, GeomData, OutputTarget, ProgressiveController, RenderSettings};
use crate::scene::Scene;
use crate::scene::binding::SceneBinding;
use crate::scene::geometry::GeometryData;
use crate::shaders::ShaderComposer;

/// Layouts of the facade-owned descriptor sets 0-3.
struct SharedLayouts {
    accel: wgpu::BindGroupLayout,
    output: wgpu::BindGroupLayout,
    scene: wgpu::BindGroupLayout,
    environment: wgpu::BindGroupLayout,
}

impl SharedLayouts {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            accel: AccelStructure::layout(device),
            output: OutputTarget::layout(device),
            scene: SceneBinding::layout(device),
            environment: EnvironmentBinding::layout(device),
        }
    }

    fn external(&self) -> ExternalLayouts<'_> {
        ExternalLayouts {
            accel: &self.accel,
            output: &self.output,
            scene: &self.scene,
            environment: &self.environment,
        }
    }
}

/// Scene-derived GPU data, immutable until the next `set_scene`.
struct SceneResources {
    accel: AccelStructure,
    binding: SceneBinding,
    environment: EnvironmentBinding,
    light_count: u32,
}

impl SceneResources {
    fn build(
        gpu: &GpuContext,
        layouts: &SharedLayouts,
        scene: &Scene,
        camera: &Camera,
        extent: Extent,
    ) -> Result<Self> {
        scene.validate()?;
        let start = Instant::now();
        let geometry = GeometryData::build(scene);
        let lights = LightIndex::build(&scene.lights, &geometry);
        let env = Environment::from_desc(&scene.environment)?;

        let accel = AccelStructure::build(gpu, &layouts.accel, &geometry)?;
        let light_count = lights.info.light_count();
        let gpu_camera = camera.to_gpu(extent.width, extent.height, light_count, accel.triangle_count);
        let binding = SceneBinding::new(gpu, &layouts.scene, &gpu_camera, &geometry, &lights)?;
        let environment = EnvironmentBinding::new(gpu, &layouts.environment, &env)?;

        log::info!(
            "Scene resident: {} triangles, {} lights, {} BVH nodes in {:.1?}",
            accel.triangle_count,
            light_count,
            accel.node_count,
            start.elapsed()
        );
        Ok(Self {
            accel,
            binding,
            environment,
            light_count,
        })
    }
}

/// Renderer facade: owns the shared descriptor sets, the progressive
/// controller and the backends, and issues one frame per `render_frame`.
pub struct Renderer {
    gpu: Arc<GpuContext>,
    composer: ShaderComposer,
    layouts: SharedLayouts,
    scene: SceneResources,
    output: OutputTarget,
    camera: Camera,
    controller: ProgressiveController,
    backends: Vec<Box<dyn TracerBackend>>,
    active: BackendKind,
    frames_rendered: u64,
}

impl Renderer {
    pub fn new(
        gpu: Arc<GpuContext>,
        composer: ShaderComposer,
        scene: &Scene,
        extent: Extent,
        settings: RenderSettings,
        backend: BackendKind,
    ) -> Result<Self> {
        let layouts = SharedLayouts::new(&gpu.device);
        let camera = Camera::from_config(&scene.camera);
        let scene_resources = SceneResources::build(&gpu, &layouts, scene, &camera, extent)?;
        let output = OutputTarget::new(&gpu, &layouts.output, extent)?;

        let mut renderer = Self {
            gpu,
            composer,
            layouts,
            scene: scene_resources,
            output,
            camera,
            controller: ProgressiveController::new(extent, settings),
            backends: Vec::with_capacity(BackendKind::ALL.len()),
            active: backend,
            frames_rendered: 0,
        };
        renderer.select_backend(backend)?;
        Ok(renderer)
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    pub fn active_backend(&self) -> BackendKind {
        self.active
    }

    pub fn viewport(&self) -> Extent {
        self.controller.viewport()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controller(&self) -> &ProgressiveController {
        &self.controller
    }

    pub fn settings(&self) -> &RenderSettings {
        self.controller.settings()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    fn backend(&self, kind: BackendKind) -> Option<&dyn TracerBackend> {
        self.backends.iter().find(|b| b.kind() == kind).map(|b| b.as_ref())
    }

    fn backend_mut(&mut self, kind: BackendKind) -> Option<&mut Box<dyn TracerBackend>> {
        self.backends.iter_mut().find(|b| b.kind() == kind)
    }

    /// Route subsequent frames through `kind`, creating it on first use.
    /// The external sets are shared, so nothing is migrated.
    pub fn select_backend(&mut self, kind: BackendKind) -> Result<()> {
        let extent = self.viewport();
        match self.backend_mut(kind) {
            Some(backend) => {
                // It may have missed resizes while inactive.
                backend.update(extent)?;
            }
            None => {
                let start = Instant::now();
                let mut backend = kind.instantiate();
                backend.setup(self.gpu.clone());
                backend.create(extent, &self.layouts.external(), &self.composer)?;
                log::info!("Created {kind} in {:.1?}", start.elapsed());
                self.backends.push(backend);
            }
        }
        if self.active != kind {
            log::info!("Switched backend: {} -> {kind}", self.active);
        }
        self.active = kind;
        Ok(())
    }

    /// Request a new viewport. Applied at the next frame boundary.
    pub fn resize(&mut self, extent: Extent) {
        if self.controller.set_viewport(extent) {
            log::debug!("Viewport -> {}x{}", extent.width, extent.height);
        }
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.upload_camera();
        self.controller.invalidate();
    }

    /// Replace the resident scene. Light index, BVH and environment are rebuilt.
    pub fn set_scene(&mut self, scene: &Scene) -> Result<()> {
        let camera = Camera::from_config(&scene.camera);
        self.scene = SceneResources::build(&self.gpu, &self.layouts, scene, &camera, self.viewport())?;
        self.camera = camera;
        self.controller.invalidate();
        Ok(())
    }

    /// Edit render settings; returns true if the change resets accumulation.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut RenderSettings)) -> bool {
        self.controller.update_settings(edit)
    }

    fn upload_camera(&self) {
        let extent = self.viewport();
        let gpu_camera = self.camera.to_gpu(
            extent.width,
            extent.height,
            self.scene.light_count,
            self.scene.accel.triangle_count,
        );
        self.scene.binding.update_camera(&self.gpu.queue, &gpu_camera);
    }

    fn apply_resize(&mut self) -> Result<()> {
        let extent = self.viewport();
        self.output = OutputTarget::new(&self.gpu, &self.layouts.output, extent)?;
        self.upload_camera();
        let active = self.active;
        if let Some(backend) = self.backend_mut(active) {
            backend.update(extent)?;
        }
        Ok(())
    }

    /// Render one progressive frame with the active backend.
    /// Returns the frame state used, or `None` if the viewport is empty.
    pub fn render_frame(&mut self) -> Result<Option<FrameState>> {
        let Some(state) = self.controller.next_frame() else {
            log::debug!("Empty viewport, frame skipped");
            return Ok(None);
        };
        if self.controller.resize_pending() {
            if let Err(e) = self.apply_resize() {
                // The frame state was already issued; restart accumulation on retry.
                self.controller.invalidate();
                return Err(e);
            }
            self.controller.complete_resize();
        }

        let extent = self.viewport();
        let backend = self
            .backend(self.active)
            .ok_or(RenderError::NotCreated(self.active.label()))?;
        let sets = ExternalSets {
            accel: &self.scene.accel.bind_group,
            output: &self.output.bind_group,
            scene: &self.scene.binding.bind_group,
            environment: &self.scene.environment.bind_group,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        backend.run(&mut encoder, extent, &sets, state)?;
        self.gpu.queue.submit(Some(encoder.finish()));
        self.frames_rendered += 1;
        Ok(Some(state))
    }

    /// Row-major G-Buffer of the active backend for the current viewport.
    pub fn read_gbuffer(&self) -> Result<Vec<GeomData>> {
        let backend = self
            .backend(self.active)
            .ok_or(RenderError::NotCreated(self.active.label()))?;
        let gbuffer = backend
            .gbuffer()
            .ok_or(RenderError::NotCreated(self.active.label()))?;
        gbuffer.read(&self.gpu, self.output.extent)
    }

    /// Pixel capacity and reallocation count of the active backend's G-Buffer.
    pub fn gbuffer_capacity(&self) -> Option<(u64, u32)> {
        let gbuffer = self.backend(self.active)?.gbuffer()?;
        let capacity = gbuffer.capacity();
        Some((capacity.capacity(), capacity.reallocations()))
    }

    /// Tonemapped RGBA8 image of the last frame.
    pub fn read_output(&self) -> Result<Vec<u8>> {
        self.output.read_pixels(&self.gpu)
    }

    /// Linear running mean per pixel.
    pub fn read_accumulation(&self) -> Result<Vec<[f32; 4]>> {
        self.output.read_accumulation(&self.gpu)
    }

    pub fn save_screenshot(&self, path: &Path) -> anyhow::Result<()> {
        let pixels = self.read_output()?;
        io::save_png(&pixels, self.output.extent, path)
    }

    pub fn save_gbuffer(&self, path: &Path) -> anyhow::Result<()> {
        let gbuffer = self.read_gbuffer()?;
        io::save_gbuffer_json(&gbuffer, self.output.extent, path)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        for backend in &mut self.backends {
            backend.destroy();
        }
    }
}
