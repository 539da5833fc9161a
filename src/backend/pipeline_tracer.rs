// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use super::{BackendKind, ExternalLayouts, ExternalSets, TracerBackend, check_capacity, gbuffer_entry};
use crate::constants::WAVEFRONT_GROUP_SIZE;
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::gpu::buffers;
use crate::gpu::pipeline::{buffer_bind_group, create_compute_pipeline, storage_entry};
use crate::render::dispatch::{dispatch_compute, dispatch_linear, fold_groups};
use crate::render::{Extent, FrameState, GBuffer};
use crate::shaders::{ShaderComposer, WAVEFRONT_KERNELS};

const LABEL: &str = "pipeline tracer";

/// WGSL `PathState`: per-pixel path carried between stages.
pub const PATH_STATE_SIZE: u64 = 96;
/// WGSL `HitRecord`: closest hit of the last intersect stage.
pub const HIT_RECORD_SIZE: u64 = 24;

struct Stages {
    raygen: wgpu::ComputePipeline,
    intersect: wgpu::ComputePipeline,
    closest_hit: wgpu::ComputePipeline,
    miss: wgpu::ComputePipeline,
    resolve: wgpu::ComputePipeline,
}

struct Resources {
    gbuffer: GBuffer,
    paths: wgpu::Buffer,
    hits: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    stages: Stages,
}

/// Wavefront tracer: the path is split into ray generation, traversal,
/// closest-hit shading, miss shading and resolve kernels that hand work to
/// each other through per-pixel path and hit buffers.
#[derive(Default)]
pub struct PipelineTracer {
    gpu: Option<Arc<GpuContext>>,
    resources: Option<Resources>,
}

fn path_buffers(gpu: &GpuContext, pixels: u64) -> Result<(wgpu::Buffer, wgpu::Buffer)> {
    let paths = buffers::try_create_storage_buffer(gpu, pixels * PATH_STATE_SIZE, "pipeline tracer paths")?;
    let hits = buffers::try_create_storage_buffer(gpu, pixels * HIT_RECORD_SIZE, "pipeline tracer hits")?;
    Ok((paths, hits))
}

fn backend_set(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    gbuffer: &GBuffer,
    paths: &wgpu::Buffer,
    hits: &wgpu::Buffer,
) -> Result<wgpu::BindGroup> {
    buffer_bind_group(gpu, layout, &[&gbuffer.buffer, paths, hits], "pipeline tracer set")
}

impl PipelineTracer {
    fn gpu(&self) -> Result<&Arc<GpuContext>> {
        self.gpu.as_ref().ok_or(RenderError::NotCreated(LABEL))
    }

    fn compile_stages(
        gpu: &GpuContext,
        composer: &ShaderComposer,
        layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<Stages> {
        let mut compiled = Vec::with_capacity(WAVEFRONT_KERNELS.len());
        for kernel in WAVEFRONT_KERNELS {
            let source = composer.compose_kernel(kernel)?;
            compiled.push(create_compute_pipeline(gpu, &source, layouts, kernel)?);
        }
        let [raygen, intersect, closest_hit, miss, resolve]: [wgpu::ComputePipeline; 5] = compiled
            .try_into()
            .map_err(|_| RenderError::Shader("wavefront kernel set is incomplete".into()))?;
        Ok(Stages {
            raygen,
            intersect,
            closest_hit,
            miss,
            resolve,
        })
    }
}

impl TracerBackend for PipelineTracer {
    fn kind(&self) -> BackendKind {
        BackendKind::Pipeline
    }

    fn setup(&mut self, gpu: Arc<GpuContext>) {
        self.gpu = Some(gpu);
    }

    fn create(
        &mut self,
        extent: Extent,
        layouts: &ExternalLayouts,
        composer: &ShaderComposer,
    ) -> Result<()> {
        self.destroy();
        let gpu = self.gpu()?.clone();

        let gbuffer = GBuffer::new(&gpu, extent, "pipeline tracer gbuffer")?;
        let (paths, hits) = path_buffers(&gpu, gbuffer.capacity().capacity())?;
        let layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pipeline tracer layout"),
            entries: &[gbuffer_entry(), storage_entry(1, false), storage_entry(2, false)],
        });
        let bind_group = backend_set(&gpu, &layout, &gbuffer, &paths, &hits)?;
        let stages = Self::compile_stages(&gpu, composer, &layouts.with_backend(&layout))?;

        self.resources = Some(Resources {
            gbuffer,
            paths,
            hits,
            layout,
            bind_group,
            stages,
        });
        Ok(())
    }

    fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        extent: Extent,
        sets: &ExternalSets,
        state: FrameState,
    ) -> Result<()> {
        let gpu = self.gpu()?;
        let res = self.resources.as_ref().ok_or(RenderError::NotCreated(LABEL))?;
        if extent.is_empty() {
            return Ok(());
        }
        check_capacity(self.kind(), &res.gbuffer, extent)?;

        // Sample index, running sum and heat start from zero every frame.
        encoder.clear_buffer(&res.paths, 0, Some(extent.pixel_count() * PATH_STATE_SIZE));

        let max_dim = gpu.device.limits().max_compute_workgroups_per_dimension;
        let (gx, gy) = fold_groups(dispatch_linear(extent, WAVEFRONT_GROUP_SIZE), max_dim);
        let groups = (gx, gy, 1);
        let s = &res.stages;

        let mut stages = Vec::new();
        for _ in 0..state.spp.max(1) {
            stages.push((&s.raygen, groups));
            for _ in 0..state.max_depth.max(1) {
                stages.push((&s.intersect, groups));
                stages.push((&s.closest_hit, groups));
                stages.push((&s.miss, groups));
            }
            stages.push((&s.resolve, groups));
        }
        dispatch_compute(
            encoder,
            &stages,
            &sets.with_backend(&res.bind_group),
            &state,
            LABEL,
        );
        Ok(())
    }

    fn update(&mut self, extent: Extent) -> Result<bool> {
        let gpu = self.gpu()?.clone();
        let res = self.resources.as_mut().ok_or(RenderError::NotCreated(LABEL))?;
        let Some(gbuffer) = res.gbuffer.grown(&gpu, extent)? else {
            return Ok(false);
        };
        // Build everything before swapping so a failure keeps the old set intact.
        let (paths, hits) = path_buffers(&gpu, gbuffer.capacity().capacity())?;
        let bind_group = backend_set(&gpu, &res.layout, &gbuffer, &paths, &hits)?;

        std::mem::replace(&mut res.gbuffer, gbuffer).destroy();
        std::mem::replace(&mut res.paths, paths).destroy();
        std::mem::replace(&mut res.hits, hits).destroy();
        res.bind_group = bind_group;
        Ok(true)
    }

    fn destroy(&mut self) {
        if let Some(res) = self.resources.take() {
            res.gbuffer.destroy();
            res.paths.destroy();
            res.hits.destroy();
            log::debug!("{LABEL}: resources released");
        }
    }

    fn is_created(&self) -> bool {
        self.resources.is_some()
    }

    fn gbuffer(&self) -> Option<&GBuffer> {
        self.resources.as_ref().map(|r| &r.gbuffer)
    }
}
