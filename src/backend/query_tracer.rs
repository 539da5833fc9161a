// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use super::{BackendKind, ExternalLayouts, ExternalSets, TracerBackend, check_capacity, gbuffer_entry};
use crate::constants::QUERY_TILE_SIZE;
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::gpu::pipeline::{buffer_bind_group, create_compute_pipeline};
use crate::render::dispatch::{dispatch_compute, dispatch_grid};
use crate::render::{Extent, FrameState, GBuffer};
use crate::shaders::{QUERY_KERNEL, ShaderComposer};

const LABEL: &str = "query tracer";

struct Resources {
    gbuffer: GBuffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::ComputePipeline,
}

/// One compute kernel per frame: each lane traces its pixel's whole path
/// with inline traversal. Work-groups are 8x8 tiles; lanes past the image
/// edge return immediately.
#[derive(Default)]
pub struct QueryTracer {
    gpu: Option<Arc<GpuContext>>,
    resources: Option<Resources>,
}

impl QueryTracer {
    fn gpu(&self) -> Result<&Arc<GpuContext>> {
        self.gpu.as_ref().ok_or(RenderError::NotCreated(LABEL))
    }
}

impl TracerBackend for QueryTracer {
    fn kind(&self) -> BackendKind {
        BackendKind::Query
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

        let gbuffer = GBuffer::new(&gpu, extent, "query tracer gbuffer")?;
        let layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("query tracer layout"),
            entries: &[gbuffer_entry()],
        });
        let bind_group = buffer_bind_group(&gpu, &layout, &[&gbuffer.buffer], "query tracer set")?;

        let source = composer.compose_kernel(QUERY_KERNEL)?;
        let pipeline = create_compute_pipeline(&gpu, &source, &layouts.with_backend(&layout), LABEL)?;

        self.resources = Some(Resources {
            gbuffer,
            layout,
            bind_group,
            pipeline,
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
        let res = self.resources.as_ref().ok_or(RenderError::NotCreated(LABEL))?;
        if extent.is_empty() {
            return Ok(());
        }
        check_capacity(self.kind(), &res.gbuffer, extent)?;

        let (gx, gy) = dispatch_grid(extent, QUERY_TILE_SIZE);
        dispatch_compute(
            encoder,
            &[(&res.pipeline, (gx, gy, 1))],
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
        let bind_group = buffer_bind_group(&gpu, &res.layout, &[&gbuffer.buffer], "query tracer set")?;
        std::mem::replace(&mut res.gbuffer, gbuffer).destroy();
        res.bind_group = bind_group;
        Ok(true)
    }

    fn destroy(&mut self) {
        if let Some(res) = self.resources.take() {
            res.gbuffer.destroy();
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
