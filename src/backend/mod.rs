// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod pipeline_tracer;
pub mod query_tracer;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gpu::GpuContext;
use crate::render::{Extent, FrameState, GBuffer};
use crate::shaders::ShaderComposer;

pub use pipeline_tracer::PipelineTracer;
pub use query_tracer::QueryTracer;

/// Which tracer produces the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Multi-kernel wavefront tracer.
    #[default]
    Pipeline,
    /// Single-kernel inline-query tracer.
    Query,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Pipeline, BackendKind::Query];

    pub fn label(self) -> &'static str {
        match self {
            BackendKind::Pipeline => "pipeline tracer",
            BackendKind::Query => "query tracer",
        }
    }

    /// Fresh, unset-up backend of this kind.
    pub fn instantiate(self) -> Box<dyn TracerBackend> {
        match self {
            BackendKind::Pipeline => Box::new(PipelineTracer::default()),
            BackendKind::Query => Box::new(QueryTracer::default()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Layouts of the descriptor sets the facade owns (sets 0-3).
pub struct ExternalLayouts<'a> {
    pub accel: &'a wgpu::BindGroupLayout,
    pub output: &'a wgpu::BindGroupLayout,
    pub scene: &'a wgpu::BindGroupLayout,
    pub environment: &'a wgpu::BindGroupLayout,
}

impl<'a> ExternalLayouts<'a> {
    /// Full pipeline layout order with the backend's own set appended.
    pub fn with_backend<'b>(&self, backend: &'b wgpu::BindGroupLayout) -> [&'b wgpu::BindGroupLayout; 5]
    where
        'a: 'b,
    {
        [self.accel, self.output, self.scene, self.environment, backend]
    }
}

/// Bound descriptor sets 0-3 for one frame.
pub struct ExternalSets<'a> {
    pub accel: &'a wgpu::BindGroup,
    pub output: &'a wgpu::BindGroup,
    pub scene: &'a wgpu::BindGroup,
    pub environment: &'a wgpu::BindGroup,
}

impl<'a> ExternalSets<'a> {
    pub fn with_backend<'b>(&self, backend: &'b wgpu::BindGroup) -> [&'b wgpu::BindGroup; 5]
    where
        'a: 'b,
    {
        [self.accel, self.output, self.scene, self.environment, backend]
    }
}

/// A path-tracing backend. Both implementations consume the same external
/// descriptor sets and Frame State and fill an equivalent G-Buffer, so the
/// facade can swap them between frames.
pub trait TracerBackend {
    fn kind(&self) -> BackendKind;

    /// Bind the device. Allocates nothing.
    fn setup(&mut self, gpu: Arc<GpuContext>);

    /// Allocate size-dependent buffers, the backend descriptor set and
    /// the compute pipelines.
    fn create(
        &mut self,
        extent: Extent,
        layouts: &ExternalLayouts,
        composer: &ShaderComposer,
    ) -> Result<()>;

    /// Record one frame into `encoder`. Overwrites the whole G-Buffer.
    fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        extent: Extent,
        sets: &ExternalSets,
        state: FrameState,
    ) -> Result<()>;

    /// Grow buffers when `extent` exceeds capacity. Returns true if the
    /// backend descriptor set was rewritten.
    fn update(&mut self, extent: Extent) -> Result<bool>;

    /// Release GPU resources. Safe to call repeatedly.
    fn destroy(&mut self);

    fn is_created(&self) -> bool;

    fn gbuffer(&self) -> Option<&GBuffer>;
}

/// Backend set entry 0 shared by both tracers.
pub(crate) fn gbuffer_entry() -> wgpu::BindGroupLayoutEntry {
    crate::gpu::pipeline::storage_entry(0, false)
}

pub(crate) fn check_capacity(kind: BackendKind, gbuffer: &GBuffer, extent: Extent) -> Result<()> {
    let capacity = gbuffer.capacity().capacity();
    if extent.pixel_count() > capacity {
        return Err(crate::error::RenderError::Undersized {
            backend: kind.label(),
            pixels: extent.pixel_count(),
            capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_and_labels() {
        for kind in BackendKind::ALL {
            let backend = kind.instantiate();
            assert_eq!(backend.kind(), kind);
            assert!(!backend.is_created());
            assert!(backend.gbuffer().is_none());
        }
        let parsed: BackendKind = serde_yml::from_str("query").unwrap();
        assert_eq!(parsed, BackendKind::Query);
        assert_eq!(BackendKind::default(), BackendKind::Pipeline);
        assert_eq!(BackendKind::Pipeline.to_string(), "pipeline tracer");
    }

    #[test]
    fn test_destroy_before_create_is_noop() {
        for kind in BackendKind::ALL {
            let mut backend = kind.instantiate();
            backend.destroy();
            backend.destroy();
            assert!(!backend.is_created());
        }
    }

    #[test]
    fn test_update_before_create_errors() {
        let mut backend = BackendKind::Query.instantiate();
        let err = backend.update(Extent::new(4, 4)).unwrap_err();
        assert!(matches!(err, crate::error::RenderError::NotCreated(_)));
    }
}
