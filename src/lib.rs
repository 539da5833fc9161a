// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Progressive GPU path tracer core with two interchangeable backends: a
//! multi-kernel wavefront tracer and a single-kernel inline-query tracer.

pub mod accel;
pub mod backend;
pub mod camera;
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod gpu;
pub mod io;
pub mod lights;
pub mod render;
pub mod renderer;
pub mod scene;
pub mod shaders;

pub use backend::{BackendKind, TracerBackend};
pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use gpu::GpuContext;
pub use render::{DebugMode, Extent, FrameState, GeomData, RenderSettings, TransportModel};
pub use renderer::Renderer;
pub use scene::Scene;
pub use shaders::ShaderComposer;
