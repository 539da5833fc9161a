// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Failures surfaced by the renderer core.
///
/// Setup failures abort startup; resize failures mean the requested
/// resolution cannot be served. Degenerate inputs (no lights, empty
/// viewport) are not errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter found: {0}")]
    NoAdapter(String),

    #[error("GPU device lacks a required capability: {0}")]
    UnsupportedDevice(String),

    #[error(transparent)]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("shader composition failed: {0}")]
    Shader(String),

    #[error("failed to create pipeline '{label}': {message}")]
    Pipeline { label: String, message: String },

    #[error("failed to create descriptor set '{label}': {message}")]
    Descriptor { label: String, message: String },

    #[error("out of device memory allocating '{label}' ({bytes} bytes)")]
    OutOfMemory { label: String, bytes: u64 },

    #[error("invalid scene: {0}")]
    InvalidScene(String),

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("backend '{0}' used before create()")]
    NotCreated(&'static str),

    #[error("backend '{backend}' holds {capacity} pixels, frame needs {pixels}; call update() first")]
    Undersized {
        backend: &'static str,
        pixels: u64,
        capacity: u64,
    },
}

impl RenderError {
    /// Startup-time errors: broken build or unsupported device, never retried.
    pub fn is_setup_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoAdapter(_)
                | Self::UnsupportedDevice(_)
                | Self::RequestDevice(_)
                | Self::Shader(_)
                | Self::Pipeline { .. }
                | Self::Descriptor { .. }
        )
    }

    /// Reallocation failures: the renderer cannot continue at the requested size.
    pub fn is_resize_fatal(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }
}
