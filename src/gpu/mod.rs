// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod buffers;
pub mod context;
pub mod pipeline;

pub use context::GpuContext;
