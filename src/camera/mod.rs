// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

#[allow(clippy::module_inception)]
pub mod camera;

pub use camera::{Camera, GpuCamera};
