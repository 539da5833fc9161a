// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod binding;
pub mod geometry;
pub mod light;
pub mod loader;
pub mod material;
pub mod mesh;
#[allow(clippy::module_inception)]
pub mod scene;

pub use scene::{CameraConfig, Instance, Scene};
