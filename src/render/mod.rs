// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod dispatch;
pub mod frame_state;
pub mod gbuffer;
pub mod output;
pub mod progressive;

pub use dispatch::Extent;
pub use frame_state::{DebugMode, FrameState, TransportModel};
pub use gbuffer::{GBuffer, GeomData, GrowOnlyCapacity};
pub use output::OutputTarget;
pub use progressive::{Phase, ProgressiveController, RenderSettings};
