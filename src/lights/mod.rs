// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod alias;
pub mod index;

pub use alias::{AliasTable, ImptSampData};
pub use index::{LightBufInfo, LightIndex, PuncLight, TrigLight};

/// Rec. 709 luminance, same weights as `luminance` in `common/math.wgsl`.
pub fn luminance(c: [f32; 3]) -> f32 {
    0.2126 * c[0] + 0.7152 * c[1] + 0.0722 * c[2]
}
