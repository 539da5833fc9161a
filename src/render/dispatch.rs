// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

use super::frame_state::FrameState;

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Work-groups of `tile × tile` lanes covering every pixel of `extent`.
pub fn dispatch_grid(extent: Extent, tile: u32) -> (u32, u32) {
    (extent.width.div_ceil(tile), extent.height.div_ceil(tile))
}

/// One-dimensional work-groups of `lanes` covering every pixel.
pub fn dispatch_linear(extent: Extent, lanes: u32) -> u32 {
    extent.pixel_count().div_ceil(lanes as u64) as u32
}

/// Fold a 1D group count into `(x, y)` so neither exceeds `max_per_dim`.
/// Kernels rebuild the lane as `gid.x + gid.y * num_workgroups.x * lanes`.
pub fn fold_groups(groups: u32, max_per_dim: u32) -> (u32, u32) {
    if groups <= max_per_dim {
        return (groups, 1);
    }
    (max_per_dim, groups.div_ceil(max_per_dim))
}

/// Record one compute pass: bind `bind_groups` at sets 0.., then run each
/// `(pipeline, groups)` stage in order with the frame state pushed.
/// All pipelines must share one layout.
pub fn dispatch_compute(
    encoder: &mut wgpu::CommandEncoder,
    stages: &[(&wgpu::ComputePipeline, (u32, u32, u32))],
    bind_groups: &[&wgpu::BindGroup],
    state: &FrameState,
    label: &str,
) {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some(label),
        timestamp_writes: None,
    });
    for (i, bg) in bind_groups.iter().enumerate() {
        pass.set_bind_group(i as u32, Some(*bg), &[]);
    }
    for &(pipeline, (x, y, z)) in stages {
        pass.set_pipeline(pipeline);
        pass.set_push_constants(0, state.as_bytes());
        pass.dispatch_workgroups(x, y, z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{QUERY_TILE_SIZE, WAVEFRONT_GROUP_SIZE};

    /// Lanes of the 2D grid that fall outside the viewport and must self-clip.
    fn clipped_lanes(extent: Extent, tile: u32) -> u64 {
        let (gx, gy) = dispatch_grid(extent, tile);
        (gx * tile) as u64 * (gy * tile) as u64 - extent.pixel_count()
    }

    #[test]
    fn test_partial_tiles_are_covered() {
        let extent = Extent::new(17, 9);
        assert_eq!(dispatch_grid(extent, QUERY_TILE_SIZE), (3, 2));
        assert_eq!(extent.pixel_count(), 153);
        // 24 x 16 lanes launched for 153 pixels.
        assert_eq!(clipped_lanes(extent, QUERY_TILE_SIZE), 231);
    }

    #[test]
    fn test_exact_tiles() {
        let extent = Extent::new(64, 32);
        assert_eq!(dispatch_grid(extent, 8), (8, 4));
        assert_eq!(clipped_lanes(extent, 8), 0);
    }

    #[test]
    fn test_linear_dispatch() {
        assert_eq!(dispatch_linear(Extent::new(17, 9), WAVEFRONT_GROUP_SIZE), 3);
        assert_eq!(dispatch_linear(Extent::new(8, 8), WAVEFRONT_GROUP_SIZE), 1);
        assert_eq!(dispatch_linear(Extent::new(0, 8), WAVEFRONT_GROUP_SIZE), 0);
    }

    #[test]
    fn test_fold_groups() {
        assert_eq!(fold_groups(3, 65535), (3, 1));
        // 4K frame: 8_294_400 pixels / 64 lanes.
        let groups = dispatch_linear(Extent::new(3840, 2160), WAVEFRONT_GROUP_SIZE);
        let (x, y) = fold_groups(groups, 65535);
        assert_eq!(x, 65535);
        assert!(x as u64 * y as u64 >= groups as u64);
        assert_eq!(y, 2);
    }
}
