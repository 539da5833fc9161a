// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::dispatch::Extent;
use super::frame_state::{DebugMode, FrameState, TransportModel};
use crate::constants::{
    DEFAULT_ENVIRONMENT_PROB, DEFAULT_FIREFLY_CLAMP, DEFAULT_HDR_MULTIPLIER, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_HEATMAP, DEFAULT_MIN_HEATMAP, DEFAULT_SPP, MAX_DEPTH_LIMIT, MAX_SPP,
};

/// User-facing render settings folded into every `FrameState`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub max_depth: i32,
    pub spp: i32,
    pub firefly_clamp: f32,
    pub hdr_multiplier: f32,
    pub debug_mode: DebugMode,
    pub transport: TransportModel,
    pub environment_prob: f32,
    pub min_heatmap: i32,
    pub max_heatmap: i32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            spp: DEFAULT_SPP,
            firefly_clamp: DEFAULT_FIREFLY_CLAMP,
            hdr_multiplier: DEFAULT_HDR_MULTIPLIER,
            debug_mode: DebugMode::None,
            transport: TransportModel::Disney,
            environment_prob: DEFAULT_ENVIRONMENT_PROB,
            min_heatmap: DEFAULT_MIN_HEATMAP,
            max_heatmap: DEFAULT_MAX_HEATMAP,
        }
    }
}

impl RenderSettings {
    /// Clamp every field into the range the kernels accept.
    pub fn sanitized(mut self) -> Self {
        self.max_depth = self.max_depth.clamp(1, MAX_DEPTH_LIMIT);
        self.spp = self.spp.clamp(1, MAX_SPP);
        if self.firefly_clamp.is_nan() || self.firefly_clamp <= 0.0 {
            self.firefly_clamp = DEFAULT_FIREFLY_CLAMP;
        }
        if !self.hdr_multiplier.is_finite() || self.hdr_multiplier < 0.0 {
            self.hdr_multiplier = DEFAULT_HDR_MULTIPLIER;
        }
        self.environment_prob = if self.environment_prob.is_finite() {
            self.environment_prob.clamp(0.0, 1.0)
        } else {
            DEFAULT_ENVIRONMENT_PROB
        };
        self.max_heatmap = self.max_heatmap.max(self.min_heatmap.saturating_add(1));
        self
    }

    /// Whether switching from `self` to `other` invalidates accumulated samples.
    /// Display-only fields (HDR multiplier, heatmap bounds) never do.
    pub fn invalidates(&self, other: &Self) -> bool {
        self.max_depth != other.max_depth
            || self.spp != other.spp
            || self.firefly_clamp != other.firefly_clamp
            || self.debug_mode != other.debug_mode
            || self.transport != other.transport
            || self.environment_prob != other.environment_prob
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Each frame blends into the running mean with weight `1/(frame+1)`.
    Accumulating,
    /// A reset trigger fired; applied at the next frame boundary.
    ResetPending,
    /// Non-accumulating debug view: every frame is frame 0.
    Static,
}

/// Sole owner of the frame index and render settings.
pub struct ProgressiveController {
    settings: RenderSettings,
    phase: Phase,
    accumulated: i32,
    viewport: Extent,
    resize_pending: bool,
    resets: u64,
    start: Instant,
}

impl ProgressiveController {
    pub fn new(viewport: Extent, settings: RenderSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            phase: Phase::ResetPending,
            accumulated: 0,
            viewport,
            resize_pending: false,
            resets: 0,
            start: Instant::now(),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn viewport(&self) -> Extent {
        self.viewport
    }

    /// Frames blended into the output since the last reset.
    pub fn accumulated_frames(&self) -> i32 {
        self.accumulated
    }

    /// Resets applied so far (coalesced triggers count once).
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    /// Edit settings in place. Returns true when the edit requested a reset.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut RenderSettings)) -> bool {
        let mut next = self.settings;
        edit(&mut next);
        let next = next.sanitized();
        let reset = self.settings.invalidates(&next);
        self.settings = next;
        if reset {
            self.invalidate();
        }
        reset
    }

    /// Camera or scene changed.
    pub fn invalidate(&mut self) {
        if self.phase != Phase::ResetPending {
            log::debug!("Accumulation reset requested after {} frames", self.accumulated);
        }
        self.phase = Phase::ResetPending;
    }

    /// Returns true if the size actually changed.
    pub fn set_viewport(&mut self, viewport: Extent) -> bool {
        if viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.resize_pending = true;
        self.invalidate();
        true
    }

    /// Whether the viewport changed since the last completed resize.
    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Clear the pending resize once every viewport-sized resource is rebuilt.
    pub fn complete_resize(&mut self) {
        self.resize_pending = false;
    }

    /// Produce the state for the next frame, applying a pending reset.
    /// `None` when the viewport is empty and the frame must be skipped.
    pub fn next_frame(&mut self) -> Option<FrameState> {
        if self.viewport.is_empty() {
            return None;
        }

        if self.phase == Phase::ResetPending {
            self.accumulated = 0;
            self.resets += 1;
            self.phase = if self.settings.debug_mode.is_static() {
                Phase::Static
            } else {
                Phase::Accumulating
            };
        }

        let frame = match self.phase {
            Phase::Static => 0,
            _ => self.accumulated,
        };
        if self.phase == Phase::Accumulating {
            self.accumulated = self.accumulated.saturating_add(1);
        }

        let s = &self.settings;
        Some(FrameState {
            frame,
            max_depth: s.max_depth,
            spp: s.spp,
            firefly_clamp: s.firefly_clamp,
            hdr_multiplier: s.hdr_multiplier,
            debug_mode: s.debug_mode as i32,
            pbr_mode: s.transport as i32,
            environment_prob: s.environment_prob,
            width: self.viewport.width as i32,
            height: self.viewport.height as i32,
            min_heatmap: s.min_heatmap,
            max_heatmap: s.max_heatmap,
            time: self.start.elapsed().as_millis() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ProgressiveController {
        ProgressiveController::new(Extent::new(64, 32), RenderSettings::default())
    }

    fn frames(c: &mut ProgressiveController, n: usize) -> Vec<i32> {
        (0..n).map(|_| c.next_frame().unwrap().frame).collect()
    }

    #[test]
    fn test_accumulates_from_zero() {
        let mut c = controller();
        assert_eq!(c.phase(), Phase::ResetPending);
        assert_eq!(frames(&mut c, 4), vec![0, 1, 2, 3]);
        assert_eq!(c.phase(), Phase::Accumulating);
        assert_eq!(c.accumulated_frames(), 4);
    }

    #[test]
    fn test_transport_change_resets() {
        let mut c = controller();
        frames(&mut c, 5);
        assert!(c.update_settings(|s| s.transport = TransportModel::Gltf));
        let next = c.next_frame().unwrap();
        assert_eq!(next.frame, 0);
        assert_eq!(next.pbr_mode, 1);
    }

    #[test]
    fn test_hdr_multiplier_does_not_reset() {
        let mut c = controller();
        frames(&mut c, 5);
        assert!(!c.update_settings(|s| {
            s.hdr_multiplier = 3.0;
            s.max_heatmap = 200;
        }));
        let next = c.next_frame().unwrap();
        assert_eq!(next.frame, 5);
        assert_eq!(next.hdr_multiplier, 3.0);
    }

    #[test]
    fn test_viewport_change_resets_and_requests_resize() {
        let mut c = controller();
        frames(&mut c, 3);
        assert!(c.set_viewport(Extent::new(128, 64)));
        assert!(c.resize_pending());
        c.complete_resize();
        assert!(!c.resize_pending());
        let next = c.next_frame().unwrap();
        assert_eq!((next.frame, next.width, next.height), (0, 128, 64));

        assert!(!c.set_viewport(Extent::new(128, 64)));
        assert!(!c.resize_pending());
    }

    #[test]
    fn test_resize_stays_pending_until_completed() {
        let mut c = controller();
        frames(&mut c, 2);
        c.set_viewport(Extent::new(96, 48));

        // A frame whose resize failed leaves the request in place.
        c.next_frame().unwrap();
        assert!(c.resize_pending());
        c.invalidate();
        assert!(c.resize_pending());
        assert_eq!(c.next_frame().unwrap().frame, 0);

        c.complete_resize();
        assert!(!c.resize_pending());
        assert_eq!(c.next_frame().unwrap().frame, 1);
    }

    #[test]
    fn test_heatmap_bounds_saturate() {
        let settings = RenderSettings {
            min_heatmap: i32::MAX,
            max_heatmap: 0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.min_heatmap, i32::MAX);
        assert_eq!(settings.max_heatmap, i32::MAX);
    }

    #[test]
    fn test_simultaneous_triggers_coalesce() {
        let mut c = controller();
        frames(&mut c, 2);
        let before = c.reset_count();
        c.invalidate();
        c.update_settings(|s| s.max_depth = 8);
        c.set_viewport(Extent::new(10, 10));
        assert_eq!(frames(&mut c, 2), vec![0, 1]);
        assert_eq!(c.reset_count(), before + 1);
    }

    #[test]
    fn test_static_debug_mode() {
        let mut c = controller();
        frames(&mut c, 3);
        c.update_settings(|s| s.debug_mode = DebugMode::Normal);
        assert_eq!(frames(&mut c, 3), vec![0, 0, 0]);
        assert_eq!(c.phase(), Phase::Static);

        c.update_settings(|s| s.debug_mode = DebugMode::None);
        assert_eq!(frames(&mut c, 2), vec![0, 1]);
        assert_eq!(c.phase(), Phase::Accumulating);
    }

    #[test]
    fn test_empty_viewport_skips_frame() {
        let mut c = controller();
        c.set_viewport(Extent::new(0, 32));
        assert!(c.next_frame().is_none());
        // The pending reset survives the skipped frame.
        assert_eq!(c.phase(), Phase::ResetPending);
    }

    #[test]
    fn test_sanitized_ranges() {
        let s = RenderSettings {
            max_depth: 0,
            spp: 1000,
            environment_prob: 1.5,
            firefly_clamp: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.max_depth, 1);
        assert_eq!(s.spp, MAX_SPP);
        assert_eq!(s.environment_prob, 1.0);
        assert_eq!(s.firefly_clamp, DEFAULT_FIREFLY_CLAMP);
    }
}
