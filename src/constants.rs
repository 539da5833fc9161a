// Copyright (C) Pavlo Hrytsenko <pashagricenko@gmail.com>
// SPDX-License-Identifier: GPL-3.0-or-later

// GPU / compute
/// Tile edge of the ray-query kernel. Must match `@workgroup_size` in `query/pathtrace.wgsl`.
pub const QUERY_TILE_SIZE: u32 = 8;
/// Lanes per work-group of the wavefront stages (1D dispatch over pixels).
pub const WAVEFRONT_GROUP_SIZE: u32 = 64;

// Descriptor sets shared by both backends
pub const SET_ACCEL: u32 = 0;
pub const SET_OUTPUT: u32 = 1;
pub const SET_SCENE: u32 = 2;
pub const SET_ENV: u32 = 3;
pub const SET_BACKEND: u32 = 4;
/// Number of bind groups a backend pipeline layout uses.
pub const REQUIRED_BIND_GROUPS: u32 = 5;
/// Storage bindings of the widest kernel (wavefront: 3 accel, 1 output, 6 scene, 2 env, 3 backend).
pub const REQUIRED_STORAGE_BUFFERS: u32 = 15;
/// Size of the `FrameState` push-constant block.
pub const PUSH_CONSTANT_SIZE: u32 = 52;

// BVH construction
pub const BVH_NUM_BINS: usize = 12;
pub const BVH_LEAF_MAX_PRIMS: usize = 4;
/// Traversal stack depth in `common/traverse.wgsl`.
pub const BVH_MAX_DEPTH: usize = 64;

// AABB padding
pub const AABB_EPS: f32 = 0.0001;

// Camera defaults
pub const DEFAULT_FOV: f32 = 60.0;
pub const DEFAULT_CAMERA_POSITION: [f32; 3] = [0.0, 1.0, 5.0];
pub const CAMERA_NEAR: f32 = 0.01;
pub const CAMERA_FAR: f32 = 1000.0;

// Render settings defaults
pub const DEFAULT_MAX_DEPTH: i32 = 5;
pub const DEFAULT_SPP: i32 = 1;
pub const DEFAULT_FIREFLY_CLAMP: f32 = 10.0;
pub const DEFAULT_HDR_MULTIPLIER: f32 = 1.0;
pub const DEFAULT_ENVIRONMENT_PROB: f32 = 0.5;
pub const DEFAULT_MIN_HEATMAP: i32 = 0;
pub const DEFAULT_MAX_HEATMAP: i32 = 64;
pub const DEFAULT_SKY_COLOR: [f32; 3] = [0.5, 0.7, 1.0];
pub const MAX_SPP: i32 = 64;
pub const MAX_DEPTH_LIMIT: i32 = 32;

// Alias table construction
/// Residual probability mass tolerated on entries left over after pairing.
pub const ALIAS_RESIDUE_TOLERANCE: f32 = 1e-3;

// Output
/// Accumulation buffer: vec4<f32> = 16 bytes per pixel
pub const ACCUM_BYTES_PER_PIXEL: u64 = 16;
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// Window-less defaults for the CLI
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 360;
pub const DEFAULT_FRAMES: u32 = 64;
