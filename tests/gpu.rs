//! Headless GPU tests. They need a Vulkan, Metal or DX12 adapter with push
//! constants, so they are opt-in: `cargo test --test gpu -- --ignored`.

use std::sync::Arc;

use dual_tracer::render::Extent;
use dual_tracer::{
    BackendKind, DebugMode, GpuContext, RenderSettings, Renderer, Scene, ShaderComposer,
};

fn gpu() -> Arc<GpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    Arc::new(GpuContext::new().unwrap_or_else(|e| panic!("no usable adapter: {e}")))
}

fn settings() -> RenderSettings {
    RenderSettings {
        spp: 1,
        max_depth: 3,
        ..Default::default()
    }
}

fn renderer(gpu: &Arc<GpuContext>, extent: Extent, backend: BackendKind) -> Renderer {
    Renderer::new(
        gpu.clone(),
        ShaderComposer::embedded(),
        &Scene::demo(),
        extent,
        settings(),
        backend,
    )
    .unwrap()
}

#[test]
#[ignore = "needs a GPU adapter"]
fn backends_produce_matching_gbuffers() {
    let gpu = gpu();
    let extent = Extent::new(17, 9);

    let mut gbuffers = Vec::new();
    for kind in BackendKind::ALL {
        let mut r = renderer(&gpu, extent, kind);
        let state = r.render_frame().unwrap().unwrap();
        assert_eq!(state.frame, 0);
        gbuffers.push(r.read_gbuffer().unwrap());
    }

    let (a, b) = (&gbuffers[0], &gbuffers[1]);
    assert_eq!(a.len(), extent.pixel_count() as usize);
    assert_eq!(a.len(), b.len());
    assert!(a.iter().any(|g| !g.is_miss()), "demo camera sees geometry");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert_eq!(x.mat_index, y.mat_index, "pixel {i}");
        assert!(x.approx_eq(y, 1.0e-3), "pixel {i}: {x:?} vs {y:?}");
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn switching_backend_keeps_accumulating() {
    let gpu = gpu();
    let mut r = renderer(&gpu, Extent::new(16, 16), BackendKind::Pipeline);
    r.render_frame().unwrap();
    r.render_frame().unwrap();
    r.select_backend(BackendKind::Query).unwrap();
    assert_eq!(r.active_backend(), BackendKind::Query);
    let state = r.render_frame().unwrap().unwrap();
    assert_eq!(state.frame, 2);
    assert_eq!(r.frames_rendered(), 3);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn resize_round_trip_reallocates_once() {
    let gpu = gpu();
    for kind in BackendKind::ALL {
        let mut r = renderer(&gpu, Extent::new(32, 32), kind);
        r.render_frame().unwrap();

        r.resize(Extent::new(64, 48));
        r.render_frame().unwrap();
        r.resize(Extent::new(32, 32));
        let state = r.render_frame().unwrap().unwrap();
        assert_eq!((state.width, state.height), (32, 32));

        let (capacity, reallocations) = r.gbuffer_capacity().unwrap();
        assert!(capacity >= 64 * 48, "{kind}");
        assert_eq!(reallocations, 1, "{kind}");
        assert_eq!(r.read_gbuffer().unwrap().len(), 32 * 32);
        assert_eq!(r.read_output().unwrap().len(), 32 * 32 * 4);
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn empty_viewport_skips_frames() {
    let gpu = gpu();
    let mut r = renderer(&gpu, Extent::new(8, 8), BackendKind::Query);
    r.render_frame().unwrap();
    r.resize(Extent::new(0, 8));
    assert!(r.render_frame().unwrap().is_none());
    assert_eq!(r.frames_rendered(), 1);

    r.resize(Extent::new(8, 8));
    let state = r.render_frame().unwrap().unwrap();
    assert_eq!(state.frame, 0);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn static_debug_mode_is_deterministic() {
    let gpu = gpu();
    for kind in BackendKind::ALL {
        let mut r = renderer(&gpu, Extent::new(24, 16), kind);
        assert!(r.update_settings(|s| s.debug_mode = DebugMode::Normal));
        let first = r.render_frame().unwrap().unwrap();
        let a = r.read_output().unwrap();
        let second = r.render_frame().unwrap().unwrap();
        let b = r.read_output().unwrap();
        assert_eq!((first.frame, second.frame), (0, 0));
        assert_eq!(a, b, "{kind}");
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn accumulation_stays_finite() {
    let gpu = gpu();
    let mut r = renderer(&gpu, Extent::new(16, 16), BackendKind::Pipeline);
    for _ in 0..4 {
        r.render_frame().unwrap();
    }
    let acc = r.read_accumulation().unwrap();
    assert_eq!(acc.len(), 16 * 16);
    assert!(acc.iter().flatten().all(|v| v.is_finite() && *v >= 0.0));
    assert!(acc.iter().any(|p| p[0] + p[1] + p[2] > 0.0));
}
