//! Device-backed engine tests.
//!
//! Every test acquires a real adapter and skips (passing vacuously) when the
//! machine has none, so the suite stays green on headless CI runners.

use lamina_engine::compose::{
    ComposeCtx, LayerCompositor, LayerSpec, MAT4_IDENTITY, Mat4, ViewLayout,
};
use lamina_engine::device::{Gpu, GpuInit, read_target_rgba, read_texture_rgba};
use lamina_engine::error::LaminaError;
use lamina_engine::target::{RenderTarget, RenderTargetStore, SharedAttachments, TargetConfig};

fn gpu() -> Option<Gpu> {
    match pollster::block_on(Gpu::new(GpuInit::default())) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping: no usable GPU adapter ({err:#})");
            None
        }
    }
}

/// Projection that maps the unit plane quad onto the full viewport.
const FULLSCREEN: Mat4 = [
    [2.0, 0.0, 0.0, 0.0],
    [0.0, 2.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Clears the resolved color + depth attachments of `target`.
fn clear_resolved(gpu: &Gpu, target: &RenderTarget, color: wgpu::Color) {
    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color().expect("live target").attach_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth_stencil().expect("live target").attach_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
    gpu.queue().submit(Some(encoder.finish()));
}

/// Clears the multisampled attachments of `target` (simulating upstream 3D
/// content) without resolving them.
fn clear_multisampled(gpu: &Gpu, target: &RenderTarget, color: wgpu::Color, depth: f32) {
    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test ms clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.ms_color().expect("live target").attach_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.ms_depth_stencil().expect("live target").attach_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(depth),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
    gpu.queue().submit(Some(encoder.finish()));
}

/// Uploads a solid-color RGBA bitmap.
fn solid_texture(gpu: &Gpu, width: u32, height: u32, rgba: [u8; 4]) -> wgpu::Texture {
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("test bitmap"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let data: Vec<u8> = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    texture
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

// ── render target lifecycle ───────────────────────────────────────────────

#[test]
fn create_then_destroy_is_idempotent() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());

    let mut target = store
        .create(64, 64, SharedAttachments::default())
        .expect("create 64x64 target");
    assert_eq!((target.width(), target.height()), (64, 64));
    assert!(!target.is_destroyed());
    assert!(target.color().is_some_and(|a| a.is_owned()));

    store.destroy(&mut target);
    assert!(target.is_destroyed());
    assert!(target.color().is_none());

    // Second destroy is a no-op, not an error.
    store.destroy(&mut target);
    assert!(target.is_destroyed());
}

#[test]
fn zero_size_create_is_rejected_before_allocation() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());

    assert!(matches!(
        store.create(0, 64, SharedAttachments::default()),
        Err(LaminaError::InvalidArgument(_))
    ));
    assert!(matches!(
        store.create(64, 0, SharedAttachments::default()),
        Err(LaminaError::InvalidArgument(_))
    ));
}

#[test]
fn oversized_create_reports_resource_exhausted() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let too_big = gpu.limits().max_texture_dimension_2d + 1;

    assert!(matches!(
        store.create(too_big, 64, SharedAttachments::default()),
        Err(LaminaError::ResourceExhausted(_))
    ));
}

#[test]
fn shared_color_attachment_survives_destroy() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());

    let shared = solid_texture(&gpu, 8, 8, [10, 20, 30, 255]);
    let mut target = store
        .create(
            8,
            8,
            SharedAttachments {
                color: Some(shared.clone()),
                ..Default::default()
            },
        )
        .expect("create target over shared color");
    assert!(target.color().is_some_and(|a| a.is_shared()));
    assert!(target.depth_stencil().is_some_and(|a| a.is_owned()));

    store.destroy(&mut target);

    // The shared texture still belongs to us and must remain fully usable.
    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &shared,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[200u8; 8 * 8 * 4],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(32),
            rows_per_image: Some(8),
        },
        wgpu::Extent3d {
            width: 8,
            height: 8,
            depth_or_array_layers: 1,
        },
    );
    let pixels = read_texture_rgba(gpu.device(), gpu.queue(), &shared).expect("shared readback");
    assert_eq!(pixel(&pixels, 8, 4, 4), [200, 200, 200, 200]);
}

#[test]
fn resize_to_same_size_preserves_attachments() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());

    let mut target = store
        .create(32, 32, SharedAttachments::default())
        .expect("create 32x32 target");
    clear_resolved(
        &gpu,
        &target,
        wgpu::Color {
            r: 1.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        },
    );

    store.resize(&mut target, 32, 32).expect("same-size resize");
    assert_eq!((target.width(), target.height()), (32, 32));

    // A short-circuited resize must not have replaced the color attachment,
    // so the marker content is still there.
    let pixels = read_target_rgba(gpu.device(), gpu.queue(), &target).expect("readback");
    assert_eq!(pixel(&pixels, 32, 16, 16), [255, 0, 0, 255]);

    store.destroy(&mut target);
}

#[test]
fn resize_reallocates_owned_attachments_in_place() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());

    let mut target = store
        .create(32, 32, SharedAttachments::default())
        .expect("create 32x32 target");
    store.resize(&mut target, 128, 64).expect("grow target");

    assert_eq!((target.width(), target.height()), (128, 64));
    assert!(!target.is_destroyed());
    let color = target.color().expect("live target");
    assert_eq!(
        (color.texture().width(), color.texture().height()),
        (128, 64)
    );

    store.destroy(&mut target);
}

#[test]
fn operations_on_destroyed_target_report_use_after_destroy() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut target = store
        .create(16, 16, SharedAttachments::default())
        .expect("create target");
    store.destroy(&mut target);

    assert!(matches!(
        store.resize(&mut target, 32, 32),
        Err(LaminaError::UseAfterDestroy)
    ));

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let result = compositor.compose(
        &ComposeCtx::new(gpu.device(), gpu.queue()),
        &mut encoder,
        &target,
        &[],
        ViewLayout::Mono,
    );
    assert!(matches!(result, Err(LaminaError::UseAfterDestroy)));
}

// ── compositing ───────────────────────────────────────────────────────────

#[test]
fn compose_with_empty_list_leaves_target_untouched() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut target = store
        .create(16, 16, SharedAttachments::default())
        .expect("create target");
    clear_resolved(
        &gpu,
        &target,
        wgpu::Color {
            r: 0.0,
            g: 0.0,
            b: 1.0,
            a: 1.0,
        },
    );

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    compositor
        .compose(
            &ComposeCtx::new(gpu.device(), gpu.queue()),
            &mut encoder,
            &target,
            &[LayerSpec::none()],
            ViewLayout::Mono,
        )
        .expect("empty compose");
    gpu.queue().submit(Some(encoder.finish()));

    let pixels = read_target_rgba(gpu.device(), gpu.queue(), &target).expect("readback");
    for y in [0, 8, 15] {
        for x in [0, 8, 15] {
            assert_eq!(pixel(&pixels, 16, x, y), [0, 0, 255, 255]);
        }
    }

    store.destroy(&mut target);
}

#[test]
fn stereo_layer_resolves_marker_color_into_the_output() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut output = store
        .create(16, 16, SharedAttachments::default())
        .expect("create output");
    clear_resolved(&gpu, &output, wgpu::Color::BLACK);

    // Upstream 3D content: a multisampled scene cleared to the marker color.
    let mut scene = store
        .create(16, 16, SharedAttachments::default())
        .expect("create scene target");
    clear_multisampled(
        &gpu,
        &scene,
        wgpu::Color {
            r: 0.0,
            g: 1.0,
            b: 0.0,
            a: 1.0,
        },
        0.5,
    );

    let layer = LayerSpec::stereo_3d(
        16,
        16,
        scene.ms_color().expect("live scene").texture(),
        scene.ms_depth_stencil().expect("live scene").texture(),
        scene.color().expect("live scene").texture(),
        scene.depth_stencil().expect("live scene").texture(),
    );

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    compositor
        .compose(
            &ComposeCtx::new(gpu.device(), gpu.queue()),
            &mut encoder,
            &output,
            &[layer],
            ViewLayout::Mono,
        )
        .expect("stereo compose");
    gpu.queue().submit(Some(encoder.finish()));

    // The multisampled marker must have been resolved into the layer's own
    // resolved attachment...
    let resolved =
        read_texture_rgba(gpu.device(), gpu.queue(), scene.color().expect("live").texture())
            .expect("resolved readback");
    assert_eq!(pixel(&resolved, 16, 8, 8), [0, 255, 0, 255]);

    // ...and presented into the output.
    let pixels = read_target_rgba(gpu.device(), gpu.queue(), &output).expect("readback");
    assert_eq!(pixel(&pixels, 16, 8, 8), [0, 255, 0, 255]);
    assert_eq!(pixel(&pixels, 16, 1, 1), [0, 255, 0, 255]);

    store.destroy(&mut scene);
    store.destroy(&mut output);
}

#[test]
fn later_overlay_occludes_earlier_one() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut target = store
        .create(16, 16, SharedAttachments::default())
        .expect("create target");
    clear_resolved(&gpu, &target, wgpu::Color::BLACK);

    let below = solid_texture(&gpu, 4, 4, [255, 0, 0, 255]);
    let above = solid_texture(&gpu, 4, 4, [0, 0, 255, 255]);
    let layers = [
        LayerSpec::overlay_2d(4, 4, &below, MAT4_IDENTITY, FULLSCREEN),
        LayerSpec::raw_canvas(4, 4, &above, MAT4_IDENTITY, FULLSCREEN),
    ];
    // Monoscopic constructors mirror the one transform pair into both eyes.
    assert_eq!(layers[0].model_view[0], layers[0].model_view[1]);
    assert_eq!(layers[0].projection[0], layers[0].projection[1]);

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    compositor
        .compose(
            &ComposeCtx::new(gpu.device(), gpu.queue()),
            &mut encoder,
            &target,
            &layers,
            ViewLayout::Mono,
        )
        .expect("overlay compose");
    gpu.queue().submit(Some(encoder.finish()));

    // List order is paint order: the second (blue) layer wins everywhere the
    // two fullscreen quads overlap.
    let pixels = read_target_rgba(gpu.device(), gpu.queue(), &target).expect("readback");
    assert_eq!(pixel(&pixels, 16, 8, 8), [0, 0, 255, 255]);
    assert_eq!(pixel(&pixels, 16, 2, 13), [0, 0, 255, 255]);

    store.destroy(&mut target);
}

#[test]
fn side_by_side_layout_draws_an_overlay_into_both_halves() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut target = store
        .create(32, 16, SharedAttachments::default())
        .expect("create stereo target");
    clear_resolved(&gpu, &target, wgpu::Color::BLACK);

    let bitmap = solid_texture(&gpu, 4, 4, [255, 255, 0, 255]);
    let layers = [LayerSpec::overlay_2d(4, 4, &bitmap, MAT4_IDENTITY, FULLSCREEN)];

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    compositor
        .compose(
            &ComposeCtx::new(gpu.device(), gpu.queue()),
            &mut encoder,
            &target,
            &layers,
            ViewLayout::SideBySide,
        )
        .expect("stereo overlay compose");
    gpu.queue().submit(Some(encoder.finish()));

    // The fullscreen quad fills each eye's viewport, so both halves carry
    // the bitmap.
    let pixels = read_target_rgba(gpu.device(), gpu.queue(), &target).expect("readback");
    assert_eq!(pixel(&pixels, 32, 8, 8), [255, 255, 0, 255]);
    assert_eq!(pixel(&pixels, 32, 24, 8), [255, 255, 0, 255]);

    store.destroy(&mut target);
}

#[test]
fn missing_required_attachment_is_invalid_argument() {
    let Some(gpu) = gpu() else { return };
    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut target = store
        .create(16, 16, SharedAttachments::default())
        .expect("create target");

    // A drawable flat layer with no color bitmap is a caller error.
    let mut layer = LayerSpec::none();
    layer.layer_type = lamina_engine::compose::LayerType::Overlay2D;
    layer.width = 4;
    layer.height = 4;

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    let result = compositor.compose(
        &ComposeCtx::new(gpu.device(), gpu.queue()),
        &mut encoder,
        &target,
        &[layer],
        ViewLayout::Mono,
    );
    assert!(matches!(result, Err(LaminaError::InvalidArgument(_))));

    store.destroy(&mut target);
}
