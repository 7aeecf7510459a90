//! Headless embedding example.
//!
//! Plays the role of the frame pump and upstream renderers: creates render
//! targets, fills a multisampled "scene" layer and two flat layers with
//! content, composes them side-by-side, and writes the result to
//! `lamina-frame.png`.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use anyhow::{Context, Result};
use lamina_engine::bridge;
use lamina_engine::compose::{ComposeCtx, LayerCompositor, LayerSpec, Mat4, ViewLayout};
use lamina_engine::device::{Gpu, GpuInit, read_target_rgba};
use lamina_engine::logging::{LoggingConfig, init_logging};
use lamina_engine::target::{RenderTarget, RenderTargetStore, SharedAttachments, TargetConfig};

const FRAME_WIDTH: u32 = 1024;
const FRAME_HEIGHT: u32 = 512;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let gpu = pollster::block_on(Gpu::new(GpuInit::default()))?;
    log::info!("compositing on {}", gpu.adapter_info().name);

    // A real embedding would register its native frame pump here so other
    // subsystems can find it; a frame counter stands in for one.
    let frame_counter = Arc::new(AtomicU64::new(0));
    bridge::set_loop_handle(frame_counter.clone());

    let store = RenderTargetStore::new(gpu.device(), TargetConfig::default());
    let mut compositor = LayerCompositor::new(store.config());

    let mut frame = store
        .create(FRAME_WIDTH, FRAME_HEIGHT, SharedAttachments::default())
        .context("failed to create the output render target")?;

    // Upstream content: a multisampled 3D scene and two flat bitmaps.
    let mut scene = store
        .create(FRAME_WIDTH, FRAME_HEIGHT, SharedAttachments::default())
        .context("failed to create the scene render target")?;
    clear_scene(&gpu, &scene);
    let hud = checkerboard(&gpu, 128, 128, [255, 255, 255, 255], [255, 64, 64, 255]);
    let badge = gradient(&gpu, 64, 64);

    let layers = [
        LayerSpec::stereo_3d(
            FRAME_WIDTH,
            FRAME_HEIGHT,
            scene.ms_color().context("scene destroyed")?.texture(),
            scene.ms_depth_stencil().context("scene destroyed")?.texture(),
            scene.color().context("scene destroyed")?.texture(),
            scene.depth_stencil().context("scene destroyed")?.texture(),
        ),
        LayerSpec::overlay_2d(128, 128, &hud, translate(-0.4, 0.2), scale(0.8, 1.2)),
        LayerSpec::raw_canvas(64, 64, &badge, translate(0.5, -0.5), scale(0.6, 0.6)),
    ];

    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lamina demo frame encoder"),
        });
    compositor
        .compose(
            &ComposeCtx::new(gpu.device(), gpu.queue()),
            &mut encoder,
            &frame,
            &layers,
            ViewLayout::SideBySide,
        )
        .context("compositing failed")?;
    gpu.queue().submit(Some(encoder.finish()));
    frame_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

    let pixels = read_target_rgba(gpu.device(), gpu.queue(), &frame)?;
    let png = image::RgbaImage::from_raw(FRAME_WIDTH, FRAME_HEIGHT, pixels)
        .context("frame readback has unexpected length")?;
    png.save("lamina-frame.png")
        .context("failed to write lamina-frame.png")?;
    log::info!("wrote lamina-frame.png ({FRAME_WIDTH}x{FRAME_HEIGHT})");

    store.destroy(&mut scene);
    store.destroy(&mut frame);
    bridge::clear_loop_handle();
    Ok(())
}

/// Stands in for the upstream 3D renderer: clears the scene's multisampled
/// attachments to a sky gradient-ish blue. The compositor resolves them.
fn clear_scene(gpu: &Gpu, scene: &RenderTarget) {
    let mut encoder = gpu
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lamina demo scene encoder"),
        });
    {
        let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lamina demo scene clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: scene.ms_color().expect("scene is live").attach_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.25,
                        g: 0.55,
                        b: 0.95,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: scene
                    .ms_depth_stencil()
                    .expect("scene is live")
                    .attach_view(),
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

fn upload_rgba(gpu: &Gpu, width: u32, height: u32, data: &[u8]) -> wgpu::Texture {
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("lamina demo bitmap"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
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

fn checkerboard(gpu: &Gpu, width: u32, height: u32, a: [u8; 4], b: [u8; 4]) -> wgpu::Texture {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let cell = ((x / 16) + (y / 16)) % 2;
            data.extend_from_slice(if cell == 0 { &a } else { &b });
        }
    }
    upload_rgba(gpu, width, height, &data)
}

fn gradient(gpu: &Gpu, width: u32, height: u32) -> wgpu::Texture {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            data.extend_from_slice(&[r, g, 160, 255]);
        }
    }
    upload_rgba(gpu, width, height, &data)
}

fn translate(x: f32, y: f32) -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x, y, 0.0, 1.0],
    ]
}

fn scale(x: f32, y: f32) -> Mat4 {
    [
        [x, 0.0, 0.0, 0.0],
        [0.0, y, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}
