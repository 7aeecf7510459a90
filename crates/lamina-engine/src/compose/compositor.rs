use crate::error::LaminaError;
use crate::target::{RenderTarget, TargetConfig};

use super::layer::{LayerSpec, LayerType, ViewLayout};
use super::pipelines::{
    ComposeUniform, PipelineCache, PipelineKey, PlaneUniform, UNIFORM_SLOT_STRIDE, eye_uv_window,
    uniform_binding_size,
};

/// Compositor-facing context (device/queue). Intentionally small and stable.
pub struct ComposeCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl<'a> ComposeCtx<'a> {
    #[inline]
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

/// One prepared draw: which program runs and the resources it binds.
enum PreparedDraw {
    Compose(wgpu::BindGroup),
    Plane(wgpu::BindGroup),
}

/// Merges ordered layer lists into render targets.
///
/// One compositor serves one graphics context and one target config; it owns
/// the cached programs and a growable per-draw uniform arena. `compose`
/// modifies the target's attachments and nothing else; wgpu scopes all
/// draw/blend state to the encoded passes.
pub struct LayerCompositor {
    pipelines: PipelineCache,
    uniform_arena: Option<wgpu::Buffer>,
    uniform_capacity: usize,
    warned_shared_mismatch: bool,
}

impl LayerCompositor {
    /// Creates a compositor for targets produced with `config`.
    pub fn new(config: &TargetConfig) -> Self {
        Self {
            pipelines: PipelineCache::new(config.color_format, config.depth_stencil_format),
            uniform_arena: None,
            uniform_capacity: 0,
            warned_shared_mismatch: false,
        }
    }

    /// Draws `layers`, in list order, into `target`.
    ///
    /// Caller order is the compositing order: later layers paint over
    /// earlier ones with source-over blending, and no cross-layer depth test
    /// reorders them. `LayerType::None` entries and zero-sized layers are
    /// skipped without error; an empty effective list encodes no passes at
    /// all and leaves the target untouched.
    ///
    /// Every multisample resolve is encoded before any eye's draws, so a
    /// stereo layer's two presentations sample one coherent resolved image.
    pub fn compose(
        &mut self,
        ctx: &ComposeCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTarget,
        layers: &[LayerSpec<'_>],
        layout: ViewLayout,
    ) -> Result<(), LaminaError> {
        let Some(attachments) = target.attachments() else {
            return Err(LaminaError::UseAfterDestroy);
        };

        let mut drawable: Vec<&LayerSpec<'_>> = Vec::with_capacity(layers.len());
        for layer in layers {
            if !layer.is_drawable() {
                continue;
            }
            match layer.layer_type {
                LayerType::Stereo3D => {
                    if layer.ms_color.is_none()
                        || layer.ms_depth_stencil.is_none()
                        || layer.color.is_none()
                        || layer.depth_stencil.is_none()
                    {
                        return Err(LaminaError::InvalidArgument(
                            "a Stereo3D layer requires multisampled and resolved color and \
                             depth attachments"
                                .into(),
                        ));
                    }
                }
                LayerType::Overlay2D | LayerType::RawCanvas => {
                    if layer.color.is_none() {
                        return Err(LaminaError::InvalidArgument(
                            "a flat layer requires a color attachment".into(),
                        ));
                    }
                }
                LayerType::None => continue,
            }
            drawable.push(layer);
        }
        if drawable.is_empty() {
            return Ok(());
        }

        self.warn_shared_mismatch(target);

        // Build the programs this list needs before encoding anything, so a
        // fatal compile error aborts the frame cleanly.
        let needs_compose = drawable
            .iter()
            .any(|l| l.layer_type == LayerType::Stereo3D);
        let needs_plane = drawable
            .iter()
            .any(|l| matches!(l.layer_type, LayerType::Overlay2D | LayerType::RawCanvas));
        if needs_compose {
            self.pipelines.ensure(ctx.device, PipelineKey::Compose)?;
            self.pipelines.ensure(ctx.device, PipelineKey::DepthResolve)?;
        }
        if needs_plane {
            self.pipelines.ensure(ctx.device, PipelineKey::Plane)?;
        }

        for layer in &drawable {
            if layer.layer_type == LayerType::Stereo3D {
                self.encode_resolve(ctx, encoder, layer);
            }
        }

        let eyes = layout.eyes();
        let slot_count = drawable.len() * eyes.len();
        self.ensure_uniform_capacity(ctx.device, slot_count);
        let Some(arena) = self.uniform_arena.as_ref() else { return Ok(()) };

        // One uniform slot per (layer, eye) draw, written in a single upload;
        // bind groups reference their slot's range.
        let mut slots = vec![0u8; slot_count * UNIFORM_SLOT_STRIDE as usize];
        let mut draws: Vec<Vec<PreparedDraw>> = eyes.iter().map(|_| Vec::new()).collect();

        for (eye_index, eye) in eyes.iter().enumerate() {
            for (layer_index, layer) in drawable.iter().enumerate() {
                let offset = ((eye_index * drawable.len() + layer_index) as u64)
                    * UNIFORM_SLOT_STRIDE;
                let prepared = match layer.layer_type {
                    LayerType::Stereo3D => {
                        let (Some(color), Some(depth)) = (layer.color, layer.depth_stencil)
                        else {
                            continue; // validated above
                        };
                        let uniform = eye_uv_window(
                            *eye,
                            layout,
                            (layer.width, layer.height),
                            (color.width(), color.height()),
                        );
                        slots[offset as usize..offset as usize + size_of_val(&uniform)]
                            .copy_from_slice(bytemuck::bytes_of(&uniform));

                        let Some(pipe) = self.pipelines.compose() else { continue };
                        let color_view =
                            color.create_view(&wgpu::TextureViewDescriptor::default());
                        let depth_view = depth_sample_view(depth);
                        // The bind group keeps the views alive; wgpu resources
                        // are reference-counted.
                        let bind_group = pipe.bind(
                            ctx.device,
                            wgpu::BufferBinding {
                                buffer: arena,
                                offset,
                                size: Some(uniform_binding_size::<ComposeUniform>()),
                            },
                            &color_view,
                            &depth_view,
                        );
                        PreparedDraw::Compose(bind_group)
                    }
                    LayerType::Overlay2D | LayerType::RawCanvas => {
                        let Some(color) = layer.color else { continue };
                        let uniform = PlaneUniform {
                            model_view: layer.model_view[eye.index()],
                            projection: layer.projection[eye.index()],
                        };
                        slots[offset as usize..offset as usize + size_of_val(&uniform)]
                            .copy_from_slice(bytemuck::bytes_of(&uniform));

                        let Some(pipe) = self.pipelines.plane() else { continue };
                        let color_view =
                            color.create_view(&wgpu::TextureViewDescriptor::default());
                        let bind_group = pipe.bind(
                            ctx.device,
                            wgpu::BufferBinding {
                                buffer: arena,
                                offset,
                                size: Some(uniform_binding_size::<PlaneUniform>()),
                            },
                            &color_view,
                        );
                        PreparedDraw::Plane(bind_group)
                    }
                    LayerType::None => continue,
                };
                draws[eye_index].push(prepared);
            }
        }
        ctx.queue.write_buffer(arena, 0, &slots);

        let stencil_ops = attachments
            .depth_stencil
            .texture()
            .format()
            .has_stencil_aspect()
            .then_some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            });
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lamina compose pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachments.color.attach_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: attachments.depth_stencil.attach_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for (eye_index, eye) in eyes.iter().enumerate() {
            let (x, y, w, h) = layout.eye_viewport(*eye, target.width(), target.height());
            rpass.set_viewport(x, y, w, h, 0.0, 1.0);

            for draw in &draws[eye_index] {
                match draw {
                    PreparedDraw::Compose(bind_group) => {
                        let Some(pipe) = self.pipelines.compose() else { continue };
                        rpass.set_pipeline(&pipe.pipeline);
                        rpass.set_bind_group(0, bind_group, &[]);
                        rpass.set_vertex_buffer(0, pipe.quad_vbo.slice(..));
                        rpass.set_index_buffer(pipe.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
                        rpass.draw_indexed(0..6, 0, 0..1);
                    }
                    PreparedDraw::Plane(bind_group) => {
                        let Some(pipe) = self.pipelines.plane() else { continue };
                        rpass.set_pipeline(&pipe.pipeline);
                        rpass.set_bind_group(0, bind_group, &[]);
                        rpass.set_vertex_buffer(0, pipe.quad_vbo.slice(..));
                        rpass.set_index_buffer(pipe.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
                        rpass.draw_indexed(0..6, 0, 0..1);
                    }
                }
            }
        }

        Ok(())
    }

    /// Encodes the multisample resolve for one 3D layer: color rides on a
    /// resolve-target pass, depth goes through the dedicated fullscreen
    /// downsample.
    fn encode_resolve(
        &self,
        ctx: &ComposeCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        layer: &LayerSpec<'_>,
    ) {
        let (Some(ms_color), Some(ms_depth), Some(color), Some(depth)) = (
            layer.ms_color,
            layer.ms_depth_stencil,
            layer.color,
            layer.depth_stencil,
        ) else {
            return; // validated by compose
        };

        let ms_color_view = ms_color.create_view(&wgpu::TextureViewDescriptor::default());
        let resolved_color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        {
            // No draws: the resolve happens when the pass ends.
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lamina color resolve pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &ms_color_view,
                    resolve_target: Some(&resolved_color_view),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Discard,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        let Some(pipe) = self.pipelines.depth_resolve() else { return };
        let ms_depth_view = depth_sample_view(ms_depth);
        let bind_group = pipe.bind(ctx.device, &ms_depth_view);
        let depth_attach_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let stencil_ops = depth
            .format()
            .has_stencil_aspect()
            .then_some(wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lamina depth resolve pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_attach_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&pipe.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, pipe.quad_vbo.slice(..));
        rpass.set_index_buffer(pipe.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..6, 0, 0..1);
    }

    fn ensure_uniform_capacity(&mut self, device: &wgpu::Device, required_slots: usize) {
        if required_slots <= self.uniform_capacity && self.uniform_arena.is_some() {
            return;
        }

        let new_cap = required_slots.next_power_of_two().max(8);
        self.uniform_arena = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lamina compose uniform arena"),
            size: new_cap as u64 * UNIFORM_SLOT_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.uniform_capacity = new_cap;
    }

    /// A shared attachment whose owner has not kept up with a resize gives
    /// undefined output; that contract is documented, not defended, but the
    /// mismatch is visible here for free, so say it once.
    fn warn_shared_mismatch(&mut self, target: &RenderTarget) {
        if self.warned_shared_mismatch {
            return;
        }
        let Some(attachments) = target.attachments() else { return };
        for (name, attachment) in [
            ("color", &attachments.color),
            ("depth-stencil", &attachments.depth_stencil),
            ("ms color", &attachments.ms_color),
            ("ms depth-stencil", &attachments.ms_depth_stencil),
        ] {
            if !attachment.is_shared() {
                continue;
            }
            let texture = attachment.texture();
            if texture.width() != target.width() || texture.height() != target.height() {
                log::warn!(
                    "shared {name} attachment is {}x{} but the target is {}x{}; \
                     output is undefined until the owner resizes it",
                    texture.width(),
                    texture.height(),
                    target.width(),
                    target.height()
                );
                self.warned_shared_mismatch = true;
            }
        }
    }
}

/// Depth-aspect view for shader sampling; depth-stencil formats cannot bind
/// all aspects at once.
fn depth_sample_view(texture: &wgpu::Texture) -> wgpu::TextureView {
    if texture.format().has_depth_aspect() {
        texture.create_view(&wgpu::TextureViewDescriptor {
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        })
    } else {
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}
