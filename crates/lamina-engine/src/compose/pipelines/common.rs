//! Shared GPU types and utilities used by the compositing pipelines.

use bytemuck::{Pod, Zeroable};

use crate::compose::layer::{Eye, Mat4, ViewLayout};

// ── blend ─────────────────────────────────────────────────────────────────

/// Source-over compositing for premultiplied-alpha colors. Later draws
/// occlude earlier ones wherever they are opaque.
pub(crate) fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── quad geometry ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // pos
        1 => Float32x2  // uv
    ];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Fullscreen quad in NDC; v is flipped so texture row 0 lands at the top of
/// the viewport.
pub(crate) const SCREEN_QUAD: [QuadVertex; 4] = [
    QuadVertex { pos: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [-1.0, 1.0], uv: [0.0, 0.0] },
];

/// Unit quad centered at the origin in the XY plane; the layer's transforms
/// position and scale it.
pub(crate) const PLANE_QUAD: [QuadVertex; 4] = [
    QuadVertex { pos: [-0.5, -0.5], uv: [0.0, 1.0] },
    QuadVertex { pos: [0.5, -0.5], uv: [1.0, 1.0] },
    QuadVertex { pos: [0.5, 0.5], uv: [1.0, 0.0] },
    QuadVertex { pos: [-0.5, 0.5], uv: [0.0, 0.0] },
];

pub(crate) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

// ── per-draw uniforms ─────────────────────────────────────────────────────

/// UV window selecting one eye's visible region of a layer attachment.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct ComposeUniform {
    pub uv_offset: [f32; 2],
    pub uv_scale: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct PlaneUniform {
    pub model_view: Mat4,
    pub projection: Mat4,
}

/// Stride of one slot in the per-draw uniform arena. 256 satisfies
/// `min_uniform_buffer_offset_alignment` on every backend.
pub(crate) const UNIFORM_SLOT_STRIDE: u64 = 256;

/// The wgpu minimum binding size for a per-draw uniform type.
///
/// Both uniform structs are non-empty, so the size is always non-zero.
/// Centralising this avoids `.unwrap()` at each pipeline-creation site.
pub(crate) fn uniform_binding_size<T>() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<T>() as u64)
        .expect("per-draw uniform types are non-empty by construction")
}

/// Computes the UV window one eye samples from a layer attachment.
///
/// `visible` is the layer's declared size, `actual` the attachment texture's
/// extent; attachments larger than the visible region are corrected for
/// here. Side-by-side sources give each eye half of the visible width.
pub(crate) fn eye_uv_window(
    eye: Eye,
    layout: ViewLayout,
    visible: (u32, u32),
    actual: (u32, u32),
) -> ComposeUniform {
    let vis_x = visible.0 as f32 / actual.0.max(1) as f32;
    let vis_y = visible.1 as f32 / actual.1.max(1) as f32;
    match layout {
        ViewLayout::Mono => ComposeUniform {
            uv_offset: [0.0, 0.0],
            uv_scale: [vis_x, vis_y],
        },
        ViewLayout::SideBySide => ComposeUniform {
            uv_offset: [eye.index() as f32 * 0.5 * vis_x, 0.0],
            uv_scale: [0.5 * vis_x, vis_y],
        },
    }
}
