/// Column-major 4x4 transform, the layout GPU uniforms expect.
pub type Mat4 = [[f32; 4]; 4];

pub const MAT4_IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// How a layer's content must be merged into the frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LayerType {
    /// Placeholder entry; preserves list indices without contributing
    /// geometry.
    None,
    /// Multisampled 3D content; resolved, then presented fullscreen with
    /// its depth.
    Stereo3D,
    /// A rendered 2D surface, drawn as a transformed textured plane.
    Overlay2D,
    /// A raw pixel canvas. Same draw path as `Overlay2D`; the distinction is
    /// upstream content semantics only.
    RawCanvas,
}

/// Output eye slots. Index 0 is the left/primary eye, 1 the right/secondary.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    pub fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Eye-to-viewport mapping for the output target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ViewLayout {
    /// One full-viewport pass using the primary eye's transforms.
    Mono,
    /// Eye 0 draws into the left half of the target, eye 1 into the right.
    /// Stereo sources are expected in the same side-by-side arrangement.
    SideBySide,
}

impl ViewLayout {
    pub(crate) fn eyes(self) -> &'static [Eye] {
        match self {
            Self::Mono => &[Eye::Left],
            Self::SideBySide => &Eye::BOTH,
        }
    }

    /// Viewport rectangle `(x, y, width, height)` for one eye of a target.
    pub(crate) fn eye_viewport(self, eye: Eye, width: u32, height: u32) -> (f32, f32, f32, f32) {
        match self {
            Self::Mono => (0.0, 0.0, width as f32, height as f32),
            Self::SideBySide => {
                let half = width as f32 * 0.5;
                (eye.index() as f32 * half, 0.0, half, height as f32)
            }
        }
    }
}

/// One renderable surface to be merged into the frame.
///
/// Built per frame by the upstream renderer that owns the layer's content
/// and consumed read-only by the compositor; nothing here is persisted
/// across frames. `width`/`height` describe the visible region, which may be
/// smaller than the attachment textures (partially-filled attachments still
/// sample correctly).
#[derive(Debug, Clone)]
pub struct LayerSpec<'a> {
    pub layer_type: LayerType,
    pub width: u32,
    pub height: u32,
    /// Multisampled color source (`Stereo3D` only).
    pub ms_color: Option<&'a wgpu::Texture>,
    /// Multisampled depth/stencil source (`Stereo3D` only).
    pub ms_depth_stencil: Option<&'a wgpu::Texture>,
    /// Resolved color; resolve destination for `Stereo3D`, the bitmap itself
    /// for `Overlay2D`/`RawCanvas`.
    pub color: Option<&'a wgpu::Texture>,
    /// Resolved depth/stencil; resolve destination for `Stereo3D`.
    pub depth_stencil: Option<&'a wgpu::Texture>,
    /// Per-eye model-view transforms; index 0 = left, 1 = right. Monoscopic
    /// layers carry the same matrix in both slots.
    pub model_view: [Mat4; 2],
    /// Per-eye projection transforms, same slot convention.
    pub projection: [Mat4; 2],
}

impl<'a> LayerSpec<'a> {
    /// Placeholder entry that composites nothing.
    pub fn none() -> Self {
        Self {
            layer_type: LayerType::None,
            width: 0,
            height: 0,
            ms_color: None,
            ms_depth_stencil: None,
            color: None,
            depth_stencil: None,
            model_view: [MAT4_IDENTITY; 2],
            projection: [MAT4_IDENTITY; 2],
        }
    }

    /// A multisampled 3D layer. All four attachments are required; the
    /// compositor resolves the multisampled pair into the resolved pair
    /// before presenting.
    pub fn stereo_3d(
        width: u32,
        height: u32,
        ms_color: &'a wgpu::Texture,
        ms_depth_stencil: &'a wgpu::Texture,
        color: &'a wgpu::Texture,
        depth_stencil: &'a wgpu::Texture,
    ) -> Self {
        Self {
            layer_type: LayerType::Stereo3D,
            width,
            height,
            ms_color: Some(ms_color),
            ms_depth_stencil: Some(ms_depth_stencil),
            color: Some(color),
            depth_stencil: Some(depth_stencil),
            model_view: [MAT4_IDENTITY; 2],
            projection: [MAT4_IDENTITY; 2],
        }
    }

    /// A flat rendered-2D surface drawn as a textured plane. The one
    /// transform pair is mirrored into both eye slots.
    pub fn overlay_2d(
        width: u32,
        height: u32,
        color: &'a wgpu::Texture,
        model_view: Mat4,
        projection: Mat4,
    ) -> Self {
        Self {
            layer_type: LayerType::Overlay2D,
            width,
            height,
            ms_color: None,
            ms_depth_stencil: None,
            color: Some(color),
            depth_stencil: None,
            model_view: [model_view; 2],
            projection: [projection; 2],
        }
    }

    /// A raw pixel canvas. Identical draw path to [`LayerSpec::overlay_2d`].
    pub fn raw_canvas(
        width: u32,
        height: u32,
        color: &'a wgpu::Texture,
        model_view: Mat4,
        projection: Mat4,
    ) -> Self {
        Self {
            layer_type: LayerType::RawCanvas,
            ..Self::overlay_2d(width, height, color, model_view, projection)
        }
    }

    /// Replaces the mirrored transforms with independent per-eye pairs, for
    /// world-anchored planes that need real stereo separation.
    pub fn with_eye_transforms(mut self, model_view: [Mat4; 2], projection: [Mat4; 2]) -> Self {
        self.model_view = model_view;
        self.projection = projection;
        self
    }

    /// Whether the layer contributes geometry at all. Degenerate sizes are
    /// harmless and simply skipped.
    pub(crate) fn is_drawable(&self) -> bool {
        self.layer_type != LayerType::None && self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── constructors ──────────────────────────────────────────────────────

    #[test]
    fn none_layer_is_not_drawable() {
        assert!(!LayerSpec::none().is_drawable());
    }

    #[test]
    fn zero_size_layer_is_not_drawable() {
        let mut layer = LayerSpec::none();
        layer.layer_type = LayerType::Overlay2D;
        layer.width = 0;
        layer.height = 64;
        assert!(!layer.is_drawable());
        layer.width = 64;
        layer.height = 0;
        assert!(!layer.is_drawable());
    }

    #[test]
    fn eye_transform_override_replaces_both_slots() {
        let left = [[2.0; 4]; 4];
        let right = [[3.0; 4]; 4];
        let layer = LayerSpec::none().with_eye_transforms([left, right], [right, left]);
        assert_eq!(layer.model_view[Eye::Left.index()], left);
        assert_eq!(layer.model_view[Eye::Right.index()], right);
        assert_eq!(layer.projection[Eye::Left.index()], right);
        assert_eq!(layer.projection[Eye::Right.index()], left);
    }

    // ── view layout ───────────────────────────────────────────────────────

    #[test]
    fn mono_layout_uses_one_eye_full_viewport() {
        assert_eq!(ViewLayout::Mono.eyes(), &[Eye::Left]);
        assert_eq!(
            ViewLayout::Mono.eye_viewport(Eye::Left, 100, 50),
            (0.0, 0.0, 100.0, 50.0)
        );
    }

    #[test]
    fn side_by_side_layout_splits_the_target() {
        assert_eq!(ViewLayout::SideBySide.eyes(), &Eye::BOTH);
        assert_eq!(
            ViewLayout::SideBySide.eye_viewport(Eye::Left, 100, 50),
            (0.0, 0.0, 50.0, 50.0)
        );
        assert_eq!(
            ViewLayout::SideBySide.eye_viewport(Eye::Right, 100, 50),
            (50.0, 0.0, 50.0, 50.0)
        );
    }
}
