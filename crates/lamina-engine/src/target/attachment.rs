/// One texture filling a render-target attachment slot, with the views the
/// engine needs to use it.
#[derive(Debug)]
pub struct AttachmentTexture {
    texture: wgpu::Texture,
    /// Full-aspect view, bindable as a render-pass attachment.
    attach_view: wgpu::TextureView,
    /// Shader-sampling view. For depth-stencil formats this selects the
    /// depth aspect, as required for `texture_depth_2d` bindings.
    sample_view: wgpu::TextureView,
}

impl AttachmentTexture {
    pub(crate) fn new(texture: wgpu::Texture) -> Self {
        let attach_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sample_view = if texture.format().has_depth_aspect() {
            texture.create_view(&wgpu::TextureViewDescriptor {
                aspect: wgpu::TextureAspect::DepthOnly,
                ..Default::default()
            })
        } else {
            texture.create_view(&wgpu::TextureViewDescriptor::default())
        };
        Self {
            texture,
            attach_view,
            sample_view,
        }
    }
}

/// An attachment slot with ownership baked into the type.
///
/// `Owned` textures were allocated by the store and are destroyed with the
/// target. `Shared` textures belong to an external owner; the release path
/// structurally cannot touch them.
#[derive(Debug)]
pub enum Attachment {
    Owned(AttachmentTexture),
    Shared(AttachmentTexture),
}

impl Attachment {
    pub(crate) fn owned(texture: wgpu::Texture) -> Self {
        Self::Owned(AttachmentTexture::new(texture))
    }

    pub(crate) fn shared(texture: wgpu::Texture) -> Self {
        Self::Shared(AttachmentTexture::new(texture))
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    /// The underlying texture. Callers may clone the handle (wgpu textures
    /// are internally reference-counted) but must not destroy it.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.inner().texture
    }

    /// Full-aspect view for use as a render-pass attachment.
    pub fn attach_view(&self) -> &wgpu::TextureView {
        &self.inner().attach_view
    }

    /// View for shader sampling (depth aspect only for depth-stencil
    /// formats).
    pub fn sample_view(&self) -> &wgpu::TextureView {
        &self.inner().sample_view
    }

    /// Releases the GPU memory of an owned texture; a no-op for shared ones,
    /// whose lifetime belongs to the external owner.
    pub(crate) fn release(self) {
        match self {
            Self::Owned(t) => t.texture.destroy(),
            Self::Shared(_) => {}
        }
    }

    fn inner(&self) -> &AttachmentTexture {
        match self {
            Self::Owned(t) | Self::Shared(t) => t,
        }
    }
}
