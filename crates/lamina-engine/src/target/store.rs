use crate::error::LaminaError;

use super::Attachment;

/// Formats and sampling shared by every target a store creates.
///
/// One store serves one graphics context; the compositor is built against the
/// same config so pipeline formats and attachment formats always agree.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub color_format: wgpu::TextureFormat,
    pub depth_stencil_format: wgpu::TextureFormat,
    /// Sample count for the multisampled attachment pair.
    pub sample_count: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8Unorm,
            depth_stencil_format: wgpu::TextureFormat::Depth24PlusStencil8,
            sample_count: 4,
        }
    }
}

/// Externally owned textures to reuse for specific attachment slots.
///
/// A filled slot is referenced verbatim and marked shared: the store never
/// resizes or releases it, and the owner must keep its size in step with the
/// target's. Empty slots are allocated by the store.
#[derive(Debug, Default)]
pub struct SharedAttachments {
    pub color: Option<wgpu::Texture>,
    pub depth_stencil: Option<wgpu::Texture>,
    pub ms_color: Option<wgpu::Texture>,
    pub ms_depth_stencil: Option<wgpu::Texture>,
}

/// The attachment set of a live render target.
#[derive(Debug)]
pub(crate) struct TargetAttachments {
    pub(crate) color: Attachment,
    pub(crate) depth_stencil: Attachment,
    pub(crate) ms_color: Attachment,
    pub(crate) ms_depth_stencil: Attachment,
}

/// One render target: four attachment slots at a common size.
///
/// The record is mutated in place on resize, so references held by the
/// embedding stay valid. After `destroy` the record remains but every
/// accessor returns `None`; further resize/compose calls report
/// `UseAfterDestroy`.
#[derive(Debug)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    attachments: Option<TargetAttachments>,
}

impl RenderTarget {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_destroyed(&self) -> bool {
        self.attachments.is_none()
    }

    /// Resolved color attachment (the presented image).
    pub fn color(&self) -> Option<&Attachment> {
        self.attachments.as_ref().map(|a| &a.color)
    }

    /// Resolved depth/stencil attachment.
    pub fn depth_stencil(&self) -> Option<&Attachment> {
        self.attachments.as_ref().map(|a| &a.depth_stencil)
    }

    /// Multisampled color attachment (scene rendering destination).
    pub fn ms_color(&self) -> Option<&Attachment> {
        self.attachments.as_ref().map(|a| &a.ms_color)
    }

    /// Multisampled depth/stencil attachment.
    pub fn ms_depth_stencil(&self) -> Option<&Attachment> {
        self.attachments.as_ref().map(|a| &a.ms_depth_stencil)
    }

    pub(crate) fn attachments(&self) -> Option<&TargetAttachments> {
        self.attachments.as_ref()
    }
}

/// Allocates, resizes and destroys render targets for one graphics context.
pub struct RenderTargetStore {
    device: wgpu::Device,
    config: TargetConfig,
    max_dimension: u32,
}

impl RenderTargetStore {
    pub fn new(device: &wgpu::Device, config: TargetConfig) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        Self {
            device: device.clone(),
            config,
            max_dimension,
        }
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Creates a render target at the given size.
    ///
    /// Slots filled in `shared` are reused verbatim and marked shared;
    /// everything else is allocated and owned by the target. Fails with
    /// `InvalidArgument` for a zero dimension and `ResourceExhausted` when
    /// the device cannot allocate the attachments.
    pub fn create(
        &self,
        width: u32,
        height: u32,
        shared: SharedAttachments,
    ) -> Result<RenderTarget, LaminaError> {
        validate_size(width, height, self.max_dimension)?;

        let error_scope = self
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let attachments = TargetAttachments {
            color: self.fill_slot(shared.color, width, height, Slot::Color),
            depth_stencil: self.fill_slot(shared.depth_stencil, width, height, Slot::DepthStencil),
            ms_color: self.fill_slot(shared.ms_color, width, height, Slot::MsColor),
            ms_depth_stencil: self.fill_slot(
                shared.ms_depth_stencil,
                width,
                height,
                Slot::MsDepthStencil,
            ),
        };

        if let Some(err) = pollster::block_on(error_scope.pop()) {
            release_all(attachments);
            return Err(LaminaError::ResourceExhausted(err.to_string()));
        }

        log::debug!("created {width}x{height} render target");
        Ok(RenderTarget {
            width,
            height,
            attachments: Some(attachments),
        })
    }

    /// Resizes the owned attachments of `target` in place.
    ///
    /// Shared attachments are left untouched; the external owner is
    /// responsible for resizing them upstream, and until it does the
    /// composed output is undefined (documented, not defended). Either all
    /// owned attachments are reallocated or, on failure, the record is left
    /// exactly as it was.
    pub fn resize(
        &self,
        target: &mut RenderTarget,
        new_width: u32,
        new_height: u32,
    ) -> Result<(), LaminaError> {
        let Some(current) = target.attachments.as_ref() else {
            return Err(LaminaError::UseAfterDestroy);
        };
        validate_size(new_width, new_height, self.max_dimension)?;
        if target.width == new_width && target.height == new_height {
            return Ok(());
        }
        let owned_slots = [
            (Slot::Color, current.color.is_owned()),
            (Slot::DepthStencil, current.depth_stencil.is_owned()),
            (Slot::MsColor, current.ms_color.is_owned()),
            (Slot::MsDepthStencil, current.ms_depth_stencil.is_owned()),
        ];

        // Allocate every replacement before touching the record.
        let error_scope = self
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let replacements = owned_slots
            .map(|(slot, owned)| owned.then(|| self.alloc_slot(new_width, new_height, slot)));
        if let Some(err) = pollster::block_on(error_scope.pop()) {
            for replacement in replacements.into_iter().flatten() {
                replacement.destroy();
            }
            return Err(LaminaError::ResourceExhausted(err.to_string()));
        }

        let Some(current) = target.attachments.take() else {
            // Unreachable: checked live above and nothing in between destroys.
            return Err(LaminaError::UseAfterDestroy);
        };
        let [color, depth_stencil, ms_color, ms_depth_stencil] = replacements;
        target.attachments = Some(TargetAttachments {
            color: swap_in(current.color, color),
            depth_stencil: swap_in(current.depth_stencil, depth_stencil),
            ms_color: swap_in(current.ms_color, ms_color),
            ms_depth_stencil: swap_in(current.ms_depth_stencil, ms_depth_stencil),
        });
        log::debug!(
            "resized render target {}x{} -> {new_width}x{new_height}",
            target.width,
            target.height
        );
        target.width = new_width;
        target.height = new_height;
        Ok(())
    }

    /// Releases every owned attachment of `target`.
    ///
    /// Shared attachments are left for their external owner. Idempotent:
    /// destroying an already-destroyed record is a no-op.
    pub fn destroy(&self, target: &mut RenderTarget) {
        if let Some(attachments) = target.attachments.take() {
            release_all(attachments);
            log::debug!(
                "destroyed {}x{} render target",
                target.width,
                target.height
            );
        }
    }

    fn fill_slot(
        &self,
        shared: Option<wgpu::Texture>,
        width: u32,
        height: u32,
        slot: Slot,
    ) -> Attachment {
        match shared {
            Some(texture) => Attachment::shared(texture),
            None => Attachment::owned(self.alloc_slot(width, height, slot)),
        }
    }

    fn alloc_slot(&self, width: u32, height: u32, slot: Slot) -> wgpu::Texture {
        let (label, format, sample_count, usage) = match slot {
            Slot::Color => (
                "lamina target color",
                self.config.color_format,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
            ),
            Slot::DepthStencil => (
                "lamina target depth-stencil",
                self.config.depth_stencil_format,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            ),
            Slot::MsColor => (
                "lamina target ms color",
                self.config.color_format,
                self.config.sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            Slot::MsDepthStencil => (
                "lamina target ms depth-stencil",
                self.config.depth_stencil_format,
                self.config.sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            ),
        };

        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        })
    }
}

#[derive(Debug, Copy, Clone)]
enum Slot {
    Color,
    DepthStencil,
    MsColor,
    MsDepthStencil,
}

fn swap_in(old: Attachment, replacement: Option<wgpu::Texture>) -> Attachment {
    match replacement {
        // Replacements are allocated for owned slots only, so `old` is never
        // a shared attachment here.
        Some(texture) => {
            old.release();
            Attachment::owned(texture)
        }
        None => old,
    }
}

fn release_all(attachments: TargetAttachments) {
    attachments.color.release();
    attachments.depth_stencil.release();
    attachments.ms_color.release();
    attachments.ms_depth_stencil.release();
}

fn validate_size(width: u32, height: u32, max_dimension: u32) -> Result<(), LaminaError> {
    if width == 0 || height == 0 {
        return Err(LaminaError::InvalidArgument(format!(
            "render target size {width}x{height} must be non-zero"
        )));
    }
    if width > max_dimension || height > max_dimension {
        return Err(LaminaError::ResourceExhausted(format!(
            "render target size {width}x{height} exceeds device limit {max_dimension}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── validate_size ─────────────────────────────────────────────────────

    #[test]
    fn zero_dimension_is_invalid_argument() {
        assert!(matches!(
            validate_size(0, 32, 8192),
            Err(LaminaError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_size(32, 0, 8192),
            Err(LaminaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn oversized_dimension_is_resource_exhausted() {
        assert!(matches!(
            validate_size(8193, 32, 8192),
            Err(LaminaError::ResourceExhausted(_))
        ));
        assert!(matches!(
            validate_size(32, 10_000, 8192),
            Err(LaminaError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(validate_size(8192, 8192, 8192).is_ok());
        assert!(validate_size(1, 1, 8192).is_ok());
    }
}
