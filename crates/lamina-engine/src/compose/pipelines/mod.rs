//! Compositing program cache.
//!
//! A closed set of GPU programs, each built at most once per graphics
//! context on first use and cached with its attribute layout, sampler and
//! static quad geometry. A compile/link failure is fatal for the context:
//! it is surfaced immediately and never retried, since the engine cannot
//! composite without the program.

mod common;
mod compose;
mod depth_resolve;
mod plane;

pub(crate) use common::{
    ComposeUniform, PlaneUniform, UNIFORM_SLOT_STRIDE, eye_uv_window, uniform_binding_size,
};
pub(crate) use compose::ComposePipeline;
pub(crate) use depth_resolve::DepthResolvePipeline;
pub(crate) use plane::PlanePipeline;

use crate::error::LaminaError;

/// Closed set of compositing program purposes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PipelineKey {
    /// Fullscreen presentation of a resolved 3D layer.
    Compose,
    /// Textured plane for 2D overlay / raw canvas layers.
    Plane,
    /// Multisampled-depth downsampling.
    DepthResolve,
}

/// Lazily-built compositing pipelines for one graphics context.
///
/// Repeated requests for a key return the same record; GPU objects are never
/// recreated for a key that already built.
pub(crate) struct PipelineCache {
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    compose: Option<ComposePipeline>,
    plane: Option<PlanePipeline>,
    depth_resolve: Option<DepthResolvePipeline>,
}

impl PipelineCache {
    pub(crate) fn new(
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            color_format,
            depth_format,
            compose: None,
            plane: None,
            depth_resolve: None,
        }
    }

    /// Builds the record for `key` if this is its first use.
    pub(crate) fn ensure(
        &mut self,
        device: &wgpu::Device,
        key: PipelineKey,
    ) -> Result<(), LaminaError> {
        match key {
            PipelineKey::Compose => {
                if self.compose.is_none() {
                    self.compose = Some(ComposePipeline::new(
                        device,
                        self.color_format,
                        self.depth_format,
                    )?);
                    log::debug!("built {key:?} pipeline");
                }
            }
            PipelineKey::Plane => {
                if self.plane.is_none() {
                    self.plane = Some(PlanePipeline::new(
                        device,
                        self.color_format,
                        self.depth_format,
                    )?);
                    log::debug!("built {key:?} pipeline");
                }
            }
            PipelineKey::DepthResolve => {
                if self.depth_resolve.is_none() {
                    self.depth_resolve =
                        Some(DepthResolvePipeline::new(device, self.depth_format)?);
                    log::debug!("built {key:?} pipeline");
                }
            }
        }
        Ok(())
    }

    pub(crate) fn is_built(&self, key: PipelineKey) -> bool {
        match key {
            PipelineKey::Compose => self.compose.is_some(),
            PipelineKey::Plane => self.plane.is_some(),
            PipelineKey::DepthResolve => self.depth_resolve.is_some(),
        }
    }

    /// The Compose record; present once `ensure(Compose)` has succeeded.
    pub(crate) fn compose(&self) -> Option<&ComposePipeline> {
        self.compose.as_ref()
    }

    pub(crate) fn plane(&self) -> Option<&PlanePipeline> {
        self.plane.as_ref()
    }

    pub(crate) fn depth_resolve(&self) -> Option<&DepthResolvePipeline> {
        self.depth_resolve.as_ref()
    }
}
