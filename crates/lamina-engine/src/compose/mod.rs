//! Layer compositing.
//!
//! The compositor consumes an ordered list of layer descriptors each frame
//! and draws them, in that order, into a render target. Caller order is the
//! compositing order: later layers paint over earlier ones, and there is no
//! cross-layer depth sorting.
//!
//! Convention:
//! - stereo sources are one combined side-by-side attachment; the per-eye
//!   pair in a layer descriptor is transforms only
//! - every resolve is encoded before any eye's draws

mod compositor;
mod layer;
mod pipelines;

pub use compositor::{ComposeCtx, LayerCompositor};
pub use layer::{Eye, LayerSpec, LayerType, MAT4_IDENTITY, Mat4, ViewLayout};
pub use pipelines::PipelineKey;
