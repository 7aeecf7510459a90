//! Render-target lifecycle management.
//!
//! A render target is the set of GPU attachments (color, depth/stencil, each
//! in a multisampled and a resolved variant) forming one off-screen drawing
//! destination. The store allocates, resizes and destroys these sets;
//! attachment slots supplied by an external owner are referenced but never
//! released here.

mod attachment;
mod store;

pub use attachment::Attachment;
pub use store::{RenderTarget, RenderTargetStore, SharedAttachments, TargetConfig};
