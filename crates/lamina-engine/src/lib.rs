//! Lamina engine crate.
//!
//! Off-screen render-target management and layer compositing on wgpu: the
//! engine allocates framebuffer attachments (multisampled and resolved),
//! merges independently rendered layers into one output frame per eye, and
//! hands the result back to the embedding.
//!
//! Windowing, frame pacing and layer content production are the embedding's
//! business; every call here must be made on the thread that owns the
//! graphics context.

pub mod bridge;
pub mod compose;
pub mod device;
pub mod error;
pub mod logging;
pub mod target;
