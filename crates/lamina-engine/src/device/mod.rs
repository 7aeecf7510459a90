//! GPU device management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue for a headless context
//! - reading rendered frames back into CPU memory
//!
//! The engine never creates a window or surface; presenting the composed
//! frame is the embedding's business.

mod gpu;
mod readback;

pub use gpu::{Gpu, GpuInit};
pub use readback::{read_target_rgba, read_texture_rgba};
