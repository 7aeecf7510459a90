//! Error kinds surfaced by the render-target store and the compositor.

/// Failure kinds for target and compositing operations.
///
/// Allocation failures (`ResourceExhausted`) leave the store and the affected
/// record in their prior valid state. `ShaderCompile` is fatal for the
/// lifetime of the context: compositing cannot proceed without the program,
/// so callers should surface it immediately rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum LaminaError {
    /// A caller-supplied value is out of contract (zero dimension, missing
    /// required attachment).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The graphics API could not allocate a requested resource.
    #[error("GPU resource allocation failed: {0}")]
    ResourceExhausted(String),

    /// A compositing program failed to compile or link.
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// The operation referenced a render target that was already destroyed.
    /// This is a caller bug, not a runtime condition to recover from.
    #[error("operation on a destroyed render target")]
    UseAfterDestroy,
}
