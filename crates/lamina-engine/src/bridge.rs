//! Process-wide handoff of the embedding's native event-loop handle.
//!
//! The engine neither inspects nor drives the handle; the slot exists so an
//! embedding can coordinate one shared frame pump across multiple native
//! subsystems. The value is opaque and embedding-defined.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

/// Opaque, embedding-defined loop handle.
pub type LoopHandle = Arc<dyn Any + Send + Sync>;

static LOOP_HANDLE: Mutex<Option<LoopHandle>> = Mutex::new(None);

/// Stores the process-wide loop handle, replacing any previous one.
pub fn set_loop_handle(handle: LoopHandle) {
    *slot() = Some(handle);
}

/// Returns the process-wide loop handle, if one has been stored.
pub fn loop_handle() -> Option<LoopHandle> {
    slot().clone()
}

/// Clears the stored handle.
pub fn clear_loop_handle() {
    *slot() = None;
}

fn slot() -> MutexGuard<'static, Option<LoopHandle>> {
    // A poisoned lock here can only mean a panic mid-swap of one pointer;
    // the value itself is still coherent.
    LOOP_HANDLE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test exercises the whole lifecycle: the slot is process-global, so
    // parallel test functions would race each other.
    #[test]
    fn set_get_replace_clear_round_trip() {
        clear_loop_handle();
        assert!(loop_handle().is_none());

        set_loop_handle(Arc::new(41_u32));
        let handle = loop_handle().expect("handle was just set");
        assert_eq!(handle.downcast_ref::<u32>(), Some(&41));

        // Replacing swaps the value; the old Arc stays valid for holders.
        set_loop_handle(Arc::new("pump".to_string()));
        let replaced = loop_handle().expect("handle was replaced");
        assert_eq!(replaced.downcast_ref::<String>().map(String::as_str), Some("pump"));
        assert_eq!(handle.downcast_ref::<u32>(), Some(&41));

        clear_loop_handle();
        assert!(loop_handle().is_none());
    }
}
