//! RT-safe deferred deallocation for track buffers
//!
//! Track buffers hold up to `max_loop_seconds` of stereo audio (several MB
//! each). Replacing a track slot must not free the old buffer on the audio
//! thread, so buffers travel inside `basedrop::Owned` and their drop only
//! enqueues a pointer; a background thread performs the actual free.
//!
//! ```ignore
//! use basedrop::Owned;
//!
//! let track = Owned::new(&gc_handle(), Track::new(TrackId(1), capacity));
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// Spawn the collector thread and hand back its handle
fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("looptap-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }

            log::info!("Track buffer GC thread started");

            loop {
                collector.collect();
                thread::sleep(Duration::from_millis(100));
            }
        });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // Without a collector thread, deferred drops pile up until the
            // process exits; leak a collector so handles stay valid.
            log::error!("Failed to start GC thread, track buffers will not be reclaimed");
            let collector = Box::leak(Box::new(Collector::new()));
            collector.handle()
        }
    }
}

/// Get a handle for creating `Owned<T>` / `Shared<T>` allocations
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Owned;

    #[test]
    fn test_owned_drop_is_deferred() {
        let value = Owned::new(&gc_handle(), vec![0.0f32; 1024]);
        assert_eq!(value.len(), 1024);
        drop(value);
    }

    #[test]
    fn test_handle_is_shared() {
        let _a = gc_handle();
        let _b = gc_handle();
        assert!(GC_HANDLE.get().is_some());
    }
}
