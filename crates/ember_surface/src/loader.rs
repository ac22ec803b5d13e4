//! # Resource Loader Bridge
//!
//! The engine pulls asset bytes through two C callbacks installed when the
//! loader is registered:
//!
//! ```text
//!   engine thread                        bridge instance (owner ptr)
//!   ─────────────                        ───────────────────────────
//!   load("asset://a.glb", owner) ──────> resolve ──> registry.register
//!            <────────────────────────── { data, size, id }
//!   free(id, owner) ───────────────────> registry.release(id)
//! ```
//!
//! The callbacks run on a thread the engine chooses and on a stack the
//! engine owns. They never unwind: resolution failures answer the empty
//! buffer and panics are caught at the boundary.

use crate::engine::{NativeEngine, NativeResult};
use crate::ffi::{RawResourceBuffer, MAX_RESOURCE_BYTES};
use crate::resolver::{AssetResolver, AssetUri};
use ember_core::{LoaderHandle, ResourceBuffer, ResourceRegistry};
use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Resolves URIs and keeps the resulting bytes alive until freed.
pub struct ResourceLoaderBridge {
    resolver: Arc<dyn AssetResolver>,
    registry: Arc<ResourceRegistry>,
    max_bytes: usize,
}

impl ResourceLoaderBridge {
    /// Creates a bridge over `resolver`, storing buffers in `registry`.
    #[must_use]
    pub fn new(resolver: Arc<dyn AssetResolver>, registry: Arc<ResourceRegistry>) -> Self {
        Self {
            resolver,
            registry,
            max_bytes: MAX_RESOURCE_BYTES,
        }
    }

    /// Caps the payload size; larger assets are answered with the empty
    /// buffer. Never above [`MAX_RESOURCE_BYTES`].
    #[must_use]
    pub fn with_max_resource_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes.min(MAX_RESOURCE_BYTES);
        self
    }

    /// Loads `uri`, answering the empty buffer if it cannot be resolved or
    /// is too large to hand to the engine.
    pub fn load(&self, uri: &str) -> ResourceBuffer {
        let parsed = AssetUri::parse(uri);
        match self.resolver.resolve(&parsed) {
            Ok(bytes) if bytes.len() > self.max_bytes => {
                self.registry.note_empty_answer();
                tracing::warn!(uri, size = bytes.len(), max = self.max_bytes,
                    "resource too large, answering empty buffer");
                ResourceBuffer::empty()
            }
            Ok(bytes) => {
                let buffer = self.registry.register(bytes);
                tracing::debug!(uri, id = buffer.id(), size = buffer.size(), "loaded resource");
                buffer
            }
            Err(e) => {
                self.registry.note_empty_answer();
                tracing::warn!(uri, error = %e, "resource not found, answering empty buffer");
                ResourceBuffer::empty()
            }
        }
    }

    /// Loads `uri` into its C ABI form. A buffer the ABI cannot describe is
    /// released again, so the registry only holds ids the engine has seen.
    pub fn load_raw(&self, uri: &str) -> RawResourceBuffer {
        let buffer = self.load(uri);
        let raw = RawResourceBuffer::from(&buffer);
        if raw.is_empty() && !buffer.is_empty() {
            self.registry.release(buffer.id());
            self.registry.note_empty_answer();
        }
        raw
    }

    /// Releases a buffer. Unknown ids are ignored.
    pub fn free(&self, id: u32) -> bool {
        self.registry.release(id)
    }

    /// Registry backing this bridge.
    #[must_use]
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Registers this bridge's callbacks with `engine`.
    ///
    /// The owner pointer is this `Arc`'s allocation; the caller keeps the
    /// `Arc` alive until the loader is destroyed.
    ///
    /// # Errors
    ///
    /// Propagates the engine's failure status.
    pub fn install(self: &Arc<Self>, engine: &dyn NativeEngine) -> NativeResult<LoaderHandle> {
        let owner = Arc::as_ptr(self).cast_mut().cast::<c_void>();
        let loader = engine.make_resource_loader(load_callback, free_callback, owner)?;
        tracing::info!(%loader, "resource loader installed");
        Ok(loader)
    }
}

/// # Safety
///
/// `owner` must be the pointer passed by [`ResourceLoaderBridge::install`].
unsafe fn bridge_from<'a>(owner: *mut c_void) -> &'a ResourceLoaderBridge {
    &*owner.cast::<ResourceLoaderBridge>()
}

extern "C" fn load_callback(uri: *const c_char, owner: *mut c_void) -> RawResourceBuffer {
    if uri.is_null() || owner.is_null() {
        tracing::warn!("load callback invoked with null pointer");
        return RawResourceBuffer::EMPTY;
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: owner comes from `install`, which the plugin keeps alive
        // while the engine holds the loader. `uri` is a NUL-terminated string
        // owned by the engine for the duration of the call.
        let bridge = unsafe { bridge_from(owner) };
        let uri = unsafe { CStr::from_ptr(uri) }.to_string_lossy();
        bridge.load_raw(&uri)
    }));
    outcome.unwrap_or_else(|_| {
        tracing::error!("panic inside resource load callback");
        RawResourceBuffer::EMPTY
    })
}

extern "C" fn free_callback(id: i32, owner: *mut c_void) {
    if owner.is_null() {
        return;
    }
    let Ok(id) = u32::try_from(id) else {
        tracing::debug!(id, "free of negative resource id ignored");
        return;
    };
    // SAFETY: see `load_callback`.
    let bridge = unsafe { bridge_from(owner) };
    if panic::catch_unwind(AssertUnwindSafe(|| bridge.free(id))).is_err() {
        tracing::error!(id, "panic inside resource free callback");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolveError;
    use std::collections::HashMap;

    struct MapResolver(HashMap<String, Vec<u8>>);

    impl AssetResolver for MapResolver {
        fn resolve(&self, uri: &AssetUri) -> Result<Vec<u8>, ResolveError> {
            self.0
                .get(&uri.to_string())
                .cloned()
                .ok_or_else(|| ResolveError::NotFound(uri.to_string()))
        }
    }

    fn bridge() -> Arc<ResourceLoaderBridge> {
        let mut assets = HashMap::new();
        assets.insert("asset://a.glb".to_string(), vec![1u8, 2, 3, 4]);
        Arc::new(ResourceLoaderBridge::new(
            Arc::new(MapResolver(assets)),
            Arc::new(ResourceRegistry::new()),
        ))
    }

    #[test]
    fn test_load_and_free() {
        let bridge = bridge();
        let buffer = bridge.load("a.glb");
        assert_eq!(buffer.id(), 1);
        assert_eq!(buffer.data(), &[1, 2, 3, 4]);
        assert!(bridge.free(buffer.id()));
        assert!(!bridge.free(buffer.id()));
    }

    #[test]
    fn test_missing_resource_is_empty_buffer() {
        let bridge = bridge();
        let buffer = bridge.load("asset://missing.glb");
        assert!(buffer.is_empty());
        assert_eq!(buffer.size(), 0);
        assert!(bridge.registry().is_empty());
    }

    #[test]
    fn test_oversized_resource_never_registered() {
        let mut assets = HashMap::new();
        assets.insert("asset://big.glb".to_string(), vec![0u8; 64]);
        let bridge = Arc::new(
            ResourceLoaderBridge::new(Arc::new(MapResolver(assets)), Arc::new(ResourceRegistry::new()))
                .with_max_resource_bytes(16),
        );
        let owner = Arc::as_ptr(&bridge).cast_mut().cast::<c_void>();
        let uri = std::ffi::CString::new("big.glb").unwrap();

        let raw = load_callback(uri.as_ptr(), owner);
        assert!(raw.is_empty());
        assert!(bridge.registry().is_empty());
        assert_eq!(bridge.registry().stats().live, 0);
        assert_eq!(bridge.registry().stats().empty_answers, 1);
    }

    #[test]
    fn test_callbacks_route_through_owner() {
        let bridge = bridge();
        let owner = Arc::as_ptr(&bridge).cast_mut().cast::<c_void>();
        let uri = std::ffi::CString::new("asset://a.glb").unwrap();

        let raw = load_callback(uri.as_ptr(), owner);
        assert_eq!(raw.id, 1);
        assert_eq!(raw.size, 4);
        assert!(bridge.registry().contains(1));

        free_callback(raw.id, owner);
        assert!(bridge.registry().is_empty());

        assert!(load_callback(std::ptr::null(), owner).is_empty());
        free_callback(-1, owner);
        free_callback(99, std::ptr::null_mut());
    }

    #[test]
    fn test_instances_are_isolated() {
        let first = bridge();
        let second = bridge();
        let uri = std::ffi::CString::new("a.glb").unwrap();

        let a = load_callback(uri.as_ptr(), Arc::as_ptr(&first).cast_mut().cast());
        let b = load_callback(uri.as_ptr(), Arc::as_ptr(&second).cast_mut().cast());
        assert_eq!((a.id, b.id), (1, 1));
        assert_eq!(first.registry().len(), 1);
        assert_eq!(second.registry().len(), 1);
    }
}
