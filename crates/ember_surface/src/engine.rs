//! # Native Engine Boundary
//!
//! The opaque renderer the bridge drives. An implementation wraps the
//! engine's C API; the bridge only ever sees handles and status values.
//!
//! ```text
//! Bridge calls:                     Engine implements:
//! ┌──────────────────────────┐      ┌──────────────────────┐
//! │ RenderSurfaceController  │ ───> │ impl NativeEngine    │
//! │ ResourceLoaderBridge     │ <─── │ (load/free callbacks)│
//! └──────────────────────────┘      └──────────────────────┘
//! ```
//!
//! Every method is synchronous and non-reentrant with respect to the
//! lifecycle calls; the controller serializes them.

use crate::ffi::{FreeResourceFn, LoadResourceFn};
use crate::scene::SceneCall;
use ember_core::{BridgeError, LoaderHandle, RendererHandle, SurfaceHandle, Value, WindowHandle};
use std::ffi::c_void;
use thiserror::Error;

/// Failure status reported by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{call} returned {status:?}")]
pub struct NativeFailure {
    /// Native entry point.
    pub call: &'static str,
    /// Raw status, carried back to the host verbatim.
    pub status: Value,
}

impl NativeFailure {
    /// Failure carrying `status`.
    #[must_use]
    pub const fn new(call: &'static str, status: Value) -> Self {
        Self { call, status }
    }
}

impl From<NativeFailure> for BridgeError {
    fn from(failure: NativeFailure) -> Self {
        Self::native(failure.call, failure.status)
    }
}

/// Result type for engine calls.
pub type NativeResult<T> = Result<T, NativeFailure>;

/// Handle-based API of the native renderer.
pub trait NativeEngine: Send + Sync {
    /// Registers the load/free callbacks bound to `owner`.
    ///
    /// `owner` is passed back verbatim on every callback and must stay valid
    /// until [`destroy_resource_loader`](Self::destroy_resource_loader).
    fn make_resource_loader(
        &self,
        load: LoadResourceFn,
        free: FreeResourceFn,
        owner: *mut c_void,
    ) -> NativeResult<LoaderHandle>;

    /// Releases a loader created by [`make_resource_loader`](Self::make_resource_loader).
    fn destroy_resource_loader(&self, loader: LoaderHandle) {
        let _ = loader;
    }

    /// Creates a renderer, optionally attached to a native window.
    fn create_renderer(
        &self,
        window: Option<WindowHandle>,
        loader: LoaderHandle,
    ) -> NativeResult<RendererHandle>;

    /// Destroys a renderer. Its swapchain is already gone.
    fn destroy_renderer(&self, renderer: RendererHandle);

    /// Binds `renderer` to a drawable.
    fn create_swapchain(
        &self,
        renderer: RendererHandle,
        surface: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> NativeResult<()>;

    /// Unbinds the renderer's current drawable.
    fn destroy_swapchain(&self, renderer: RendererHandle);

    /// Updates viewport and camera projection for a new drawable size.
    fn update_viewport_and_camera_projection(
        &self,
        renderer: RendererHandle,
        width: u32,
        height: u32,
        scale: f64,
    ) -> NativeResult<()>;

    /// Renders one frame.
    fn render(&self, renderer: RendererHandle, timestamp_nanos: u64);

    /// Forwards the host's frame interval to engines that pace themselves.
    fn set_frame_interval(&self, renderer: RendererHandle, secs: f64) {
        let _ = (renderer, secs);
    }

    /// Runs a scene operation and returns the engine's answer.
    fn scene_call(&self, renderer: RendererHandle, call: &SceneCall) -> NativeResult<Value>;

    /// Engine driver platform pointer, if the engine exposes one.
    fn driver_platform(&self) -> Option<usize> {
        None
    }

    /// Shared graphics context pointer, if the engine exposes one.
    fn shared_context(&self) -> Option<usize> {
        None
    }
}
