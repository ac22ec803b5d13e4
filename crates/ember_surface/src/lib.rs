//! # EMBER Surface
//!
//! Everything that touches the native renderer:
//! - The [`NativeEngine`] boundary and its C ABI callback types
//! - Render surfaces (off-screen pixel buffers, on-screen child windows)
//! - The [`RenderSurfaceController`] state machine
//! - The [`ResourceLoaderBridge`] the engine pulls asset bytes through
//! - The frame driver and fixed-interval [`FramePump`]
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  RenderSurfaceController                     │
//! │   lifecycle lock: renderer ─ swapchain ─ surfaces ─ render   │
//! ├──────────────┬──────────────────────┬────────────────────────┤
//! │ SurfaceFactory│ ResourceLoaderBridge │ FrameNotifier         │
//! │ pixel / window│ resolver + registry  │ -> TextureConsumer     │
//! └──────┬───────┴──────────┬───────────┴────────────────────────┘
//!        │                  │ load/free callbacks (engine thread)
//!        v                  v
//!   ┌──────────────────────────────┐        FrameDriver <── vsync
//!   │      dyn NativeEngine        │ <──────     ^
//!   └──────────────────────────────┘        FramePump (timer thread)
//! ```

#![deny(missing_docs)]
// The C callbacks handed to the engine dereference owner pointers
#![allow(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod consumer;
pub mod controller;
pub mod engine;
pub mod ffi;
pub mod loader;
pub mod pump;
pub mod resolver;
pub mod scene;
pub mod surface;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use consumer::{FrameNotifier, NullTextureConsumer, TextureConsumer};
pub use controller::{Phase, RenderSurfaceController, TextureInfo, TickOutcome};
pub use engine::{NativeEngine, NativeFailure, NativeResult};
pub use ffi::{FreeResourceFn, LoadResourceFn, RawResourceBuffer, RenderCallbackFn, MAX_RESOURCE_BYTES};
pub use loader::ResourceLoaderBridge;
pub use pump::{FrameDriver, FramePump, FrameStats};
pub use resolver::{AssetResolver, AssetUri, BundleAssetResolver, HotReloadLocator, ResolveError};
pub use scene::{LightDesc, SceneCall};
pub use surface::{
    window_address, PixelBufferSurface, Surface, SurfaceFactory, SurfaceRect, WindowHost,
    WindowSurface, MAX_SURFACE_DIMENSION,
};
