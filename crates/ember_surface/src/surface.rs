//! # Render Surfaces
//!
//! A surface is a platform drawable the engine's swapchain binds to. Two
//! strategies share one capability set:
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!                    │ trait Surface                │
//!                    │  handle / rect / is_valid    │
//!                    │  resize / destroy            │
//!                    └──────────────┬───────────────┘
//!                 ┌─────────────────┴─────────────────┐
//!   PixelBufferSurface (off-screen)      WindowSurface (on-screen)
//!   RGBA backing store, host texture     child window via WindowHost
//!   resize = free + reallocate           resize = move/resize window
//! ```
//!
//! Resizing is never in place for pixel buffers: the old store is released
//! and a new one allocated, so the handle changes and the swapchain must be
//! rebuilt around it.

use ember_core::{BridgeError, BridgeResult, SurfaceHandle, WindowHandle};
use raw_window_handle::RawWindowHandle;
use std::sync::Arc;

/// Bytes per pixel of off-screen backing stores (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest accepted width or height, the usual GPU texture limit.
pub const MAX_SURFACE_DIMENSION: u32 = 16_384;

/// Position and size of a surface in physical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SurfaceRect {
    /// Left edge (on-screen surfaces only).
    pub left: i32,
    /// Top edge (on-screen surfaces only).
    pub top: i32,
    /// Width, at least 1.
    pub width: u32,
    /// Height, at least 1.
    pub height: u32,
}

impl SurfaceRect {
    /// Size-only rect at the origin.
    #[must_use]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }

    /// Converts host integers, rejecting non-positive or oversized dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidArguments`] naming `command`.
    pub fn from_host(command: &str, width: i64, height: i64, left: i64, top: i64) -> BridgeResult<Self> {
        let invalid = |reason: String| BridgeError::InvalidArguments {
            command: command.to_owned(),
            reason,
        };
        if width < 1 || height < 1 {
            return Err(invalid(format!(
                "both dimensions must be greater than zero, got {width}x{height}"
            )));
        }
        if width > i64::from(MAX_SURFACE_DIMENSION) || height > i64::from(MAX_SURFACE_DIMENSION) {
            return Err(invalid(format!(
                "dimensions {width}x{height} exceed the {MAX_SURFACE_DIMENSION} pixel limit"
            )));
        }
        let width = u32::try_from(width).map_err(|_| invalid(format!("width {width} too large")))?;
        let height = u32::try_from(height).map_err(|_| invalid(format!("height {height} too large")))?;
        let left = i32::try_from(left).map_err(|_| invalid(format!("left {left} out of range")))?;
        let top = i32::try_from(top).map_err(|_| invalid(format!("top {top} out of range")))?;
        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }
}

/// A drawable the engine can bind a swapchain to.
pub trait Surface: Send {
    /// Address of the current backing store.
    fn handle(&self) -> SurfaceHandle;

    /// Current position and size.
    fn rect(&self) -> SurfaceRect;

    /// Returns false once destroyed or if the backing store is gone.
    fn is_valid(&self) -> bool;

    /// Replaces the backing store at the new size.
    ///
    /// # Errors
    ///
    /// Returns an error if the new store cannot be created; the surface is
    /// then invalid.
    fn resize(&mut self, rect: SurfaceRect) -> BridgeResult<()>;

    /// Releases the backing store. Idempotent.
    fn destroy(&mut self);

    /// True for surfaces composited by the host as a texture.
    fn is_offscreen(&self) -> bool;

    /// Native window to attach a renderer to, for on-screen surfaces.
    fn window(&self) -> Option<WindowHandle> {
        None
    }
}

/// Off-screen RGBA pixel buffer shared with the host compositor.
pub struct PixelBufferSurface {
    pixels: Option<Box<[u8]>>,
    rect: SurfaceRect,
    generation: u32,
}

impl PixelBufferSurface {
    /// Allocates a zeroed buffer of `width` x `height` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidArguments`] for zero or overflowing sizes.
    pub fn new(width: u32, height: u32) -> BridgeResult<Self> {
        let rect = SurfaceRect::sized(width, height);
        let pixels = Self::allocate(rect)?;
        Ok(Self {
            pixels: Some(pixels),
            rect,
            generation: 0,
        })
    }

    fn allocate(rect: SurfaceRect) -> BridgeResult<Box<[u8]>> {
        let refused = || BridgeError::InvalidArguments {
            command: "createTexture".to_owned(),
            reason: format!("cannot allocate {}x{} pixel buffer", rect.width, rect.height),
        };
        let len = (rect.width as usize)
            .checked_mul(rect.height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .filter(|&n| n > 0)
            .ok_or_else(refused)?;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| refused())?;
        pixels.resize(len, 0u8);
        Ok(pixels.into_boxed_slice())
    }

    /// Number of times the backing store has been replaced.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Backing store bytes, if still allocated.
    #[must_use]
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }
}

impl Surface for PixelBufferSurface {
    fn handle(&self) -> SurfaceHandle {
        SurfaceHandle::from_address(self.pixels.as_ref().map_or(0, |p| p.as_ptr() as usize))
    }

    fn rect(&self) -> SurfaceRect {
        self.rect
    }

    fn is_valid(&self) -> bool {
        self.pixels.is_some()
    }

    fn resize(&mut self, rect: SurfaceRect) -> BridgeResult<()> {
        self.destroy();
        let pixels = Self::allocate(rect)?;
        self.pixels = Some(pixels);
        self.rect = SurfaceRect::sized(rect.width, rect.height);
        self.generation += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        self.pixels = None;
    }

    fn is_offscreen(&self) -> bool {
        true
    }
}

/// Platform side of on-screen surfaces.
///
/// Implemented by the host embedding: creates child windows inside the host
/// view hierarchy and moves or destroys them on request.
pub trait WindowHost: Send + Sync {
    /// Creates a child window covering `rect`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses to create the window.
    fn create_window(&self, rect: SurfaceRect) -> BridgeResult<RawWindowHandle>;

    /// Moves and resizes an existing window.
    ///
    /// # Errors
    ///
    /// Returns an error if the window no longer exists.
    fn move_window(&self, window: WindowHandle, rect: SurfaceRect) -> BridgeResult<()>;

    /// Destroys a window.
    fn destroy_window(&self, window: WindowHandle);
}

/// Extracts the native address from a platform window handle.
///
/// # Errors
///
/// Returns [`BridgeError::NotImplemented`] for window systems without a
/// pointer-sized native handle.
pub fn window_address(raw: &RawWindowHandle) -> BridgeResult<WindowHandle> {
    #[allow(clippy::cast_sign_loss)]
    let address = match raw {
        RawWindowHandle::Win32(h) => h.hwnd.get() as usize,
        RawWindowHandle::WinRt(h) => h.core_window.as_ptr() as usize,
        RawWindowHandle::AppKit(h) => h.ns_view.as_ptr() as usize,
        RawWindowHandle::UiKit(h) => h.ui_view.as_ptr() as usize,
        RawWindowHandle::AndroidNdk(h) => h.a_native_window.as_ptr() as usize,
        RawWindowHandle::Wayland(h) => h.surface.as_ptr() as usize,
        RawWindowHandle::Xlib(h) => h.window as usize,
        RawWindowHandle::Xcb(h) => h.window.get() as usize,
        other => {
            return Err(BridgeError::NotImplemented(format!(
                "window system {other:?}"
            )))
        }
    };
    Ok(WindowHandle::from_address(address))
}

/// On-screen surface backed by a child window.
pub struct WindowSurface {
    host: Arc<dyn WindowHost>,
    window: Option<WindowHandle>,
    rect: SurfaceRect,
}

impl WindowSurface {
    /// Creates a child window through `host`.
    ///
    /// # Errors
    ///
    /// Propagates host failures and unsupported window systems.
    pub fn create(host: Arc<dyn WindowHost>, rect: SurfaceRect) -> BridgeResult<Self> {
        let raw = host.create_window(rect)?;
        let window = window_address(&raw)?;
        tracing::debug!(%window, width = rect.width, height = rect.height, "created child window");
        Ok(Self {
            host,
            window: Some(window),
            rect,
        })
    }
}

impl Surface for WindowSurface {
    fn handle(&self) -> SurfaceHandle {
        SurfaceHandle::from_address(self.window.map_or(0, WindowHandle::address))
    }

    fn rect(&self) -> SurfaceRect {
        self.rect
    }

    fn is_valid(&self) -> bool {
        self.window.is_some()
    }

    fn resize(&mut self, rect: SurfaceRect) -> BridgeResult<()> {
        let window = self
            .window
            .ok_or_else(|| BridgeError::invalid_state("resize", "window already destroyed"))?;
        self.host.move_window(window, rect)?;
        self.rect = rect;
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(window) = self.window.take() {
            self.host.destroy_window(window);
        }
    }

    fn is_offscreen(&self) -> bool {
        false
    }

    fn window(&self) -> Option<WindowHandle> {
        self.window
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Builds surfaces for a controller.
#[derive(Clone, Default)]
pub struct SurfaceFactory {
    window_host: Option<Arc<dyn WindowHost>>,
}

impl SurfaceFactory {
    /// Factory that can only build off-screen surfaces.
    #[must_use]
    pub fn offscreen_only() -> Self {
        Self::default()
    }

    /// Factory that builds on-screen surfaces through `host`.
    #[must_use]
    pub fn with_window_host(host: Arc<dyn WindowHost>) -> Self {
        Self {
            window_host: Some(host),
        }
    }

    /// Builds an off-screen pixel buffer.
    ///
    /// # Errors
    ///
    /// See [`PixelBufferSurface::new`].
    pub fn offscreen(&self, rect: SurfaceRect) -> BridgeResult<Box<dyn Surface>> {
        Ok(Box::new(PixelBufferSurface::new(rect.width, rect.height)?))
    }

    /// Builds an on-screen child window.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotImplemented`] without a window host.
    pub fn window(&self, rect: SurfaceRect) -> BridgeResult<Box<dyn Surface>> {
        let host = self
            .window_host
            .as_ref()
            .ok_or_else(|| BridgeError::NotImplemented("on-screen windows on this platform".to_owned()))?;
        Ok(Box::new(WindowSurface::create(Arc::clone(host), rect)?))
    }
}
