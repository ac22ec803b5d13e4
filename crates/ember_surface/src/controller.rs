//! # Render-Surface Controller
//!
//! Owns the renderer handle, the swapchain binding and every surface of one
//! plugin instance.
//!
//! ## State Machine
//!
//! ```text
//!                 create_renderer
//!  Uninitialized ────────────────> LiveNoSwapchain
//!        ^                          │        ^
//!        │ destroy_renderer         │        │ destroy_swapchain
//!        │                create_swapchain   │
//!        │                          v        │
//!        └──────────────────────  LiveReady ─┘
//!                                   │    ^
//!                                   └────┘ resize
//! ```
//!
//! ## Locking
//!
//! One lifecycle mutex guards renderer/swapchain mutation and every render
//! call, so a tick never observes a half-torn-down swapchain. Loader
//! callbacks use the registry's own lock and never take this one.
//!
//! ## Ordering
//!
//! - Swapchain is destroyed before its surface is destroyed or replaced
//! - Swapchain is destroyed before the renderer
//! - Rendering is suspended across every destroy/recreate window and only
//!   restored after the recreation completes

use crate::consumer::{FrameNotifier, TextureConsumer};
use crate::engine::NativeEngine;
use crate::loader::ResourceLoaderBridge;
use crate::scene::SceneCall;
use crate::surface::{Surface, SurfaceFactory, SurfaceRect};
use ember_core::{
    BridgeError, BridgeResult, LoaderHandle, RenderingState, RendererHandle, SurfaceHandle,
    TextureId, Value,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifecycle phase of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No renderer.
    Uninitialized,
    /// Renderer exists, no swapchain.
    LiveNoSwapchain,
    /// Renderer bound to a surface; frames may be rendered.
    LiveReady,
}

/// Identity of a created surface as reported to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    /// Controller-assigned id.
    pub id: TextureId,
    /// Backing store address.
    pub handle: SurfaceHandle,
    /// Current rect.
    pub rect: SurfaceRect,
    /// Off-screen (host texture) or on-screen window.
    pub offscreen: bool,
}

/// Why a tick did or did not render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was rendered into `texture`.
    Rendered {
        /// Surface bound to the swapchain.
        texture: TextureId,
        /// Whether the controller notified the host of a new frame. False
        /// once the engine holds the render callback, which then notifies.
        notified: bool,
    },
    /// Rendering is disabled.
    SkippedDisabled,
    /// No renderer or no swapchain.
    SkippedNotReady,
    /// The bound surface is no longer valid.
    SkippedInvalidSurface,
}

impl TickOutcome {
    /// Returns true if a frame was rendered.
    #[must_use]
    pub const fn rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

struct Lifecycle {
    renderer: Option<RendererHandle>,
    loader: Option<LoaderHandle>,
    /// Surface currently bound to the swapchain.
    swapchain: Option<TextureId>,
    surfaces: BTreeMap<TextureId, Box<dyn Surface>>,
    next_texture: i64,
    scale: f64,
}

impl Lifecycle {
    const fn phase(&self) -> Phase {
        match (self.renderer, self.swapchain) {
            (None, _) => Phase::Uninitialized,
            (Some(_), None) => Phase::LiveNoSwapchain,
            (Some(_), Some(_)) => Phase::LiveReady,
        }
    }

    fn info(&self, id: TextureId) -> Option<TextureInfo> {
        self.surfaces.get(&id).map(|surface| TextureInfo {
            id,
            handle: surface.handle(),
            rect: surface.rect(),
            offscreen: surface.is_offscreen(),
        })
    }
}

/// Serializes renderer, swapchain and surface lifecycle for one instance.
pub struct RenderSurfaceController {
    engine: Arc<dyn NativeEngine>,
    loader_bridge: Arc<ResourceLoaderBridge>,
    surfaces: SurfaceFactory,
    notifier: Arc<FrameNotifier>,
    state: RenderingState,
    lifecycle: Mutex<Lifecycle>,
}

impl RenderSurfaceController {
    /// Creates an uninitialized controller.
    #[must_use]
    pub fn new(
        engine: Arc<dyn NativeEngine>,
        loader_bridge: Arc<ResourceLoaderBridge>,
        surfaces: SurfaceFactory,
        consumer: Arc<dyn TextureConsumer>,
        state: RenderingState,
    ) -> Self {
        Self {
            engine,
            loader_bridge,
            surfaces,
            notifier: Arc::new(FrameNotifier::new(consumer)),
            state,
            lifecycle: Mutex::new(Lifecycle {
                renderer: None,
                loader: None,
                swapchain: None,
                surfaces: BTreeMap::new(),
                next_texture: 1,
                scale: 1.0,
            }),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lifecycle.lock().phase()
    }

    /// Live renderer, if any.
    #[must_use]
    pub fn renderer(&self) -> Option<RendererHandle> {
        self.lifecycle.lock().renderer
    }

    /// Surface bound to the swapchain, if any.
    #[must_use]
    pub fn swapchain_texture(&self) -> Option<TextureId> {
        self.lifecycle.lock().swapchain
    }

    /// Describes a surface.
    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<TextureInfo> {
        self.lifecycle.lock().info(id)
    }

    /// Number of live surfaces.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.lifecycle.lock().surfaces.len()
    }

    /// Rendering flags shared with the frame pump.
    #[must_use]
    pub fn rendering_state(&self) -> &RenderingState {
        &self.state
    }

    /// Frame notifier behind the render callback.
    #[must_use]
    pub fn notifier(&self) -> &Arc<FrameNotifier> {
        &self.notifier
    }

    /// Loader bridge whose callbacks the engine uses.
    #[must_use]
    pub fn loader_bridge(&self) -> &Arc<ResourceLoaderBridge> {
        &self.loader_bridge
    }

    /// Engine this controller drives.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn NativeEngine> {
        &self.engine
    }

    // ------------------------------------------------------------------
    // Surfaces
    // ------------------------------------------------------------------

    /// Creates an off-screen pixel-buffer surface.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidArguments`] for non-positive dimensions.
    pub fn create_texture(&self, width: i64, height: i64) -> BridgeResult<TextureInfo> {
        let rect = SurfaceRect::from_host("createTexture", width, height, 0, 0)?;
        let surface = self.surfaces.offscreen(rect)?;
        Ok(self.adopt(surface))
    }

    /// Creates an on-screen child-window surface.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidArguments`] for non-positive dimensions,
    /// [`BridgeError::NotImplemented`] without a window host.
    pub fn create_window(&self, rect: SurfaceRect) -> BridgeResult<TextureInfo> {
        if rect.width == 0 || rect.height == 0 {
            return Err(BridgeError::InvalidArguments {
                command: "createWindow".to_owned(),
                reason: "both dimensions must be greater than zero".to_owned(),
            });
        }
        let surface = self.surfaces.window(rect)?;
        Ok(self.adopt(surface))
    }

    fn adopt(&self, surface: Box<dyn Surface>) -> TextureInfo {
        let mut lc = self.lifecycle.lock();
        let id = TextureId(lc.next_texture);
        lc.next_texture += 1;
        let info = TextureInfo {
            id,
            handle: surface.handle(),
            rect: surface.rect(),
            offscreen: surface.is_offscreen(),
        };
        lc.surfaces.insert(id, surface);
        drop(lc);

        self.notifier.track(id, info.handle, info.offscreen);
        tracing::info!(%id, handle = %info.handle, width = info.rect.width, height = info.rect.height,
            offscreen = info.offscreen, "surface created");
        info
    }

    /// Destroys a surface. Returns `Ok(false)` for an unknown id.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidState`] while the surface is bound to the swapchain.
    pub fn destroy_texture(&self, id: TextureId) -> BridgeResult<bool> {
        let mut lc = self.lifecycle.lock();
        if lc.swapchain == Some(id) {
            return Err(BridgeError::invalid_state(
                "destroyTexture",
                "destroy the swapchain before destroying its surface",
            ));
        }
        let Some(mut surface) = lc.surfaces.remove(&id) else {
            return Ok(false);
        };
        surface.destroy();
        drop(lc);

        self.notifier.untrack(id);
        tracing::info!(%id, "surface destroyed");
        Ok(true)
    }

    /// Notifies the host that `id` has a new frame. Returns false for
    /// unknown or on-screen surfaces.
    pub fn mark_frame_available(&self, id: TextureId) -> bool {
        self.notifier.notify(id)
    }

    // ------------------------------------------------------------------
    // Renderer
    // ------------------------------------------------------------------

    /// Installs the loader callbacks once and returns the loader handle.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NativeCallFailed`] if the engine rejects the loader.
    pub fn loader_handle(&self) -> BridgeResult<LoaderHandle> {
        let mut lc = self.lifecycle.lock();
        self.ensure_loader(&mut lc)
    }

    fn ensure_loader(&self, lc: &mut Lifecycle) -> BridgeResult<LoaderHandle> {
        if let Some(loader) = lc.loader {
            return Ok(loader);
        }
        let loader = self.loader_bridge.install(self.engine.as_ref())?;
        lc.loader = Some(loader);
        Ok(loader)
    }

    /// Creates the renderer, tearing down any existing swapchain and renderer
    /// first. `window` attaches the renderer to an on-screen surface.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidArguments`] for an unknown surface,
    /// [`BridgeError::NativeCallFailed`] if the engine fails.
    pub fn create_renderer(&self, window: Option<TextureId>) -> BridgeResult<RendererHandle> {
        let mut lc = self.lifecycle.lock();

        let native_window = match window {
            Some(id) => {
                let surface = lc.surfaces.get(&id).ok_or_else(|| BridgeError::InvalidArguments {
                    command: "createRenderer".to_owned(),
                    reason: format!("no surface {id}"),
                })?;
                surface.window()
            }
            None => None,
        };

        let was_rendering = self.state.suspend();
        self.teardown_renderer(&mut lc);

        let loader = self.ensure_loader(&mut lc)?;
        let renderer = self.engine.create_renderer(native_window, loader)?;
        lc.renderer = Some(renderer);
        self.engine
            .set_frame_interval(renderer, self.state.frame_interval_secs());
        self.state.restore(was_rendering);

        tracing::info!(%renderer, %loader, "renderer created");
        Ok(renderer)
    }

    /// Destroys the swapchain (if any), then the renderer.
    /// Returns false if there was no renderer.
    pub fn destroy_renderer(&self) -> bool {
        let mut lc = self.lifecycle.lock();
        if lc.renderer.is_none() {
            return false;
        }
        let was_rendering = self.state.suspend();
        self.teardown_renderer(&mut lc);
        self.state.restore(was_rendering);
        true
    }

    fn teardown_renderer(&self, lc: &mut Lifecycle) {
        self.teardown_swapchain(lc);
        if let Some(renderer) = lc.renderer.take() {
            self.engine.destroy_renderer(renderer);
            tracing::info!(%renderer, "renderer destroyed");
        }
    }

    fn teardown_swapchain(&self, lc: &mut Lifecycle) {
        if let (Some(renderer), Some(texture)) = (lc.renderer, lc.swapchain.take()) {
            self.engine.destroy_swapchain(renderer);
            tracing::debug!(%texture, "swapchain destroyed");
        }
    }

    fn live_renderer(lc: &Lifecycle, operation: &'static str) -> BridgeResult<RendererHandle> {
        lc.renderer.ok_or(BridgeError::NotInitialized(operation))
    }

    // ------------------------------------------------------------------
    // Swapchain
    // ------------------------------------------------------------------

    /// Binds the renderer to surface `id`, replacing any existing binding.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotInitialized`] without a renderer,
    /// [`BridgeError::InvalidArguments`] for an unknown surface,
    /// [`BridgeError::InvalidState`] for a destroyed surface,
    /// [`BridgeError::NativeCallFailed`] if the engine fails.
    pub fn create_swapchain(&self, id: TextureId) -> BridgeResult<()> {
        let mut lc = self.lifecycle.lock();
        let renderer = Self::live_renderer(&lc, "createSwapchain")?;
        let Some(surface) = lc.surfaces.get(&id) else {
            return Err(BridgeError::InvalidArguments {
                command: "createSwapchain".to_owned(),
                reason: format!("no surface {id}"),
            });
        };
        if !surface.is_valid() {
            return Err(BridgeError::invalid_state("createSwapchain", format!("surface {id} is not valid")));
        }
        let handle = surface.handle();
        let rect = surface.rect();

        let was_rendering = self.state.suspend();
        self.teardown_swapchain(&mut lc);
        self.engine
            .create_swapchain(renderer, handle, rect.width, rect.height)?;
        lc.swapchain = Some(id);
        self.state.restore(was_rendering);

        tracing::info!(%id, %handle, width = rect.width, height = rect.height, "swapchain created");
        Ok(())
    }

    /// Unbinds the renderer from its surface. Returns `Ok(false)` if unbound.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotInitialized`] without a renderer.
    pub fn destroy_swapchain(&self) -> BridgeResult<bool> {
        let mut lc = self.lifecycle.lock();
        Self::live_renderer(&lc, "destroySwapchain")?;
        if lc.swapchain.is_none() {
            return Ok(false);
        }
        let was_rendering = self.state.suspend();
        self.teardown_swapchain(&mut lc);
        self.state.restore(was_rendering);
        Ok(true)
    }

    /// Rebuilds the bound surface at a new size.
    ///
    /// Runs destroy-swapchain, resize-surface, create-swapchain and
    /// update-viewport with rendering suspended. Rendering is restored only
    /// when all four succeed. The texture id is unchanged; its handle is new.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidArguments`] for non-positive dimensions,
    /// [`BridgeError::InvalidState`] without a swapchain (no native call is made),
    /// [`BridgeError::NativeCallFailed`] if the engine fails.
    pub fn resize(&self, width: i64, height: i64, scale: f64) -> BridgeResult<TextureId> {
        let size = SurfaceRect::from_host("resize", width, height, 0, 0)?;
        self.rebuild("resize", |current| SurfaceRect {
            left: current.left,
            top: current.top,
            width: size.width,
            height: size.height,
        }, Some(scale))
    }

    /// Moves and resizes the bound on-screen surface, rebuilding its swapchain.
    ///
    /// # Errors
    ///
    /// As [`resize`](Self::resize); also [`BridgeError::InvalidState`] if the
    /// bound surface is off-screen.
    pub fn resize_window(&self, rect: SurfaceRect) -> BridgeResult<TextureId> {
        {
            let lc = self.lifecycle.lock();
            if let Some(info) = lc.swapchain.and_then(|id| lc.info(id)) {
                if info.offscreen {
                    return Err(BridgeError::invalid_state(
                        "resizeWindow",
                        "bound surface is an off-screen texture",
                    ));
                }
            }
        }
        if rect.width == 0 || rect.height == 0 {
            return Err(BridgeError::InvalidArguments {
                command: "resizeWindow".to_owned(),
                reason: "both dimensions must be greater than zero".to_owned(),
            });
        }
        self.rebuild("resizeWindow", |_| rect, None)
    }

    fn rebuild(
        &self,
        operation: &'static str,
        target: impl FnOnce(SurfaceRect) -> SurfaceRect,
        scale: Option<f64>,
    ) -> BridgeResult<TextureId> {
        let mut lc = self.lifecycle.lock();
        let (Some(renderer), Some(id)) = (lc.renderer, lc.swapchain) else {
            return Err(BridgeError::invalid_state(
                operation,
                "cannot resize before a swapchain has been created",
            ));
        };
        let scale = scale.unwrap_or(lc.scale);

        let was_rendering = self.state.suspend();

        self.engine.destroy_swapchain(renderer);
        lc.swapchain = None;

        let surface = lc
            .surfaces
            .get_mut(&id)
            .ok_or_else(|| BridgeError::invalid_state(operation, format!("surface {id} vanished")))?;
        let rect = target(surface.rect());
        let resized = surface.resize(rect);
        let handle = surface.handle();
        let offscreen = surface.is_offscreen();

        let rebound = resized.and_then(|()| {
            self.engine
                .create_swapchain(renderer, handle, rect.width, rect.height)?;
            lc.swapchain = Some(id);
            self.engine
                .update_viewport_and_camera_projection(renderer, rect.width, rect.height, scale)?;
            lc.scale = scale;
            Ok(())
        });
        drop(lc);

        // The old backing store is gone either way; the host must never keep
        // its address.
        self.notifier.track(id, handle, offscreen);
        if let Err(e) = rebound {
            tracing::error!(%id, error = %e, "surface rebuild failed, rendering stays suspended");
            return Err(e);
        }

        self.state.restore(was_rendering);
        tracing::info!(%id, %handle, width = rect.width, height = rect.height, scale, "surface resized");
        Ok(id)
    }

    /// Updates viewport and camera projection without touching the swapchain.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidArguments`] for non-positive dimensions,
    /// [`BridgeError::NotInitialized`] without a renderer,
    /// [`BridgeError::NativeCallFailed`] if the engine fails.
    pub fn update_viewport(&self, width: i64, height: i64, scale: f64) -> BridgeResult<()> {
        let size = SurfaceRect::from_host("updateViewportAndCameraProjection", width, height, 0, 0)?;
        let mut lc = self.lifecycle.lock();
        let renderer = Self::live_renderer(&lc, "updateViewportAndCameraProjection")?;
        self.engine
            .update_viewport_and_camera_projection(renderer, size.width, size.height, scale)?;
        lc.scale = scale;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Renders one frame if rendering is enabled and the swapchain is live.
    ///
    /// Skips are silent; they are frame drops, not errors.
    pub fn render_tick(&self, timestamp_nanos: u64) -> TickOutcome {
        if !self.state.is_rendering() {
            return TickOutcome::SkippedDisabled;
        }
        let lc = self.lifecycle.lock();
        if !self.state.is_rendering() {
            return TickOutcome::SkippedDisabled;
        }
        self.render_locked(&lc, timestamp_nanos)
    }

    /// Renders one frame regardless of the rendering flag.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotInitialized`] without a renderer,
    /// [`BridgeError::InvalidState`] without a valid swapchain surface.
    pub fn render_now(&self, timestamp_nanos: u64) -> BridgeResult<TickOutcome> {
        let lc = self.lifecycle.lock();
        Self::live_renderer(&lc, "render")?;
        match self.render_locked(&lc, timestamp_nanos) {
            TickOutcome::SkippedNotReady => Err(BridgeError::invalid_state("render", "no swapchain")),
            TickOutcome::SkippedInvalidSurface => {
                Err(BridgeError::invalid_state("render", "bound surface is not valid"))
            }
            outcome => Ok(outcome),
        }
    }

    fn render_locked(&self, lc: &Lifecycle, timestamp_nanos: u64) -> TickOutcome {
        let (Some(renderer), Some(texture)) = (lc.renderer, lc.swapchain) else {
            return TickOutcome::SkippedNotReady;
        };
        let Some(surface) = lc.surfaces.get(&texture).filter(|s| s.is_valid()) else {
            tracing::trace!(%texture, "skipping frame, surface invalid");
            return TickOutcome::SkippedInvalidSurface;
        };
        let offscreen = surface.is_offscreen();

        self.engine.render(renderer, timestamp_nanos);

        let notified = offscreen && !self.notifier.engine_notifies() && self.notifier.notify(texture);
        TickOutcome::Rendered { texture, notified }
    }

    /// Stores the frame interval and forwards it to a live renderer.
    /// Returns false for a non-positive or non-finite interval.
    pub fn set_frame_interval(&self, secs: f64) -> bool {
        if !self.state.set_frame_interval(secs) {
            return false;
        }
        if let Some(renderer) = self.lifecycle.lock().renderer {
            self.engine.set_frame_interval(renderer, secs);
        }
        true
    }

    // ------------------------------------------------------------------
    // Scene pass-through
    // ------------------------------------------------------------------

    /// Forwards a scene operation to the live renderer.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotInitialized`] without a renderer,
    /// [`BridgeError::NativeCallFailed`] with the engine's status on failure.
    pub fn scene(&self, call: &SceneCall) -> BridgeResult<Value> {
        let lc = self.lifecycle.lock();
        let renderer = Self::live_renderer(&lc, call.native_name())?;
        let answer = self.engine.scene_call(renderer, call)?;
        Ok(answer)
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Destroys swapchain, renderer, every surface and the loader, in that
    /// order. Safe to call more than once.
    pub fn shutdown(&self) {
        self.state.set_rendering(false);
        let mut lc = self.lifecycle.lock();
        self.teardown_renderer(&mut lc);

        let surfaces = std::mem::take(&mut lc.surfaces);
        let loader = lc.loader.take();
        drop(lc);

        for (id, mut surface) in surfaces {
            surface.destroy();
            self.notifier.untrack(id);
        }
        if let Some(loader) = loader {
            self.engine.destroy_resource_loader(loader);
        }
        let released = self.loader_bridge.registry().clear();
        tracing::info!(released, "controller shut down");
    }
}

impl Drop for RenderSurfaceController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::BundleAssetResolver;
    use crate::testing::{EngineCall, RecordingEngine, RecordingTextureConsumer};
    use ember_core::{ErrorKind, ResourceRegistry};

    struct Fixture {
        engine: Arc<RecordingEngine>,
        consumer: Arc<RecordingTextureConsumer>,
        controller: RenderSurfaceController,
    }

    fn fixture() -> Fixture {
        let engine = Arc::new(RecordingEngine::new());
        let consumer = Arc::new(RecordingTextureConsumer::default());
        let loader = Arc::new(ResourceLoaderBridge::new(
            Arc::new(BundleAssetResolver::new("/nonexistent/bundle")),
            Arc::new(ResourceRegistry::new()),
        ));
        let controller = RenderSurfaceController::new(
            engine.clone(),
            loader,
            SurfaceFactory::offscreen_only(),
            consumer.clone(),
            RenderingState::new(true, 0.01),
        );
        Fixture {
            engine,
            consumer,
            controller,
        }
    }

    fn ready(f: &Fixture) -> TextureId {
        let texture = f.controller.create_texture(256, 256).unwrap().id;
        f.controller.create_renderer(None).unwrap();
        f.controller.create_swapchain(texture).unwrap();
        texture
    }

    #[test]
    fn test_create_texture_honours_dimensions() {
        let f = fixture();
        let info = f.controller.create_texture(320, 200).unwrap();
        assert_eq!((info.rect.width, info.rect.height), (320, 200));
        assert!(!info.handle.is_null());
        assert!(info.offscreen);
        assert_eq!(f.consumer.registrations(), vec![(info.id, info.handle)]);

        let err = f.controller.create_texture(0, 200).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        let err = f.controller.create_texture(100_000, 100_000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);
        assert_eq!(f.controller.texture_count(), 1);
    }

    #[test]
    fn test_phases() {
        let f = fixture();
        assert_eq!(f.controller.phase(), Phase::Uninitialized);
        let texture = f.controller.create_texture(64, 64).unwrap().id;
        f.controller.create_renderer(None).unwrap();
        assert_eq!(f.controller.phase(), Phase::LiveNoSwapchain);
        f.controller.create_swapchain(texture).unwrap();
        assert_eq!(f.controller.phase(), Phase::LiveReady);
        assert!(f.controller.destroy_swapchain().unwrap());
        assert_eq!(f.controller.phase(), Phase::LiveNoSwapchain);
        assert!(f.controller.destroy_renderer());
        assert_eq!(f.controller.phase(), Phase::Uninitialized);
        assert!(!f.controller.destroy_renderer());
        assert!(f.engine.violations().is_empty());
    }

    #[test]
    fn test_operations_need_renderer() {
        let f = fixture();
        let texture = f.controller.create_texture(64, 64).unwrap().id;
        let err = f.controller.create_swapchain(texture).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        let err = f.controller.destroy_swapchain().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        let err = f.controller.scene(&SceneCall::ClearAssets).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        let err = f.controller.render_now(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }

    #[test]
    fn test_resize_without_swapchain_makes_no_native_call() {
        let f = fixture();
        f.controller.create_texture(256, 256).unwrap();

        let err = f.controller.resize(512, 512, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(f.engine.call_count(), 0);

        f.controller.create_renderer(None).unwrap();
        f.engine.clear_calls();
        let err = f.controller.resize(512, 512, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(f.engine.call_count(), 0);
    }

    #[test]
    fn test_resize_sequence() {
        let f = fixture();
        let texture = ready(&f);
        f.engine.clear_calls();

        let resized = f.controller.resize(512, 384, 2.0).unwrap();
        assert_eq!(resized, texture);
        assert!(f.controller.rendering_state().is_rendering());

        let info = f.controller.texture(texture).unwrap();
        assert_eq!((info.rect.width, info.rect.height), (512, 384));

        let calls = f.engine.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], EngineCall::DestroySwapchain);
        assert_eq!(
            calls[1],
            EngineCall::CreateSwapchain {
                surface: info.handle,
                width: 512,
                height: 384
            }
        );
        assert_eq!(
            calls[2],
            EngineCall::UpdateViewport {
                width: 512,
                height: 384,
                scale: 2.0
            }
        );
        assert!(f.engine.violations().is_empty());
        assert_eq!(f.consumer.registrations().last(), Some(&(texture, info.handle)));
    }

    #[test]
    fn test_failed_resize_leaves_rendering_suspended() {
        let f = fixture();
        ready(&f);
        f.engine.fail_next("update_viewport_and_camera_projection");

        let err = f.controller.resize(100, 100, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NativeCallFailed);
        assert!(!f.controller.rendering_state().is_rendering());
        assert_eq!(f.controller.render_tick(1), TickOutcome::SkippedDisabled);
    }

    #[test]
    fn test_failed_rebuild_re_registers_new_store() {
        for failing in ["create_swapchain", "update_viewport_and_camera_projection"] {
            let f = fixture();
            let texture = ready(&f);
            f.engine.fail_next(failing);

            assert!(f.controller.resize(512, 512, 1.0).is_err(), "{failing}");
            let info = f.controller.texture(texture).unwrap();
            assert_eq!(f.consumer.registrations().last(), Some(&(texture, info.handle)), "{failing}");

            f.controller.rendering_state().set_rendering(true);
            f.controller.create_swapchain(texture).unwrap();
            assert!(matches!(f.controller.render_tick(1), TickOutcome::Rendered { .. }));
            assert_eq!(f.engine.last_render().unwrap().0, info.handle);
            assert_eq!(f.consumer.registrations().last(), Some(&(texture, info.handle)));
            assert!(f.engine.violations().is_empty());
        }
    }

    #[test]
    fn test_engine_callback_is_the_only_notifier() {
        let f = fixture();
        let texture = ready(&f);
        let (callback, context) = f.controller.notifier().render_callback();

        let outcome = f.controller.render_tick(1);
        assert_eq!(
            outcome,
            TickOutcome::Rendered {
                texture,
                notified: false
            }
        );
        callback(context);
        assert_eq!(f.consumer.frames(texture), 1);
    }

    #[test]
    fn test_render_tick_gates() {
        let f = fixture();
        let texture = f.controller.create_texture(32, 32).unwrap().id;
        assert_eq!(f.controller.render_tick(1), TickOutcome::SkippedNotReady);

        f.controller.create_renderer(None).unwrap();
        assert_eq!(f.controller.render_tick(2), TickOutcome::SkippedNotReady);

        f.controller.create_swapchain(texture).unwrap();
        assert_eq!(
            f.controller.render_tick(3),
            TickOutcome::Rendered {
                texture,
                notified: true
            }
        );
        assert_eq!(f.consumer.frames(texture), 1);

        f.controller.rendering_state().set_rendering(false);
        assert_eq!(f.controller.render_tick(4), TickOutcome::SkippedDisabled);
        assert!(f.controller.render_now(5).unwrap().rendered());
        assert_eq!(f.engine.render_count(), 2);
    }

    #[test]
    fn test_destroy_texture_rules() {
        let f = fixture();
        let texture = ready(&f);
        let err = f.controller.destroy_texture(texture).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(!f.controller.destroy_texture(TextureId(99)).unwrap());

        f.controller.destroy_swapchain().unwrap();
        assert!(f.controller.destroy_texture(texture).unwrap());
        assert_eq!(f.consumer.unregistrations(), vec![texture]);
        assert!(!f.controller.mark_frame_available(texture));
    }

    #[test]
    fn test_create_renderer_replaces_existing() {
        let f = fixture();
        ready(&f);
        f.engine.clear_calls();

        f.controller.create_renderer(None).unwrap();
        let calls = f.engine.calls();
        assert_eq!(calls[0], EngineCall::DestroySwapchain);
        assert!(matches!(calls[1], EngineCall::DestroyRenderer(_)));
        assert_eq!(calls[2], EngineCall::CreateRenderer { window: None });
        assert_eq!(f.controller.phase(), Phase::LiveNoSwapchain);
        assert!(f.engine.violations().is_empty());
    }

    #[test]
    fn test_loader_installed_once() {
        let f = fixture();
        let first = f.controller.loader_handle().unwrap();
        f.controller.create_renderer(None).unwrap();
        assert_eq!(f.controller.loader_handle().unwrap(), first);
        let installs = f
            .engine
            .calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::MakeResourceLoader))
            .count();
        assert_eq!(installs, 1);
    }

    #[test]
    fn test_frame_interval_forwarded_to_live_renderer() {
        let f = fixture();
        assert!(f.controller.set_frame_interval(0.5));
        assert!(!f.controller.set_frame_interval(0.0));
        assert_eq!(f.engine.call_count(), 0);

        f.controller.create_renderer(None).unwrap();
        assert!(f.controller.set_frame_interval(0.25));
        assert_eq!(f.engine.calls().last(), Some(&EngineCall::SetFrameInterval(0.25)));
    }

    #[test]
    fn test_shutdown_order() {
        let f = fixture();
        ready(&f);
        f.engine.clear_calls();

        f.controller.shutdown();
        let calls = f.engine.calls();
        assert_eq!(calls[0], EngineCall::DestroySwapchain);
        assert!(matches!(calls[1], EngineCall::DestroyRenderer(_)));
        assert!(matches!(calls[2], EngineCall::DestroyResourceLoader(_)));
        assert_eq!(f.controller.texture_count(), 0);
        assert!(f.engine.violations().is_empty());

        f.controller.shutdown();
        assert_eq!(f.engine.call_count(), 3);
    }
    #[test]
    fn test_window_surface_lifecycle() {
        use crate::testing::{RecordingWindowHost, WindowEvent};

        let engine = Arc::new(RecordingEngine::new());
        let host = Arc::new(RecordingWindowHost::default());
        let loader = Arc::new(ResourceLoaderBridge::new(
            Arc::new(BundleAssetResolver::new("/nonexistent/bundle")),
            Arc::new(ResourceRegistry::new()),
        ));
        let controller = RenderSurfaceController::new(
            engine.clone(),
            loader,
            SurfaceFactory::with_window_host(host.clone()),
            Arc::new(RecordingTextureConsumer::default()),
            RenderingState::default(),
        );

        let rect = SurfaceRect {
            left: 10,
            top: 20,
            width: 300,
            height: 200,
        };
        let info = controller.create_window(rect).unwrap();
        assert!(!info.offscreen);
        let window = ember_core::WindowHandle::from_address(info.handle.address());

        controller.create_renderer(Some(info.id)).unwrap();
        assert!(engine.calls().contains(&EngineCall::CreateRenderer {
            window: Some(window)
        }));
        controller.create_swapchain(info.id).unwrap();

        let moved = SurfaceRect {
            left: 0,
            top: 0,
            width: 640,
            height: 480,
        };
        controller.resize_window(moved).unwrap();
        assert_eq!(controller.texture(info.id).unwrap().rect, moved);
        assert!(controller.render_tick(1).rendered());
        assert_eq!(engine.last_render().unwrap().1, (640, 480));

        controller.shutdown();
        assert_eq!(
            host.events(),
            vec![
                WindowEvent::Created(window, rect),
                WindowEvent::Moved(window, moved),
                WindowEvent::Destroyed(window),
            ]
        );
        assert!(engine.violations().is_empty());
    }

    #[test]
    fn test_resize_window_rejects_offscreen_binding() {
        let f = fixture();
        ready(&f);
        let err = f.controller.resize_window(SurfaceRect::sized(10, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
