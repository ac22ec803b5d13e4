//! Deterministic fakes for tests.
//!
//! [`RecordingEngine`] logs every native call, hands out fake addresses and
//! flags lifecycle misuse (rendering without a swapchain, destroying a
//! renderer with a live swapchain). It also keeps the installed loader
//! callbacks so tests can play the engine's side of the loader contract.

use crate::engine::{NativeEngine, NativeFailure, NativeResult};
use crate::ffi::{FreeResourceFn, LoadResourceFn};
use crate::scene::SceneCall;
use crate::surface::{SurfaceRect, WindowHost};
use crate::consumer::TextureConsumer;
use ember_core::{
    BridgeResult, LoaderHandle, RendererHandle, SurfaceHandle, TextureId, Value, WindowHandle,
};
use parking_lot::Mutex;
use raw_window_handle::{RawWindowHandle, Win32WindowHandle};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_void, CString};
use std::num::NonZeroIsize;
use std::time::{Duration, Instant};

/// One call observed by [`RecordingEngine`].
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCall {
    /// `make_resource_loader`.
    MakeResourceLoader,
    /// `destroy_resource_loader`.
    DestroyResourceLoader(LoaderHandle),
    /// `create_renderer`.
    CreateRenderer {
        /// Window the renderer was attached to.
        window: Option<WindowHandle>,
    },
    /// `destroy_renderer`.
    DestroyRenderer(RendererHandle),
    /// `create_swapchain`.
    CreateSwapchain {
        /// Bound drawable.
        surface: SurfaceHandle,
        /// Width.
        width: u32,
        /// Height.
        height: u32,
    },
    /// `destroy_swapchain`.
    DestroySwapchain,
    /// `update_viewport_and_camera_projection`.
    UpdateViewport {
        /// Width.
        width: u32,
        /// Height.
        height: u32,
        /// Scale factor.
        scale: f64,
    },
    /// `render`.
    Render {
        /// Drawable bound when the frame was rendered.
        surface: SurfaceHandle,
        /// Size of that drawable.
        size: (u32, u32),
    },
    /// `set_frame_interval`.
    SetFrameInterval(f64),
    /// `scene_call`.
    Scene(SceneCall),
}

#[derive(Clone, Copy)]
struct InstalledLoader {
    load: LoadResourceFn,
    free: FreeResourceFn,
    owner: usize,
}

struct EngineLog {
    calls: Vec<EngineCall>,
    next_address: usize,
    next_entity: i32,
    renderer: Option<RendererHandle>,
    swapchain: Option<(SurfaceHandle, u32, u32)>,
    loader: Option<InstalledLoader>,
    fail_once: HashSet<&'static str>,
    scene_answers: HashMap<&'static str, Value>,
    violations: Vec<String>,
}

impl EngineLog {
    fn address(&mut self) -> usize {
        self.next_address += 0x100;
        self.next_address
    }

    fn check_failure(&mut self, call: &'static str) -> NativeResult<()> {
        if self.fail_once.remove(call) {
            return Err(NativeFailure::new(call, Value::Bool(false)));
        }
        Ok(())
    }
}

/// Fake engine that records calls and checks lifecycle ordering.
pub struct RecordingEngine {
    log: Mutex<EngineLog>,
}

impl RecordingEngine {
    /// Creates an engine with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Mutex::new(EngineLog {
                calls: Vec::new(),
                next_address: 0x1000,
                next_entity: 100,
                renderer: None,
                swapchain: None,
                loader: None,
                fail_once: HashSet::new(),
                scene_answers: HashMap::new(),
                violations: Vec::new(),
            }),
        }
    }

    /// Makes the next call to `native_name` fail with status `false`.
    pub fn fail_next(&self, native_name: &'static str) {
        self.log.lock().fail_once.insert(native_name);
    }

    /// Fixes the answer of a scene call, e.g. `set_camera` -> `false`.
    pub fn answer_scene(&self, native_name: &'static str, answer: Value) {
        self.log.lock().scene_answers.insert(native_name, answer);
    }

    /// Every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        self.log.lock().calls.clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.log.lock().calls.len()
    }

    /// Number of render calls so far.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.log
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, EngineCall::Render { .. }))
            .count()
    }

    /// Last rendered drawable and its size.
    #[must_use]
    pub fn last_render(&self) -> Option<(SurfaceHandle, (u32, u32))> {
        self.log.lock().calls.iter().rev().find_map(|c| match c {
            EngineCall::Render { surface, size } => Some((*surface, *size)),
            _ => None,
        })
    }

    /// Clears the call log.
    pub fn clear_calls(&self) {
        self.log.lock().calls.clear();
    }

    /// Lifecycle misuse observed so far.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        self.log.lock().violations.clone()
    }

    /// Plays the engine requesting `uri` through the installed loader.
    /// Returns the id and a copy of the bytes, or `None` without a loader.
    #[must_use]
    pub fn request_resource(&self, uri: &str) -> Option<(i32, Vec<u8>)> {
        let loader = self.log.lock().loader?;
        let uri = CString::new(uri).ok()?;
        let raw = (loader.load)(uri.as_ptr(), loader.owner as *mut c_void);
        if raw.is_empty() || raw.data.is_null() {
            return Some((raw.id, Vec::new()));
        }
        let len = usize::try_from(raw.size).ok()?;
        // SAFETY: the bridge keeps `data` alive until `free` is called for `raw.id`.
        let bytes = unsafe { std::slice::from_raw_parts(raw.data, len) }.to_vec();
        Some((raw.id, bytes))
    }

    /// Plays the engine freeing `id` through the installed loader.
    pub fn release_resource(&self, id: i32) {
        let loader = self.log.lock().loader;
        if let Some(loader) = loader {
            (loader.free)(id, loader.owner as *mut c_void);
        }
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine for RecordingEngine {
    fn make_resource_loader(
        &self,
        load: LoadResourceFn,
        free: FreeResourceFn,
        owner: *mut c_void,
    ) -> NativeResult<LoaderHandle> {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::MakeResourceLoader);
        log.check_failure("make_resource_loader")?;
        log.loader = Some(InstalledLoader {
            load,
            free,
            owner: owner as usize,
        });
        Ok(LoaderHandle::from_address(log.address()))
    }

    fn destroy_resource_loader(&self, loader: LoaderHandle) {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::DestroyResourceLoader(loader));
        if log.renderer.is_some() {
            log.violations.push("loader destroyed before renderer".to_owned());
        }
        log.loader = None;
    }

    fn create_renderer(
        &self,
        window: Option<WindowHandle>,
        _loader: LoaderHandle,
    ) -> NativeResult<RendererHandle> {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::CreateRenderer { window });
        log.check_failure("create_renderer")?;
        if log.renderer.is_some() {
            log.violations.push("renderer created while one is live".to_owned());
        }
        let renderer = RendererHandle::from_address(log.address());
        log.renderer = Some(renderer);
        Ok(renderer)
    }

    fn destroy_renderer(&self, renderer: RendererHandle) {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::DestroyRenderer(renderer));
        if log.swapchain.is_some() {
            log.violations.push("renderer destroyed with a live swapchain".to_owned());
        }
        if log.renderer != Some(renderer) {
            log.violations.push(format!("destroy of unknown renderer {renderer}"));
        }
        log.renderer = None;
    }

    fn create_swapchain(
        &self,
        renderer: RendererHandle,
        surface: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> NativeResult<()> {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::CreateSwapchain {
            surface,
            width,
            height,
        });
        log.check_failure("create_swapchain")?;
        if log.renderer != Some(renderer) {
            log.violations.push("swapchain created for a dead renderer".to_owned());
        }
        if log.swapchain.is_some() {
            log.violations.push("swapchain created while one is live".to_owned());
        }
        log.swapchain = Some((surface, width, height));
        Ok(())
    }

    fn destroy_swapchain(&self, _renderer: RendererHandle) {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::DestroySwapchain);
        if log.swapchain.take().is_none() {
            log.violations.push("destroy of missing swapchain".to_owned());
        }
    }

    fn update_viewport_and_camera_projection(
        &self,
        _renderer: RendererHandle,
        width: u32,
        height: u32,
        scale: f64,
    ) -> NativeResult<()> {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::UpdateViewport {
            width,
            height,
            scale,
        });
        log.check_failure("update_viewport_and_camera_projection")
    }

    fn render(&self, renderer: RendererHandle, _timestamp_nanos: u64) {
        let mut log = self.log.lock();
        if log.renderer != Some(renderer) {
            log.violations.push("render on a dead renderer".to_owned());
        }
        match log.swapchain {
            Some((surface, width, height)) => log.calls.push(EngineCall::Render {
                surface,
                size: (width, height),
            }),
            None => {
                log.violations.push("render without a swapchain".to_owned());
                log.calls.push(EngineCall::Render {
                    surface: SurfaceHandle::from_address(0),
                    size: (0, 0),
                });
            }
        }
    }

    fn set_frame_interval(&self, _renderer: RendererHandle, secs: f64) {
        self.log.lock().calls.push(EngineCall::SetFrameInterval(secs));
    }

    fn scene_call(&self, _renderer: RendererHandle, call: &SceneCall) -> NativeResult<Value> {
        let mut log = self.log.lock();
        log.calls.push(EngineCall::Scene(call.clone()));
        let name = call.native_name();
        log.check_failure(name)?;
        if let Some(answer) = log.scene_answers.get(name) {
            return Ok(answer.clone());
        }
        Ok(match call {
            SceneCall::LoadGlb { .. } | SceneCall::LoadGltf { .. } | SceneCall::AddLight(_) => {
                log.next_entity += 1;
                Value::Int(i64::from(log.next_entity))
            }
            _ => Value::Bool(true),
        })
    }
}

/// Consumer that counts frame notifications per texture.
#[derive(Default)]
pub struct RecordingTextureConsumer {
    frames: Mutex<HashMap<TextureId, u64>>,
    registered: Mutex<Vec<(TextureId, SurfaceHandle)>>,
    unregistered: Mutex<Vec<TextureId>>,
}

impl RecordingTextureConsumer {
    /// Frames reported for `texture`.
    #[must_use]
    pub fn frames(&self, texture: TextureId) -> u64 {
        self.frames.lock().get(&texture).copied().unwrap_or(0)
    }

    /// Every registration, including re-registrations after resize.
    #[must_use]
    pub fn registrations(&self) -> Vec<(TextureId, SurfaceHandle)> {
        self.registered.lock().clone()
    }

    /// Every unregistration.
    #[must_use]
    pub fn unregistrations(&self) -> Vec<TextureId> {
        self.unregistered.lock().clone()
    }
}

impl TextureConsumer for RecordingTextureConsumer {
    fn register_texture(&self, texture: TextureId, surface: SurfaceHandle) {
        self.registered.lock().push((texture, surface));
    }

    fn unregister_texture(&self, texture: TextureId) {
        self.unregistered.lock().push(texture);
    }

    fn frame_available(&self, texture: TextureId) {
        *self.frames.lock().entry(texture).or_insert(0) += 1;
    }
}

/// Window operation observed by [`RecordingWindowHost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowEvent {
    /// Window created.
    Created(WindowHandle, SurfaceRect),
    /// Window moved or resized.
    Moved(WindowHandle, SurfaceRect),
    /// Window destroyed.
    Destroyed(WindowHandle),
}

/// Window host handing out fake Win32 child windows.
#[derive(Default)]
pub struct RecordingWindowHost {
    next: Mutex<isize>,
    events: Mutex<Vec<WindowEvent>>,
}

impl RecordingWindowHost {
    /// Every window operation so far.
    #[must_use]
    pub fn events(&self) -> Vec<WindowEvent> {
        self.events.lock().clone()
    }
}

impl WindowHost for RecordingWindowHost {
    fn create_window(&self, rect: SurfaceRect) -> BridgeResult<RawWindowHandle> {
        let mut next = self.next.lock();
        *next += 0x10;
        let hwnd = NonZeroIsize::new(0x7000 + *next).unwrap_or(NonZeroIsize::MIN);
        #[allow(clippy::cast_sign_loss)]
        let handle = WindowHandle::from_address(hwnd.get() as usize);
        self.events.lock().push(WindowEvent::Created(handle, rect));
        Ok(RawWindowHandle::Win32(Win32WindowHandle::new(hwnd)))
    }

    fn move_window(&self, window: WindowHandle, rect: SurfaceRect) -> BridgeResult<()> {
        self.events.lock().push(WindowEvent::Moved(window, rect));
        Ok(())
    }

    fn destroy_window(&self, window: WindowHandle) {
        self.events.lock().push(WindowEvent::Destroyed(window));
    }
}

/// Waits up to `timeout` for `predicate` to hold, polling every millisecond.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    predicate()
}
