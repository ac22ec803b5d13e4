//! # Texture Consumers
//!
//! Off-screen surfaces are composited by the host, which must be told when a
//! new frame landed in the backing store. On-screen surfaces present directly
//! and never notify.
//!
//! [`FrameNotifier`] keeps the set of off-screen textures outside the
//! lifecycle lock: the engine may fire the render callback from inside
//! `render()`, while the controller still holds that lock.
//!
//! Once the render callback has been handed out, the engine is the only
//! source of frame notifications for rendered frames; the controller stops
//! notifying on its own so each frame is reported once.

use ember_core::{SurfaceHandle, TextureId};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::ffi::RenderCallbackFn;

/// Host compositor interface for off-screen textures.
pub trait TextureConsumer: Send + Sync {
    /// A texture was created, or its backing store was replaced.
    fn register_texture(&self, texture: TextureId, surface: SurfaceHandle) {
        let _ = (texture, surface);
    }

    /// A texture was destroyed.
    fn unregister_texture(&self, texture: TextureId) {
        let _ = texture;
    }

    /// A new frame is ready in the texture's backing store.
    fn frame_available(&self, texture: TextureId);
}

/// Consumer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTextureConsumer;

impl TextureConsumer for NullTextureConsumer {
    fn frame_available(&self, _texture: TextureId) {}
}

/// Fans frame notifications out to the consumer for off-screen textures.
pub struct FrameNotifier {
    consumer: Arc<dyn TextureConsumer>,
    offscreen: RwLock<BTreeSet<TextureId>>,
    callback_handed_out: AtomicBool,
}

impl FrameNotifier {
    /// Creates a notifier for `consumer`.
    #[must_use]
    pub fn new(consumer: Arc<dyn TextureConsumer>) -> Self {
        Self {
            consumer,
            offscreen: RwLock::new(BTreeSet::new()),
            callback_handed_out: AtomicBool::new(false),
        }
    }

    pub(crate) fn track(&self, texture: TextureId, surface: SurfaceHandle, offscreen: bool) {
        if offscreen {
            self.offscreen.write().insert(texture);
        }
        self.consumer.register_texture(texture, surface);
    }

    pub(crate) fn untrack(&self, texture: TextureId) {
        self.offscreen.write().remove(&texture);
        self.consumer.unregister_texture(texture);
    }

    /// Notifies one texture. Returns false if it is not a tracked off-screen texture.
    pub fn notify(&self, texture: TextureId) -> bool {
        if !self.offscreen.read().contains(&texture) {
            return false;
        }
        self.consumer.frame_available(texture);
        true
    }

    /// Notifies every off-screen texture. Returns how many were notified.
    pub fn notify_all(&self) -> usize {
        let textures: Vec<TextureId> = self.offscreen.read().iter().copied().collect();
        for &texture in &textures {
            self.consumer.frame_available(texture);
        }
        textures.len()
    }

    /// Number of tracked off-screen textures.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.offscreen.read().len()
    }

    /// True once [`render_callback`](Self::render_callback) has been called.
    #[must_use]
    pub fn engine_notifies(&self) -> bool {
        self.callback_handed_out.load(Ordering::Acquire)
    }

    /// Callback pointer and context to hand to the engine.
    ///
    /// The context stays valid for as long as this `Arc` is alive.
    #[must_use]
    pub fn render_callback(self: &Arc<Self>) -> (RenderCallbackFn, *mut c_void) {
        self.callback_handed_out.store(true, Ordering::Release);
        (
            render_callback as RenderCallbackFn,
            Arc::as_ptr(self).cast_mut().cast::<c_void>(),
        )
    }
}

extern "C" fn render_callback(context: *mut c_void) {
    if context.is_null() {
        return;
    }
    // SAFETY: `context` comes from `FrameNotifier::render_callback`, whose
    // owner keeps the notifier alive while the engine holds the pointer.
    let notifier = unsafe { &*context.cast::<FrameNotifier>() };
    if panic::catch_unwind(AssertUnwindSafe(|| notifier.notify_all())).is_err() {
        tracing::error!("texture consumer panicked inside render callback");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counting {
        frames: Mutex<Vec<TextureId>>,
    }

    impl TextureConsumer for Counting {
        fn frame_available(&self, texture: TextureId) {
            self.frames.lock().push(texture);
        }
    }

    #[test]
    fn test_only_offscreen_textures_notify() {
        let consumer = Arc::new(Counting::default());
        let notifier = FrameNotifier::new(consumer.clone());
        notifier.track(TextureId(1), SurfaceHandle::from_address(0x10), true);
        notifier.track(TextureId(2), SurfaceHandle::from_address(0x20), false);

        assert!(notifier.notify(TextureId(1)));
        assert!(!notifier.notify(TextureId(2)));
        assert_eq!(notifier.notify_all(), 1);
        assert_eq!(consumer.frames.lock().as_slice(), &[TextureId(1), TextureId(1)]);

        notifier.untrack(TextureId(1));
        assert_eq!(notifier.tracked(), 0);
    }

    #[test]
    fn test_render_callback_marks_frames() {
        let consumer = Arc::new(Counting::default());
        let notifier = Arc::new(FrameNotifier::new(consumer.clone()));
        notifier.track(TextureId(7), SurfaceHandle::from_address(0x70), true);

        assert!(!notifier.engine_notifies());
        let (callback, context) = notifier.render_callback();
        assert!(notifier.engine_notifies());
        callback(context);
        callback(std::ptr::null_mut());

        assert_eq!(consumer.frames.lock().as_slice(), &[TextureId(7)]);
    }
}
