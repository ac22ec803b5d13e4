//! # Rendering State
//!
//! The flag pair the frame pump reads on every tick. Shared between the
//! command path (which toggles it) and the pump thread (which only reads it),
//! so both fields are atomics behind an `Arc`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default frame interval: 60 Hz.
pub const DEFAULT_FRAME_INTERVAL_SECS: f64 = 1.0 / 60.0;

/// Longest accepted frame interval: one hour.
pub const MAX_FRAME_INTERVAL_SECS: f64 = 3600.0;

/// True for a finite interval in `(0, MAX_FRAME_INTERVAL_SECS]`.
#[must_use]
pub fn is_valid_frame_interval(secs: f64) -> bool {
    secs.is_finite() && secs > 0.0 && secs <= MAX_FRAME_INTERVAL_SECS
}

#[derive(Debug)]
struct Inner {
    rendering: AtomicBool,
    /// `f64` bits of the frame interval in seconds.
    frame_interval: AtomicU64,
}

/// Per-plugin-instance rendering flags. Cloning shares the same flags.
#[derive(Clone, Debug)]
pub struct RenderingState {
    inner: Arc<Inner>,
}

impl RenderingState {
    /// Creates a state with the given flag and interval.
    #[must_use]
    pub fn new(rendering: bool, frame_interval_secs: f64) -> Self {
        let interval = if is_valid_frame_interval(frame_interval_secs) {
            frame_interval_secs
        } else {
            DEFAULT_FRAME_INTERVAL_SECS
        };
        Self {
            inner: Arc::new(Inner {
                rendering: AtomicBool::new(rendering),
                frame_interval: AtomicU64::new(interval.to_bits()),
            }),
        }
    }

    /// Returns true if the pump may render.
    #[inline]
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.inner.rendering.load(Ordering::Acquire)
    }

    /// Enables or disables rendering.
    #[inline]
    pub fn set_rendering(&self, rendering: bool) {
        self.inner.rendering.store(rendering, Ordering::Release);
    }

    /// Disables rendering and returns the previous value.
    ///
    /// Pair with [`restore`](Self::restore) around destructive transitions.
    #[inline]
    pub fn suspend(&self) -> bool {
        self.inner.rendering.swap(false, Ordering::AcqRel)
    }

    /// Puts back a value returned by [`suspend`](Self::suspend).
    #[inline]
    pub fn restore(&self, was_rendering: bool) {
        self.set_rendering(was_rendering);
    }

    /// Frame interval in seconds.
    #[inline]
    #[must_use]
    pub fn frame_interval_secs(&self) -> f64 {
        f64::from_bits(self.inner.frame_interval.load(Ordering::Acquire))
    }

    /// Frame interval as a duration. Never panics, whatever bits are stored.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.frame_interval_secs())
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_FRAME_INTERVAL_SECS))
    }

    /// Sets the frame interval. Returns false (and keeps the old value) unless
    /// `secs` is finite, positive and at most [`MAX_FRAME_INTERVAL_SECS`].
    pub fn set_frame_interval(&self, secs: f64) -> bool {
        if !is_valid_frame_interval(secs) {
            return false;
        }
        self.inner.frame_interval.store(secs.to_bits(), Ordering::Release);
        true
    }
}

impl Default for RenderingState {
    fn default() -> Self {
        Self::new(false, DEFAULT_FRAME_INTERVAL_SECS)
    }
}
