//! # Frame Pump
//!
//! Drives `render()` from a clock.
//!
//! ```text
//!   host vsync (Choreographer / display link) ──┐
//!                                               ├──> FrameDriver::on_frame(ts)
//!   FramePump thread (fixed interval) ──────────┘          │
//!                                                          v
//!                                  RenderSurfaceController::render_tick(ts)
//!                                  (gated on rendering flag + LiveReady)
//! ```
//!
//! Hosts with a vsync source call [`FrameDriver::on_frame`] directly. Hosts
//! without one start a [`FramePump`], which re-reads the frame interval on
//! every tick and keeps ticking after skips.

use crate::controller::{RenderSurfaceController, TickOutcome};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Frame statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Ticks observed.
    pub ticks: u64,
    /// Frames rendered.
    pub rendered: u64,
    /// Frames after which the host was notified.
    pub notified: u64,
    /// Skipped because rendering was disabled.
    pub skipped_disabled: u64,
    /// Skipped because no swapchain was live.
    pub skipped_not_ready: u64,
    /// Skipped because the surface was invalid.
    pub skipped_invalid: u64,
    /// Longest render call observed (microseconds).
    pub max_render_us: u64,
}

/// Clock-agnostic frame step with statistics.
pub struct FrameDriver {
    controller: Arc<RenderSurfaceController>,
    stats: Mutex<FrameStats>,
}

impl FrameDriver {
    /// Creates a driver for `controller`.
    #[must_use]
    pub fn new(controller: Arc<RenderSurfaceController>) -> Self {
        Self {
            controller,
            stats: Mutex::new(FrameStats::default()),
        }
    }

    /// Runs one gated render at `timestamp_nanos`.
    pub fn on_frame(&self, timestamp_nanos: u64) -> TickOutcome {
        let start = Instant::now();
        let outcome = self.controller.render_tick(timestamp_nanos);
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        let mut s = self.stats.lock();
        s.ticks += 1;
        match outcome {
            TickOutcome::Rendered { notified, .. } => {
                s.rendered += 1;
                s.notified += u64::from(notified);
                s.max_render_us = s.max_render_us.max(elapsed_us);
            }
            TickOutcome::SkippedDisabled => s.skipped_disabled += 1,
            TickOutcome::SkippedNotReady => s.skipped_not_ready += 1,
            TickOutcome::SkippedInvalidSurface => s.skipped_invalid += 1,
        }
        outcome
    }

    /// Returns a snapshot of the statistics.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        *self.stats.lock()
    }

    /// Controller being driven.
    #[must_use]
    pub fn controller(&self) -> &Arc<RenderSurfaceController> {
        &self.controller
    }
}

/// Fixed-interval frame pump on a dedicated thread.
///
/// Dropping the pump stops and joins the thread.
pub struct FramePump {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FramePump {
    /// Starts ticking `driver` at the controller's frame interval.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn start(driver: Arc<FrameDriver>, thread_name: &str) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let state = driver.controller().rendering_state().clone();

        let handle = thread::Builder::new()
            .name(thread_name.to_owned())
            .spawn(move || {
                let epoch = Instant::now();
                tracing::debug!("frame pump started");
                loop {
                    match shutdown_rx.recv_timeout(state.frame_interval()) {
                        Err(RecvTimeoutError::Timeout) => {
                            let ts = u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
                            driver.on_frame(ts);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("frame pump stopped");
            })?;

        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Returns true while the pump thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the thread and waits for it. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("frame pump thread panicked");
            }
        }
    }
}

impl Drop for FramePump {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ResourceLoaderBridge;
    use crate::resolver::BundleAssetResolver;
    use crate::surface::SurfaceFactory;
    use crate::testing::{wait_until, RecordingEngine, RecordingTextureConsumer};
    use ember_core::{RenderingState, ResourceRegistry};
    use std::time::Duration;

    fn driver(engine: &Arc<RecordingEngine>) -> Arc<FrameDriver> {
        let loader = Arc::new(ResourceLoaderBridge::new(
            Arc::new(BundleAssetResolver::new("/nonexistent/bundle")),
            Arc::new(ResourceRegistry::new()),
        ));
        let controller = Arc::new(RenderSurfaceController::new(
            engine.clone(),
            loader,
            SurfaceFactory::offscreen_only(),
            Arc::new(RecordingTextureConsumer::default()),
            RenderingState::new(true, 0.002),
        ));
        Arc::new(FrameDriver::new(controller))
    }

    #[test]
    fn test_driver_counts_outcomes() {
        let engine = Arc::new(RecordingEngine::new());
        let driver = driver(&engine);
        let controller = driver.controller();

        assert_eq!(driver.on_frame(1), TickOutcome::SkippedNotReady);

        let texture = controller.create_texture(16, 16).unwrap().id;
        controller.create_renderer(None).unwrap();
        controller.create_swapchain(texture).unwrap();
        assert!(driver.on_frame(2).rendered());

        controller.rendering_state().set_rendering(false);
        assert_eq!(driver.on_frame(3), TickOutcome::SkippedDisabled);

        let stats = driver.stats();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.rendered, 1);
        assert_eq!(stats.notified, 1);
        assert_eq!(stats.skipped_not_ready, 1);
        assert_eq!(stats.skipped_disabled, 1);
    }

    #[test]
    fn test_pump_ticks_until_stopped() {
        let engine = Arc::new(RecordingEngine::new());
        let driver = driver(&engine);
        let controller = driver.controller().clone();
        let texture = controller.create_texture(16, 16).unwrap().id;
        controller.create_renderer(None).unwrap();
        controller.create_swapchain(texture).unwrap();

        let mut pump = FramePump::start(driver.clone(), "test-pump").unwrap();
        assert!(pump.is_running());
        assert!(wait_until(Duration::from_secs(5), || engine.render_count() >= 3));

        pump.stop();
        assert!(!pump.is_running());
        let after_stop = engine.render_count();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(engine.render_count(), after_stop);
        pump.stop();
    }

    #[test]
    fn test_pump_survives_skips() {
        let engine = Arc::new(RecordingEngine::new());
        let driver = driver(&engine);
        let pump = FramePump::start(driver.clone(), "test-pump-idle").unwrap();

        assert!(wait_until(Duration::from_secs(5), || driver.stats().skipped_not_ready >= 3));
        assert!(pump.is_running());
        assert_eq!(engine.render_count(), 0);
        drop(pump);
    }
}
