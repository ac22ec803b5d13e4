//! # Platform Thread
//!
//! Some hosts require every native surface call to originate on one thread
//! (a GL or Metal context thread). [`PlatformThread`] is a serial executor:
//! callers block until their job has run there.
//!
//! ```text
//!   caller thread                 platform thread
//!   ─────────────                 ───────────────
//!   run(job) ──── Job ──────────> job()
//!      │                            │
//!      └─ recv <──── result ────────┘
//! ```
//!
//! A job submitted from the platform thread itself runs inline.

use crossbeam_channel::{bounded, unbounded, Sender};
use ember_core::{BridgeError, BridgeResult};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};

type Job = Box<dyn FnOnce() + Send>;

/// Serial executor on a dedicated, named thread.
pub struct PlatformThread {
    jobs: Option<Sender<Job>>,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl PlatformThread {
    /// Spawns the executor thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(name: &str) -> io::Result<Self> {
        let (tx, rx) = unbounded::<Job>();
        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            for job in rx {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("job panicked on platform thread");
                }
            }
            tracing::debug!("platform thread drained");
        })?;
        Ok(Self {
            jobs: Some(tx),
            thread_id: handle.thread().id(),
            handle: Some(handle),
        })
    }

    /// Returns true when called from the executor thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Runs `job` on the executor thread and waits for its result.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidState`] if the executor has stopped or the job
    /// panicked.
    pub fn run<R, F>(&self, job: F) -> BridgeResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Ok(job());
        }
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| BridgeError::invalid_state("platformThread", "executor stopped"))?;

        let (done_tx, done_rx) = bounded(1);
        let boxed: Job = Box::new(move || {
            let _ = done_tx.send(job());
        });
        jobs.send(boxed)
            .map_err(|_| BridgeError::invalid_state("platformThread", "executor stopped"))?;
        done_rx
            .recv()
            .map_err(|_| BridgeError::invalid_state("platformThread", "job did not complete"))
    }

    /// Stops accepting jobs, drains the queue and joins. Idempotent.
    pub fn shutdown(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if self.thread_id == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("platform thread panicked");
            }
        }
    }
}

impl Drop for PlatformThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_jobs_run_on_platform_thread() {
        let platform = Arc::new(PlatformThread::spawn("test-platform").unwrap());
        let caller = thread::current().id();

        let ran_on = platform.run(|| thread::current().id()).unwrap();
        assert_ne!(ran_on, caller);
        assert_eq!(platform.run(|| thread::current().name().map(str::to_owned)).unwrap().as_deref(), Some("test-platform"));
    }

    #[test]
    fn test_nested_run_is_inline() {
        let platform = Arc::new(PlatformThread::spawn("test-nested").unwrap());
        let inner = platform.clone();
        let value = platform.run(move || inner.run(|| 41).map(|v| v + 1)).unwrap().unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_panicking_job_reports_error_and_thread_survives() {
        let platform = PlatformThread::spawn("test-panic").unwrap();
        let err = platform.run(|| -> u32 { panic!("boom") }).unwrap_err();
        assert_eq!(err.kind(), ember_core::ErrorKind::InvalidState);
        assert_eq!(platform.run(|| 7).unwrap(), 7);
    }

    #[test]
    fn test_run_after_shutdown_fails() {
        let mut platform = PlatformThread::spawn("test-stopped").unwrap();
        platform.shutdown();
        assert!(platform.run(|| ()).is_err());
        platform.shutdown();
    }
}
