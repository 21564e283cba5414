//! The I/O resource group backing one client run.
//!
//! # Responsibilities
//! - Own a dedicated multi-threaded Tokio runtime for transport I/O
//! - Let the (non-async) driver thread run futures on it and block for the result
//! - Release the runtime exactly once, from whichever side gets there first
//!
//! # Design Decisions
//! - The driver never enters the runtime context. Work is spawned onto the
//!   runtime and the driver blocks on a oneshot reply, so a concurrent release
//!   surfaces as `ClientError::Disconnected` instead of a panic.
//! - Release from inside an async context uses `shutdown_background`;
//!   otherwise in-flight tasks get the configured grace period.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::oneshot;

use crate::error::{ClientError, ClientResult};
use crate::lifecycle::shutdown::{Shutdown, ShutdownListener};
use crate::net::connection::ClientId;

/// Runtime plus shutdown trigger for a single client run.
#[derive(Debug)]
pub struct IoGroup {
    client_id: ClientId,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    shutdown: Shutdown,
    grace: Duration,
}

impl IoGroup {
    /// Build the runtime.
    pub fn acquire(
        client_id: ClientId,
        worker_threads: usize,
        grace: Duration,
    ) -> ClientResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name(format!("{client_id}-io"))
            .enable_all()
            .build()
            .map_err(|e| ClientError::Resource(e.into()))?;

        tracing::debug!(
            client_id = %client_id,
            worker_threads,
            "I/O resource group acquired"
        );

        Ok(Self {
            client_id,
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            shutdown: Shutdown::new(),
            grace,
        })
    }

    /// Run `future` on the group and block the calling thread for its output.
    ///
    /// Must not be called from inside an async context.
    pub fn run<F>(&self, future: F) -> ClientResult<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.handle.spawn(async move {
            let _ = tx.send(future.await);
        });
        rx.blocking_recv().map_err(|_| ClientError::Disconnected)
    }

    pub fn shutdown_listener(&self) -> ShutdownListener {
        self.shutdown.subscribe()
    }

    pub fn is_released(&self) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Notify tasks and shut the runtime down. Returns `false` if already released.
    pub fn release(&self) -> bool {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(runtime) = runtime else {
            return false;
        };

        self.shutdown.trigger();
        if Handle::try_current().is_ok() {
            runtime.shutdown_background();
        } else {
            runtime.shutdown_timeout(self.grace);
        }

        tracing::debug!(client_id = %self.client_id, "I/O resource group released");
        true
    }
}

impl Drop for IoGroup {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> IoGroup {
        IoGroup::acquire(ClientId::new(), 1, Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn run_blocks_for_output() {
        let group = group();
        let value = group.run(async { 40 + 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn release_is_idempotent() {
        let group = group();
        assert!(group.release());
        assert!(!group.release());
        assert!(group.is_released());
    }

    #[test]
    fn run_after_release_reports_disconnect() {
        let group = group();
        group.release();
        let result = group.run(async { 1 });
        assert!(matches!(result, Err(ClientError::Disconnected)));
    }

    #[test]
    fn release_triggers_shutdown() {
        let group = group();
        assert!(!group.shutdown.is_triggered());
        group.release();
        assert!(group.shutdown.is_triggered());
    }
}
