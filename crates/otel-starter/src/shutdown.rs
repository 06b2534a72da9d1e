//! Bounded-time teardown of started components.

use crate::error::ShutdownError;
use otel_starter_pipeline::Shutdown;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default bound on each shutdown action.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Name of the action stopping a metric exporter capability.
pub const METRIC_EXPORTER: &str = "metric exporter";
/// Name of the action stopping the meter provider.
pub const METER_PROVIDER: &str = "meter provider";
/// Name of the action stopping a trace exporter capability.
pub const TRACE_EXPORTER: &str = "trace exporter";
/// Name of the action stopping the tracer provider.
pub const TRACER_PROVIDER: &str = "tracer provider";

/// One pending teardown step.
///
/// An action is consumed by [`run`](Self::run), so it executes at most once.
pub struct ShutdownAction {
    name: String,
    capability: Arc<dyn Shutdown>,
}

impl ShutdownAction {
    /// Creates an action stopping `capability`.
    pub fn new(name: impl Into<String>, capability: Arc<dyn Shutdown>) -> Self {
        Self {
            name: name.into(),
            capability,
        }
    }

    /// Name reported in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the component on a watchdog thread and waits at most `timeout`.
    ///
    /// The component is handed the same `timeout`. One that overruns anyway is
    /// left running in the background; the caller moves on.
    pub fn run(self, timeout: Duration) -> Result<(), ShutdownError> {
        let Self { name, capability } = self;
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name(format!("otel-shutdown-{}", name.replace(' ', "-")))
            .spawn(move || {
                // The receiver is gone once the wait has timed out.
                let _ = tx.send(capability.shutdown(timeout));
            });
        if let Err(err) = spawned {
            return Err(ShutdownError::Failed {
                component: name,
                source: err.into(),
            });
        }

        match rx.recv_timeout(timeout) {
            Ok(Ok(())) => {
                tracing::debug!(component = %name, "shut down");
                Ok(())
            }
            Ok(Err(source)) => Err(ShutdownError::Failed {
                component: name,
                source,
            }),
            Err(RecvTimeoutError::Timeout) => Err(ShutdownError::Timeout {
                component: name,
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(ShutdownError::Panicked { component: name }),
        }
    }
}

impl fmt::Debug for ShutdownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownAction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
