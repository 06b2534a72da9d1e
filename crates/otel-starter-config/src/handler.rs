//! Process-wide error sink.
//!
//! Errors that happen away from a caller (export failures, shutdown failures)
//! are delivered to an [`ErrorHandler`]. One handler is installed globally;
//! configurations default to whatever handler is installed when they are
//! created.

use parking_lot::RwLock;
use std::error::Error;
use std::sync::{Arc, OnceLock};

/// Receives errors that cannot be returned to a caller.
pub trait ErrorHandler: Send + Sync {
    /// Handles a single error. Never called without an error.
    fn handle(&self, error: &(dyn Error + 'static));
}

impl<F> ErrorHandler for F
where
    F: Fn(&(dyn Error + 'static)) + Send + Sync,
{
    fn handle(&self, error: &(dyn Error + 'static)) {
        self(error);
    }
}

/// Default handler: reports the error and its source chain via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorHandler;

impl ErrorHandler for LogErrorHandler {
    fn handle(&self, error: &(dyn Error + 'static)) {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }

        if chain.is_empty() {
            tracing::error!(target: "otel_starter", error = %error, "telemetry error");
        } else {
            tracing::error!(
                target: "otel_starter",
                error = %error,
                caused_by = ?chain,
                "telemetry error"
            );
        }
    }
}

fn slot() -> &'static RwLock<Arc<dyn ErrorHandler>> {
    static GLOBAL_HANDLER: OnceLock<RwLock<Arc<dyn ErrorHandler>>> = OnceLock::new();
    GLOBAL_HANDLER.get_or_init(|| RwLock::new(Arc::new(LogErrorHandler)))
}

/// Returns the currently installed process-wide handler.
pub fn global_error_handler() -> Arc<dyn ErrorHandler> {
    Arc::clone(&slot().read())
}

/// Installs `handler` as the process-wide handler. The last call wins.
pub fn set_global_error_handler(handler: Arc<dyn ErrorHandler>) {
    *slot().write() = handler;
}

/// Delivers `error` to the process-wide handler.
pub fn handle_error(error: &(dyn Error + 'static)) {
    let handler = global_error_handler();
    handler.handle(error);
}
