//! Name-keyed exporter registry.
//!
//! A registry maps exporter names to constructors. The metric and trace
//! registries are two independently populated instances of the same
//! [`ExporterFactory`] type; see [`crate::metric::new_exporter_factory`] and
//! [`crate::trace::new_exporter_factory`].

use crate::error::{PipelineError, Signal};
use otel_starter_config::ExportTarget;
use std::collections::HashMap;
use std::fmt;

/// Builds an exporter from a pipeline's export target.
pub type Constructor<X> = Box<dyn Fn(&ExportTarget) -> Result<X, PipelineError> + Send + Sync>;

/// Registry of exporter constructors for one signal.
pub struct ExporterFactory<X> {
    signal: Signal,
    constructors: HashMap<String, Constructor<X>>,
}

impl<X> ExporterFactory<X> {
    /// Creates an empty registry for `signal`.
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            constructors: HashMap::new(),
        }
    }

    /// Registers `constructor` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&ExportTarget) -> Result<X, PipelineError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Box::new(constructor));
        self
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&ExportTarget) -> Result<X, PipelineError> + Send + Sync + 'static,
    {
        self.register(name, constructor);
        self
    }

    /// Builds the exporter named by `target.exporter`.
    ///
    /// Unknown names fail with [`PipelineError::NotDefinedExporter`]. The
    /// constructor's own result is returned unchanged.
    pub fn new_exporter(&self, target: &ExportTarget) -> Result<X, PipelineError> {
        let constructor = self
            .constructors
            .get(&target.exporter)
            .ok_or_else(|| PipelineError::not_defined(self.signal, &target.exporter))?;
        constructor(target)
    }

    /// Whether a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The signal this registry serves.
    pub fn signal(&self) -> Signal {
        self.signal
    }
}

impl<X> fmt::Debug for ExporterFactory<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterFactory")
            .field("signal", &self.signal)
            .field("names", &self.names())
            .finish()
    }
}
