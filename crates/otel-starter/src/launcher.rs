//! Telemetry lifecycle: ordered start and bounded shutdown.
//!
//! ```text
//!  options ─► Config ─► error handler ─► logging ─► metrics ─► traces
//!                                                     │          │
//!                                  shutdown actions ◄─┴──────────┘
//!                                  (run in recorded order)
//! ```

use crate::error::{LaunchError, ShutdownError};
use crate::logging::init_logging;
use crate::shutdown::{
    ShutdownAction, DEFAULT_SHUTDOWN_TIMEOUT, METER_PROVIDER, METRIC_EXPORTER, TRACER_PROVIDER,
    TRACE_EXPORTER,
};
use opentelemetry::global;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use otel_starter_config::{set_global_error_handler, Config, ConfigOption, ErrorHandler, MultiError};
use otel_starter_pipeline::{metric, new_propagators, trace, MetricExporterFactory, TraceExporterFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handle on started telemetry pipelines.
///
/// Keep it alive for as long as telemetry should flow. Calling
/// [`shutdown`](Self::shutdown), or dropping the handle, stops every started
/// component in the order it was started.
///
/// # Example
///
/// ```
/// use otel_starter::option::*;
/// use otel_starter::Launcher;
///
/// let launcher = Launcher::start([
///     with_service_name("checkout"),
///     with_traces_pipeline([
///         with_tracing_exporter_options([with_exporter_named("stdout")]),
///         with_tracing_sampled(),
///     ]),
/// ]);
/// assert_eq!(launcher.actions(), ["trace exporter", "tracer provider"]);
/// launcher.shutdown();
/// ```
pub struct Launcher {
    config: Config,
    actions: Vec<ShutdownAction>,
    shutdown_timeout: Duration,
}

impl Launcher {
    /// Starts telemetry with the built-in exporters, panicking on failure.
    pub fn start<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        Self::builder().start(options)
    }

    /// Starts telemetry with the built-in exporters.
    pub fn try_start<I>(options: I) -> Result<Self, LaunchError>
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        Self::builder().try_start(options)
    }

    /// Creates a builder for custom registries or shutdown timeout.
    pub fn builder() -> LauncherBuilder {
        LauncherBuilder::default()
    }

    /// The configuration the launcher was started with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of the pending shutdown actions, in execution order.
    pub fn actions(&self) -> Vec<&str> {
        self.actions.iter().map(ShutdownAction::name).collect()
    }

    /// Stops every started component.
    ///
    /// Each action is bounded by the shutdown timeout. Failures do not stop
    /// later actions; they are collected and delivered once to the configured
    /// error handler.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.actions.is_empty() {
            return;
        }

        let mut errors: MultiError<ShutdownError> = MultiError::new();
        for action in self.actions.drain(..) {
            let name = action.name().to_string();
            if let Err(err) = action.run(self.shutdown_timeout) {
                tracing::warn!(component = %name, error = %err, "shutdown action failed");
                errors.push(err);
            }
        }

        if !errors.is_empty() {
            self.config.error_handler().handle(&errors);
        }
    }

    fn start_metrics(&mut self, factory: &MetricExporterFactory) -> Result<(), LaunchError> {
        let pipeline = &self.config.metrics;
        let exporter = factory.new_exporter(&pipeline.export)?;
        if let Some(capability) = exporter.shutdown_capability() {
            self.actions.push(ShutdownAction::new(METRIC_EXPORTER, capability));
        }

        let builder = SdkMeterProvider::builder().with_resource(self.config.resource().to_resource());
        let provider = exporter.install(builder, pipeline.collect_period).build();
        self.actions
            .push(ShutdownAction::new(METER_PROVIDER, Arc::new(provider.clone())));
        global::set_meter_provider(provider);

        tracing::debug!(
            exporter = %pipeline.export.exporter,
            collect_period = ?pipeline.collect_period,
            "metrics pipeline started"
        );
        Ok(())
    }

    fn start_tracing(&mut self, factory: &TraceExporterFactory) -> Result<(), LaunchError> {
        let pipeline = &self.config.tracing;
        let exporter = factory.new_exporter(&pipeline.export)?;
        self.actions
            .push(ShutdownAction::new(TRACE_EXPORTER, exporter.shutdown_capability()));

        let sampler = if pipeline.sampled {
            Sampler::AlwaysOn
        } else {
            Sampler::AlwaysOff
        };
        let builder = SdkTracerProvider::builder()
            .with_sampler(sampler)
            .with_resource(self.config.resource().to_resource());
        let provider = exporter.install(builder).build();
        self.actions
            .push(ShutdownAction::new(TRACER_PROVIDER, Arc::new(provider.clone())));

        let propagator = new_propagators(&pipeline.propagators)?;
        global::set_text_map_propagator(propagator);
        global::set_tracer_provider(provider);

        tracing::debug!(
            exporter = %pipeline.export.exporter,
            sampled = pipeline.sampled,
            propagators = ?pipeline.propagators,
            "traces pipeline started"
        );
        Ok(())
    }
}

impl Drop for Launcher {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Launcher")
            .field("config", &self.config)
            .field("actions", &self.actions())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

/// Builder for [`Launcher`].
pub struct LauncherBuilder {
    metric_exporters: MetricExporterFactory,
    trace_exporters: TraceExporterFactory,
    shutdown_timeout: Duration,
}

impl Default for LauncherBuilder {
    fn default() -> Self {
        Self {
            metric_exporters: metric::new_exporter_factory(),
            trace_exporters: trace::new_exporter_factory(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl LauncherBuilder {
    /// Sets the registry metric exporters are resolved from.
    pub fn metric_exporters(mut self, factory: MetricExporterFactory) -> Self {
        self.metric_exporters = factory;
        self
    }

    /// Sets the registry trace exporters are resolved from.
    pub fn trace_exporters(mut self, factory: TraceExporterFactory) -> Self {
        self.trace_exporters = factory;
        self
    }

    /// Sets the bound on each shutdown action.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Starts telemetry, panicking on failure.
    pub fn start<I>(self, options: I) -> Launcher
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        match self.try_start(options) {
            Ok(launcher) => launcher,
            Err(err) => panic!("failed to start telemetry: {err}"),
        }
    }

    /// Starts telemetry.
    ///
    /// Components started before a failure are shut down again before the
    /// error is returned.
    pub fn try_start<I>(self, options: I) -> Result<Launcher, LaunchError>
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        let mut config = Config::new_default();
        config.apply(options)?;

        let handler = config.error_handler();
        set_global_error_handler(Arc::clone(&handler));

        if let Err(err) = init_logging(&config.logging) {
            handler.handle(&err);
        }

        let metrics_enabled = config.metrics.enabled;
        let tracing_enabled = config.tracing.enabled;
        let mut launcher = Launcher {
            config,
            actions: Vec::new(),
            shutdown_timeout: self.shutdown_timeout,
        };

        if metrics_enabled {
            launcher.start_metrics(&self.metric_exporters)?;
        }
        if tracing_enabled {
            launcher.start_tracing(&self.trace_exporters)?;
        }

        tracing::info!(actions = ?launcher.actions(), "telemetry started");
        Ok(launcher)
    }
}

impl fmt::Debug for LauncherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LauncherBuilder")
            .field("metric_exporters", &self.metric_exporters)
            .field("trace_exporters", &self.trace_exporters)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}
