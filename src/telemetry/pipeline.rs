//! Tracer pipeline lifecycle.
//!
//! [`bootstrap`] resolves the deployment, builds the exporter, sampler and
//! resource, installs the propagator, the global tracer provider and the tracing
//! subscriber, and hands back the only owning [`TracerPipeline`]. Dropping the
//! pipeline without calling [`TracerPipeline::shutdown`] loses buffered spans.

use std::time::Duration;

use opentelemetry_otlp::SpanExporter;
use opentelemetry_sdk::trace::{SdkTracerProvider, SpanExporter as SdkSpanExporter};
use serde_json::json;
use tracing::info;

use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::environment::{DeploymentContext, EnvironmentResolver, ProjectIdSource};
use crate::telemetry::error::{BoxError, ShutdownError, TelemetryError};
use crate::telemetry::exporter::select_exporter;
use crate::telemetry::logger::TraceAwareLoggerFactory;
use crate::telemetry::propagation::install_propagator;
use crate::telemetry::resource::ServiceIdentity;
use crate::telemetry::sampler::select_sampler;
use crate::telemetry::trace::init_subscriber;

/// Owns the tracer provider for the process
pub struct TracerPipeline {
    provider: SdkTracerProvider,
    deployment: DeploymentContext,
}

impl std::fmt::Debug for TracerPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerPipeline")
            .field("deployment", &self.deployment)
            .finish_non_exhaustive()
    }
}

impl TracerPipeline {
    /// Resolve the deployment and build the pipeline without touching global state
    pub async fn build<S: ProjectIdSource>(
        config: &TelemetryConfig,
        resolver: &EnvironmentResolver<S>,
    ) -> Result<Self, TelemetryError> {
        let deployment = resolver.resolve().await;
        let exporter: SpanExporter = select_exporter(&deployment, config).await?;
        Ok(Self::with_exporter(config, deployment, exporter))
    }

    /// Assemble a pipeline around an already built exporter
    pub fn with_exporter<E>(
        config: &TelemetryConfig,
        deployment: DeploymentContext,
        exporter: E,
    ) -> Self
    where
        E: SdkSpanExporter + 'static,
    {
        let identity = service_identity(config, &deployment);

        let provider = SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(select_sampler(deployment.is_cloud()))
            .with_resource(identity.into_resource())
            .build();

        Self {
            provider,
            deployment,
        }
    }

    /// Make this pipeline the process-wide tracer: tracing subscriber, propagator
    /// and global provider.
    ///
    /// Global state is only touched once the subscriber is in place, so a failed
    /// install leaves any previously installed pipeline active.
    pub fn install(&self, config: &TelemetryConfig) -> Result<(), TelemetryError> {
        init_subscriber(&self.provider, config)?;
        install_propagator(&config.propagators);
        opentelemetry::global::set_tracer_provider(self.provider.clone());
        Ok(())
    }

    pub fn deployment(&self) -> &DeploymentContext {
        &self.deployment
    }

    pub fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    /// Factory for per-request loggers bound to this deployment
    pub fn logger_factory(&self) -> TraceAwareLoggerFactory {
        TraceAwareLoggerFactory::new(self.deployment.clone())
    }

    /// Flush and close every owned resource.
    ///
    /// `deadline` bounds the final flush; spans still buffered when it expires
    /// are dropped and the timeout is reported as a failure.
    pub async fn shutdown(self, deadline: Duration) -> Result<(), ShutdownError> {
        let mut failures: Vec<BoxError> = Vec::new();

        let provider = self.provider;
        let flush = tokio::task::spawn_blocking(move || provider.shutdown());
        match tokio::time::timeout(deadline, flush).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => failures.push(Box::new(TelemetryError::from(err))),
            Ok(Err(join)) => failures.push(Box::new(TelemetryError::Shutdown(join.to_string()))),
            Err(_) => failures.push(Box::new(TelemetryError::Timeout(deadline))),
        }

        match ShutdownError::from_failures(failures) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn service_identity(config: &TelemetryConfig, deployment: &DeploymentContext) -> ServiceIdentity {
    let identity = ServiceIdentity::from_config(config);

    #[cfg(feature = "telemetry-gcp")]
    {
        if deployment.is_cloud() {
            let platform = crate::telemetry::gcp::GcpResourceBuilder::new(
                deployment.project_id(),
                config.gcp.platform,
            );
            return identity.with_platform_attributes(platform.attributes());
        }
    }

    #[cfg(not(feature = "telemetry-gcp"))]
    let _ = deployment;

    identity
}

/// Build and install the pipeline for `config`
pub async fn bootstrap(config: &TelemetryConfig) -> Result<TracerPipeline, TelemetryError> {
    bootstrap_with(config, &EnvironmentResolver::from_config(config)).await
}

pub async fn bootstrap_with<S: ProjectIdSource>(
    config: &TelemetryConfig,
    resolver: &EnvironmentResolver<S>,
) -> Result<TracerPipeline, TelemetryError> {
    let pipeline = TracerPipeline::build(config, resolver).await?;
    pipeline.install(config)?;

    info!(
        event = "StartUp",
        service = %config.service_name,
        cloud = pipeline.deployment().is_cloud(),
        project_id = %pipeline.deployment().project_id(),
        "Telemetry initialized"
    );
    Ok(pipeline)
}

/// [`bootstrap`], exiting the process when telemetry cannot be set up.
///
/// No subscriber is guaranteed to exist yet, so the failure goes to stderr
/// as a single Cloud Logging JSON line.
pub async fn bootstrap_or_exit(config: &TelemetryConfig) -> TracerPipeline {
    match bootstrap(config).await {
        Ok(pipeline) => pipeline,
        Err(err) => {
            eprintln!(
                "{}",
                json!({
                    "severity": "CRITICAL",
                    "event": "FailedToSetupOpenTelemetry",
                    "message": err.to_string(),
                })
            );
            std::process::exit(1);
        }
    }
}
