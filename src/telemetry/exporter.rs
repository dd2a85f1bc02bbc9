use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use tracing::info;

use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::environment::DeploymentContext;
use crate::telemetry::error::TelemetryError;

/// Pick the span exporter for the resolved deployment.
///
/// Cloud goes to Cloud Trace for the resolved project; everything else goes to a
/// generic OTLP/gRPC collector, configured explicitly or through the standard
/// `OTEL_EXPORTER_OTLP_*` variables. Failures are not retried.
pub async fn select_exporter(
    deployment: &DeploymentContext,
    config: &TelemetryConfig,
) -> Result<SpanExporter, TelemetryError> {
    if deployment.is_cloud() {
        return build_cloud_exporter(deployment, config).await;
    }
    build_otlp_exporter(config)
}

#[cfg(feature = "telemetry-gcp")]
async fn build_cloud_exporter(
    deployment: &DeploymentContext,
    config: &TelemetryConfig,
) -> Result<SpanExporter, TelemetryError> {
    crate::telemetry::gcp::build_gcp_exporter(deployment.project_id(), &config.gcp.endpoint).await
}

#[cfg(not(feature = "telemetry-gcp"))]
async fn build_cloud_exporter(
    deployment: &DeploymentContext,
    _config: &TelemetryConfig,
) -> Result<SpanExporter, TelemetryError> {
    Err(TelemetryError::Config(format!(
        "cloud exporter for project {} requires the telemetry-gcp feature",
        deployment.project_id()
    )))
}

/// Generic OTLP/gRPC exporter. The channel connects lazily, so an unreachable
/// collector only shows up at export time.
pub fn build_otlp_exporter(config: &TelemetryConfig) -> Result<SpanExporter, TelemetryError> {
    let builder = SpanExporter::builder().with_tonic();
    let exporter = match &config.otlp_endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Building OTLP exporter");
            builder.with_endpoint(endpoint).build()?
        }
        None => {
            info!("Building OTLP exporter from ambient configuration");
            builder.build()?
        }
    };
    Ok(exporter)
}
