//! Trace pipeline bootstrap and trace-correlated request logging.
//!
//! At startup the deployment context is resolved once (cloud or local), the
//! exporter and sampler are chosen from it, and the resulting tracer provider is
//! installed process-wide. Per request, [`middleware::TraceAwareLogger`] attaches
//! a [`RequestLogger`] whose records carry the Cloud Logging trace keys for the
//! request's span.
//!
//! # Features
//!
//! - `telemetry-gcp`: Enable GCP Cloud Trace support
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let config = TelemetryConfig::from_env();
//! let pipeline = telemetry::bootstrap_or_exit(&config).await;
//! let factory = pipeline.logger_factory();
//!
//! HttpServer::new(move || {
//!     App::new()
//!         .wrap(TraceAwareLogger::new(factory.clone()))
//!         .wrap(TracingLogger::default())
//! });
//!
//! telemetry::safe_shutdown([pipeline.shutdown(deadline).await.map_err(Into::into)]);
//! ```
//!
//! # Selection
//!
//! | Deployment | Exporter | Sampler |
//! |------------|----------|---------|
//! | cloud | Cloud Trace (OTLP/gRPC + ADC) | parent-based, 1% of new roots |
//! | local | OTLP/gRPC to the configured collector | always on |
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ENABLE_GCP_TRACING` | `true` enables the cloud branch | `false` |
//! | `OTEL_SERVICE_NAME` | Service name | `CARGO_PKG_NAME` |
//! | `OTEL_SERVICE_VERSION` | Service version | `CARGO_PKG_VERSION` |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP endpoint | exporter default |
//! | `OTEL_PROPAGATORS` | `tracecontext`, `baggage`, `xcloudtrace`, `none` | `tracecontext,baggage` |
//! | `RUST_LOG` | Log level filter | `info` |
//! | `LOG_FORMAT` | `pretty` or `json` | `json` in cloud, else `pretty` |

pub mod config;
pub mod environment;
pub mod error;
pub mod exporter;
pub mod logger;
pub mod middleware;
pub mod pipeline;
pub mod propagation;
pub mod resource;
pub mod sampler;
pub mod shutdown;
pub mod trace;

#[cfg(feature = "telemetry-gcp")]
pub mod gcp;
#[cfg(feature = "telemetry-gcp")]
pub use gcp::{GcpConfig, GcpPlatform};

// Re-exports
pub use config::{LogFormat, TelemetryConfig, TelemetryConfigBuilder};
pub use environment::{DeploymentContext, EnvironmentResolver, ProjectIdSource, ProjectSource};
pub use error::{BoxError, ShutdownError, TelemetryError};
pub use logger::{RequestLogger, SpanReference, TraceAwareLoggerFactory, TraceFields};
pub use middleware::{get_logger, TraceAwareLogger};
pub use pipeline::{bootstrap, bootstrap_or_exit, bootstrap_with, TracerPipeline};
pub use propagation::PropagatorKind;
pub use shutdown::{combine, safe_shutdown};
