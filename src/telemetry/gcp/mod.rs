//! GCP Cloud Trace integration.
//!
//! Used when the deployment context resolves to cloud: traces go to Cloud
//! Trace over OTLP/gRPC with Application Default Credentials, and the resource
//! carries GCP platform attributes.
//!
//! # Environment Variables
//!
//! - `GOOGLE_CLOUD_PROJECT` / `GCLOUD_PROJECT` / `GCP_PROJECT`: project ID reported once the ADC lookup succeeds
//!   (skips the metadata lookup)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Custom OTLP endpoint
//! - `K_SERVICE`, `FUNCTION_NAME`, `GAE_SERVICE`: Platform auto-detection

pub(crate) mod auth;
pub mod config;
pub mod exporter;
pub mod resource;

pub use config::{GcpConfig, GcpPlatform};
pub use exporter::build_gcp_exporter;
pub use resource::GcpResourceBuilder;
