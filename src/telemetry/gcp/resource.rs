use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::resource::{
    CLOUD_ACCOUNT_ID, CLOUD_PLATFORM, CLOUD_PROVIDER, CLOUD_REGION, FAAS_NAME, FAAS_VERSION,
};

use crate::telemetry::gcp::config::GcpPlatform;

/// GCP cloud provider value (semconv)
pub const CLOUD_PROVIDER_GCP: &str = "gcp";

/// GCP project ID attribute (required by Cloud Trace)
pub const GCP_PROJECT_ID: &str = "gcp.project_id";

/// Platform attributes auto-detected for the cloud branch
pub struct GcpResourceBuilder {
    project_id: String,
    platform: GcpPlatform,
    region: Option<String>,
    service_id: Option<String>,
    revision: Option<String>,
}

impl GcpResourceBuilder {
    /// Seeds region, service and revision from the platform's environment.
    pub fn new(project_id: impl Into<String>, platform: GcpPlatform) -> Self {
        Self::bare(project_id, platform)
            .with_optional_region(
                std::env::var("CLOUD_RUN_REGION")
                    .or_else(|_| std::env::var("FUNCTION_REGION"))
                    .or_else(|_| std::env::var("GAE_REGION"))
                    .ok(),
            )
            .with_optional_service(
                std::env::var("K_SERVICE")
                    .or_else(|_| std::env::var("FUNCTION_NAME"))
                    .or_else(|_| std::env::var("GAE_SERVICE"))
                    .ok(),
            )
            .with_optional_revision(
                std::env::var("K_REVISION")
                    .or_else(|_| std::env::var("GAE_VERSION"))
                    .ok(),
            )
    }

    /// No environment lookups
    pub fn bare(project_id: impl Into<String>, platform: GcpPlatform) -> Self {
        Self {
            project_id: project_id.into(),
            platform,
            region: None,
            service_id: None,
            revision: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    fn with_optional_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    fn with_optional_service(mut self, service_id: Option<String>) -> Self {
        self.service_id = service_id;
        self
    }

    fn with_optional_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn attributes(self) -> Vec<KeyValue> {
        let mut attrs = vec![
            KeyValue::new(CLOUD_PROVIDER, CLOUD_PROVIDER_GCP),
            KeyValue::new(CLOUD_PLATFORM, self.platform.as_str()),
            KeyValue::new(CLOUD_ACCOUNT_ID, self.project_id.clone()),
            KeyValue::new(GCP_PROJECT_ID, self.project_id),
        ];

        if let Some(region) = self.region {
            attrs.push(KeyValue::new(CLOUD_REGION, region));
        }

        if let Some(service_id) = self.service_id {
            attrs.push(KeyValue::new(FAAS_NAME, service_id));
        }

        if let Some(revision) = self.revision {
            attrs.push(KeyValue::new(FAAS_VERSION, revision));
        }

        attrs
    }
}
