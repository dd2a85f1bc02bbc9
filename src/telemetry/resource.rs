use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};

use crate::telemetry::config::TelemetryConfig;

/// Static identity attached to every exported span
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    service_name: String,
    service_version: String,
    platform_attributes: Vec<KeyValue>,
}

impl ServiceIdentity {
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            platform_attributes: Vec::new(),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.service_name.clone(), config.service_version.clone())
    }

    /// Add auto-detected platform attributes (cloud branch only)
    pub fn with_platform_attributes(mut self, attributes: Vec<KeyValue>) -> Self {
        self.platform_attributes.extend(attributes);
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Get base attributes for any resource
    pub fn base_attributes(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new(SERVICE_NAME, self.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, self.service_version.clone()),
        ]
    }

    /// Base + platform attributes, on top of the SDK's default detectors
    pub fn into_resource(self) -> Resource {
        let mut attrs = self.base_attributes();
        attrs.extend(self.platform_attributes);
        Resource::builder().with_attributes(attrs).build()
    }
}
