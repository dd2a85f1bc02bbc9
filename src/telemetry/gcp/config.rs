use std::env;

/// Default GCP telemetry endpoint
pub const DEFAULT_ENDPOINT: &str = "https://telemetry.googleapis.com";

/// GCP cloud platforms (maps to cloud.platform semconv values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GcpPlatform {
    #[default]
    CloudRun,
    CloudFunctions,
    AppEngine,
    ComputeEngine,
    KubernetesEngine,
}

impl GcpPlatform {
    /// Returns the OpenTelemetry semantic convention value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CloudRun => "gcp_cloud_run",
            Self::CloudFunctions => "gcp_cloud_functions",
            Self::AppEngine => "gcp_app_engine",
            Self::ComputeEngine => "gcp_compute_engine",
            Self::KubernetesEngine => "gcp_kubernetes_engine",
        }
    }

    /// Detect platform from environment variables
    pub fn detect() -> Option<Self> {
        if env::var("K_SERVICE").is_ok() || env::var("K_REVISION").is_ok() {
            Some(Self::CloudRun)
        } else if env::var("FUNCTION_NAME").is_ok() || env::var("FUNCTION_TARGET").is_ok() {
            Some(Self::CloudFunctions)
        } else if env::var("GAE_SERVICE").is_ok() || env::var("GAE_VERSION").is_ok() {
            Some(Self::AppEngine)
        } else if env::var("KUBERNETES_SERVICE_HOST").is_ok() {
            Some(Self::KubernetesEngine)
        } else {
            None
        }
    }
}

/// GCP-specific settings, only consulted when the deployment resolves to cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcpConfig {
    /// Replaces the ADC project id after a successful lookup. Never skips the lookup.
    pub project_id: Option<String>,
    pub endpoint: String,
    pub platform: GcpPlatform,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            platform: GcpPlatform::default(),
        }
    }
}

impl GcpConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_platform(mut self, platform: GcpPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Create from environment variables
    /// - GOOGLE_CLOUD_PROJECT / GCLOUD_PROJECT / GCP_PROJECT for a project_id override
    /// - OTEL_EXPORTER_OTLP_ENDPOINT for endpoint (defaults to DEFAULT_ENDPOINT)
    /// - Platform auto-detected from K_SERVICE, FUNCTION_NAME, GAE_SERVICE, etc.
    pub fn from_env() -> Self {
        let project_id = env::var("GOOGLE_CLOUD_PROJECT")
            .or_else(|_| env::var("GCLOUD_PROJECT"))
            .or_else(|_| env::var("GCP_PROJECT"))
            .ok()
            .filter(|p| !p.trim().is_empty());

        let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Self {
            project_id,
            endpoint,
            platform: GcpPlatform::detect().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::config::tests::EnvGuard;

    const PLATFORM_VARS: &[&str] = &[
        "K_SERVICE",
        "K_REVISION",
        "FUNCTION_NAME",
        "FUNCTION_TARGET",
        "GAE_SERVICE",
        "GAE_VERSION",
        "KUBERNETES_SERVICE_HOST",
    ];

    #[test]
    fn gcp_platform_as_str_returns_semconv_values() {
        assert_eq!(GcpPlatform::CloudRun.as_str(), "gcp_cloud_run");
        assert_eq!(GcpPlatform::CloudFunctions.as_str(), "gcp_cloud_functions");
        assert_eq!(GcpPlatform::AppEngine.as_str(), "gcp_app_engine");
        assert_eq!(GcpPlatform::ComputeEngine.as_str(), "gcp_compute_engine");
        assert_eq!(GcpPlatform::KubernetesEngine.as_str(), "gcp_kubernetes_engine");
    }

    #[test]
    fn gcp_config_default_has_no_project() {
        let config = GcpConfig::default();

        assert!(config.project_id.is_none());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.platform, GcpPlatform::CloudRun);
    }

    #[test]
    fn gcp_config_builder_chain() {
        let config = GcpConfig::new("my-project")
            .with_platform(GcpPlatform::AppEngine)
            .with_endpoint("https://trace.example.com");

        assert_eq!(config.project_id.as_deref(), Some("my-project"));
        assert_eq!(config.platform, GcpPlatform::AppEngine);
        assert_eq!(config.endpoint, "https://trace.example.com");
    }

    // Platform and project env lookups share one test so they never race each other.
    #[test]
    fn gcp_env_detection() {
        let mut vars = PLATFORM_VARS.to_vec();
        vars.extend([
            "GOOGLE_CLOUD_PROJECT",
            "GCLOUD_PROJECT",
            "GCP_PROJECT",
            "OTEL_EXPORTER_OTLP_ENDPOINT",
        ]);
        let _guard = EnvGuard::new(&vars);

        assert_eq!(GcpPlatform::detect(), None);
        assert!(GcpConfig::from_env().project_id.is_none());

        env::set_var("FUNCTION_NAME", "my-function");
        assert_eq!(GcpPlatform::detect(), Some(GcpPlatform::CloudFunctions));

        env::set_var("K_REVISION", "my-service-00001");
        assert_eq!(GcpPlatform::detect(), Some(GcpPlatform::CloudRun));

        env::set_var("GCP_PROJECT", "fallback-project");
        assert_eq!(
            GcpConfig::from_env().project_id.as_deref(),
            Some("fallback-project")
        );

        env::set_var("GOOGLE_CLOUD_PROJECT", "primary-project");
        env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317");
        let config = GcpConfig::from_env();
        assert_eq!(config.project_id.as_deref(), Some("primary-project"));
        assert_eq!(config.endpoint, "http://localhost:4317");
    }
}
