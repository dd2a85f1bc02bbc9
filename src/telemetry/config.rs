use std::env;

use crate::telemetry::propagation::{parse_propagators, PropagatorKind, DEFAULT_PROPAGATORS};

/// Flag selecting the cloud exporter/sampler branch.
pub const CLOUD_TRACING_ENV: &str = "ENABLE_GCP_TRACING";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty human-readable format with colors (for local dev)
    #[default]
    Pretty,
    /// Cloud Logging JSON, one object per line
    Json,
}

/// Main telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// Generic OTLP endpoint. `None` leaves the exporter on its ambient default.
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub cloud_tracing: bool,
    pub propagators: Vec<PropagatorKind>,
    #[cfg(feature = "telemetry-gcp")]
    pub gcp: crate::telemetry::gcp::GcpConfig,
}

/// `"true"` in any letter case enables; everything else (including unset) disables.
pub fn cloud_tracing_from_env() -> bool {
    env::var(CLOUD_TRACING_ENV)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl TelemetryConfig {
    /// Create config from environment variables
    /// - `ENABLE_GCP_TRACING=true` turns on the cloud branch and JSON logs
    /// - `OTEL_PROPAGATORS` selects header formats
    pub fn from_env() -> Self {
        let cloud_tracing = cloud_tracing_from_env();

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ if cloud_tracing => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let propagators = env::var("OTEL_PROPAGATORS")
            .map(|v| parse_propagators(&v))
            .unwrap_or_else(|_| DEFAULT_PROPAGATORS.to_vec());

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string()),
            service_version: env::var("OTEL_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format,
            cloud_tracing,
            propagators,
            #[cfg(feature = "telemetry-gcp")]
            gcp: crate::telemetry::gcp::GcpConfig::from_env(),
        }
    }

    /// Create a new config with explicit values
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            cloud_tracing: false,
            propagators: DEFAULT_PROPAGATORS.to_vec(),
            #[cfg(feature = "telemetry-gcp")]
            gcp: crate::telemetry::gcp::GcpConfig::default(),
        }
    }

    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_cloud_tracing(mut self, enabled: bool) -> Self {
        self.cloud_tracing = enabled;
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_propagators(mut self, propagators: Vec<PropagatorKind>) -> Self {
        self.propagators = propagators;
        self
    }

    #[cfg(feature = "telemetry-gcp")]
    pub fn with_gcp(mut self, gcp: crate::telemetry::gcp::GcpConfig) -> Self {
        self.gcp = gcp;
        self
    }
}

#[derive(Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    otlp_endpoint: Option<String>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
    cloud_tracing: bool,
    propagators: Option<Vec<PropagatorKind>>,
    #[cfg(feature = "telemetry-gcp")]
    gcp: Option<crate::telemetry::gcp::GcpConfig>,
}

impl TelemetryConfigBuilder {
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    pub fn otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    pub fn json(self) -> Self {
        self.log_format(LogFormat::Json)
    }

    pub fn pretty(self) -> Self {
        self.log_format(LogFormat::Pretty)
    }

    pub fn cloud_tracing(mut self, enabled: bool) -> Self {
        self.cloud_tracing = enabled;
        self
    }

    pub fn propagators(mut self, propagators: Vec<PropagatorKind>) -> Self {
        self.propagators = Some(propagators);
        self
    }

    #[cfg(feature = "telemetry-gcp")]
    pub fn gcp(mut self, gcp_config: crate::telemetry::gcp::GcpConfig) -> Self {
        self.gcp = Some(gcp_config);
        self
    }

    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self
                .service_name
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            service_version: self
                .service_version
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            otlp_endpoint: self.otlp_endpoint,
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            log_format: self.log_format.unwrap_or_default(),
            cloud_tracing: self.cloud_tracing,
            propagators: self
                .propagators
                .unwrap_or_else(|| DEFAULT_PROPAGATORS.to_vec()),
            #[cfg(feature = "telemetry-gcp")]
            gcp: self.gcp.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    /// Serializes every test that reads or writes process environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Holds the env lock and clears `vars` on both ends of a test.
    pub(crate) struct EnvGuard {
        vars: Vec<&'static str>,
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        pub(crate) fn new(vars: &[&'static str]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for var in vars {
                env::remove_var(var);
            }
            Self {
                vars: vars.to_vec(),
                _lock: lock,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn log_format_default_is_pretty() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn config_new_sets_defaults() {
        let config = TelemetryConfig::new("test-service", "1.0.0");

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.cloud_tracing);
        assert!(config.otlp_endpoint.is_none());
        assert_eq!(config.propagators, DEFAULT_PROPAGATORS.to_vec());
    }

    #[test]
    fn config_with_methods_chain() {
        let config = TelemetryConfig::new("svc", "1.0")
            .with_log_level("debug")
            .with_log_format(LogFormat::Json)
            .with_cloud_tracing(true)
            .with_otlp_endpoint("http://localhost:4317");

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.cloud_tracing);
        assert_eq!(config.otlp_endpoint, Some("http://localhost:4317".to_string()));
    }

    #[test]
    fn builder_sets_all_fields() {
        let config = TelemetryConfigBuilder::default()
            .service_name("my-service")
            .service_version("2.0.0")
            .log_level("warn")
            .otlp_endpoint("http://collector:4317")
            .cloud_tracing(true)
            .propagators(vec![PropagatorKind::CloudTrace])
            .json()
            .build();

        assert_eq!(config.service_name, "my-service");
        assert_eq!(config.service_version, "2.0.0");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.cloud_tracing);
        assert_eq!(config.propagators, vec![PropagatorKind::CloudTrace]);
        assert_eq!(config.otlp_endpoint, Some("http://collector:4317".to_string()));
    }

    #[test]
    fn builder_uses_defaults_when_not_set() {
        let config = TelemetryConfig::builder().build();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.cloud_tracing);
    }

    #[test]
    fn builder_pretty_sets_log_format() {
        let config = TelemetryConfig::builder().json().pretty().build();
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    // Env-driven assertions share one test so they never race each other.
    #[test]
    fn config_from_env_reads_cloud_flag_and_formats() {
        let _guard = EnvGuard::new(&[CLOUD_TRACING_ENV, "LOG_FORMAT", "OTEL_PROPAGATORS"]);

        assert!(!TelemetryConfig::from_env().cloud_tracing);

        env::set_var(CLOUD_TRACING_ENV, "yes");
        assert!(!cloud_tracing_from_env());

        env::set_var(CLOUD_TRACING_ENV, "TRUE");
        let config = TelemetryConfig::from_env();
        assert!(config.cloud_tracing);
        assert_eq!(config.log_format, LogFormat::Json);

        env::set_var("LOG_FORMAT", "pretty");
        assert_eq!(TelemetryConfig::from_env().log_format, LogFormat::Pretty);

        env::set_var("OTEL_PROPAGATORS", "xcloudtrace");
        assert_eq!(
            TelemetryConfig::from_env().propagators,
            vec![PropagatorKind::CloudTrace]
        );

        env::set_var("OTEL_PROPAGATORS", "");
        assert_eq!(
            TelemetryConfig::from_env().propagators,
            DEFAULT_PROPAGATORS.to_vec()
        );

        env::set_var("OTEL_PROPAGATORS", "b3");
        assert_eq!(
            TelemetryConfig::from_env().propagators,
            DEFAULT_PROPAGATORS.to_vec()
        );
    }
}
