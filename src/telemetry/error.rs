use std::fmt;
use std::time::Duration;

/// Boxed error used when teardown results from unrelated subsystems are combined.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Exporter error: {0}")]
    Exporter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Shutdown error: {0}")]
    Shutdown(String),

    #[error("Shutdown did not complete within {0:?}")]
    Timeout(Duration),
}

impl From<opentelemetry_sdk::error::OTelSdkError> for TelemetryError {
    fn from(err: opentelemetry_sdk::error::OTelSdkError) -> Self {
        Self::Shutdown(err.to_string())
    }
}

impl From<opentelemetry_otlp::ExporterBuildError> for TelemetryError {
    fn from(err: opentelemetry_otlp::ExporterBuildError) -> Self {
        Self::Exporter(err.to_string())
    }
}

/// Every teardown failure collected while draining owned resources.
///
/// Never empty: [`ShutdownError::from_failures`] returns `None` for an empty list.
#[derive(Debug)]
pub struct ShutdownError {
    failures: Vec<BoxError>,
}

impl ShutdownError {
    pub fn from_failures(failures: Vec<BoxError>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    pub fn failures(&self) -> &[BoxError] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<BoxError> {
        self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to shutdown: ")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for ShutdownError {}
