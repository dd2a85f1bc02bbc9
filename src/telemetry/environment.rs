//! Deployment context resolution.
//!
//! Whether the process runs in the cloud is decided once: the cloud tracing flag
//! must be on and the project id lookup must succeed. Any lookup failure degrades
//! to local mode instead of surfacing an error, since the same binary also runs
//! on laptops and in unit tests.

use std::future::Future;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::error::TelemetryError;

/// Project id used whenever the process is not running in the cloud
pub const LOCAL_PROJECT_ID: &str = "local";

/// Resolved deployment context. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    is_cloud: bool,
    project_id: String,
}

impl DeploymentContext {
    pub fn local() -> Self {
        Self {
            is_cloud: false,
            project_id: LOCAL_PROJECT_ID.to_string(),
        }
    }

    /// An empty project id cannot build a trace path, so it falls back to local.
    pub fn cloud(project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Self::local();
        }
        Self {
            is_cloud: true,
            project_id,
        }
    }

    pub fn is_cloud(&self) -> bool {
        self.is_cloud
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

impl Default for DeploymentContext {
    fn default() -> Self {
        Self::local()
    }
}

/// Where the cloud project id comes from
pub trait ProjectIdSource: Send + Sync {
    fn project_id(&self) -> impl Future<Output = Result<String, TelemetryError>> + Send;
}

/// Project id sources used outside of tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSource {
    /// Ask Application Default Credentials (the metadata server on Cloud Run)
    #[cfg(feature = "telemetry-gcp")]
    Metadata,
    /// Built without cloud support
    Unavailable,
}

impl ProjectSource {
    #[cfg(feature = "telemetry-gcp")]
    pub fn from_config(_config: &TelemetryConfig) -> Self {
        Self::Metadata
    }

    #[cfg(not(feature = "telemetry-gcp"))]
    pub fn from_config(_config: &TelemetryConfig) -> Self {
        Self::Unavailable
    }
}

impl ProjectIdSource for ProjectSource {
    async fn project_id(&self) -> Result<String, TelemetryError> {
        match self {
            #[cfg(feature = "telemetry-gcp")]
            Self::Metadata => crate::telemetry::gcp::auth::project_id_from_adc().await,
            Self::Unavailable => Err(TelemetryError::Config(
                "built without the telemetry-gcp feature".to_string(),
            )),
        }
    }
}

/// Memoizing resolver for [`DeploymentContext`].
///
/// The source is consulted at most once, and never when cloud tracing is off.
/// A configured project override only replaces the id of a successful lookup;
/// it never makes the deployment count as cloud on its own.
pub struct EnvironmentResolver<S = ProjectSource> {
    cloud_tracing: bool,
    source: S,
    project_override: Option<String>,
    resolved: OnceCell<DeploymentContext>,
}

impl EnvironmentResolver<ProjectSource> {
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let resolver = Self::new(config.cloud_tracing, ProjectSource::from_config(config));

        #[cfg(feature = "telemetry-gcp")]
        {
            if let Some(project_id) = &config.gcp.project_id {
                return resolver.with_project_override(project_id.clone());
            }
        }

        resolver
    }
}

impl<S: ProjectIdSource> EnvironmentResolver<S> {
    pub fn new(cloud_tracing: bool, source: S) -> Self {
        Self {
            cloud_tracing,
            source,
            project_override: None,
            resolved: OnceCell::new(),
        }
    }

    /// Report `project_id` instead of the looked-up id once the lookup succeeds
    pub fn with_project_override(mut self, project_id: impl Into<String>) -> Self {
        self.project_override = Some(project_id.into()).filter(|p| !p.trim().is_empty());
        self
    }

    pub async fn resolve(&self) -> DeploymentContext {
        self.resolved
            .get_or_init(|| async {
                if !self.cloud_tracing {
                    debug!("Cloud tracing disabled, using local deployment context");
                    return DeploymentContext::local();
                }

                match self.source.project_id().await {
                    Ok(project_id) if !project_id.trim().is_empty() => {
                        let project_id = self.project_override.clone().unwrap_or(project_id);
                        debug!(project_id = %project_id, "Resolved cloud project");
                        DeploymentContext::cloud(project_id)
                    }
                    Ok(_) => {
                        warn!("Cloud project lookup returned an empty id, using local mode");
                        DeploymentContext::local()
                    }
                    Err(err) => {
                        warn!(error = %err, "Cloud project lookup failed, using local mode");
                        DeploymentContext::local()
                    }
                }
            })
            .await
            .clone()
    }

    /// The memoized context, if `resolve` already ran
    pub fn get(&self) -> Option<&DeploymentContext> {
        self.resolved.get()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts lookups and answers with a fixed result.
    #[derive(Clone)]
    pub(crate) struct FakeSource {
        pub calls: Arc<AtomicUsize>,
        pub answer: Option<&'static str>,
    }

    impl FakeSource {
        pub fn answering(answer: Option<&'static str>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                answer,
            }
        }
    }

    impl ProjectIdSource for FakeSource {
        async fn project_id(&self) -> Result<String, TelemetryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .map(str::to_string)
                .ok_or_else(|| TelemetryError::Config("metadata server unreachable".into()))
        }
    }

    #[test]
    fn local_context_uses_sentinel_project() {
        let cx = DeploymentContext::local();

        assert!(!cx.is_cloud());
        assert_eq!(cx.project_id(), LOCAL_PROJECT_ID);
    }

    #[test]
    fn cloud_context_with_blank_project_is_local() {
        assert_eq!(DeploymentContext::cloud("  "), DeploymentContext::local());
    }

    #[tokio::test]
    async fn disabled_flag_never_calls_source() {
        let source = FakeSource::answering(Some("my-project"));
        let resolver = EnvironmentResolver::new(false, source.clone());

        let cx = resolver.resolve().await;

        assert!(!cx.is_cloud());
        assert_eq!(cx.project_id(), LOCAL_PROJECT_ID);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enabled_flag_resolves_cloud_project() {
        let source = FakeSource::answering(Some("my-project"));
        let resolver = EnvironmentResolver::new(true, source);

        let cx = resolver.resolve().await;

        assert!(cx.is_cloud());
        assert_eq!(cx.project_id(), "my-project");
    }

    #[tokio::test]
    async fn failed_lookup_degrades_to_local() {
        let source = FakeSource::answering(None);
        let resolver = EnvironmentResolver::new(true, source);

        assert_eq!(resolver.resolve().await, DeploymentContext::local());
    }

    #[tokio::test]
    async fn empty_lookup_degrades_to_local() {
        let resolver = EnvironmentResolver::new(true, FakeSource::answering(Some("")));

        assert_eq!(resolver.resolve().await, DeploymentContext::local());
    }

    #[tokio::test]
    async fn resolution_is_memoized() {
        let source = FakeSource::answering(Some("my-project"));
        let resolver = EnvironmentResolver::new(true, source.clone());
        assert!(resolver.get().is_none());

        let first = resolver.resolve().await;
        let second = resolver.resolve().await;

        assert_eq!(first, second);
        assert_eq!(resolver.get(), Some(&first));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn override_replaces_looked_up_project() {
        let source = FakeSource::answering(Some("adc-project"));
        let resolver =
            EnvironmentResolver::new(true, source.clone()).with_project_override("pinned");

        let cx = resolver.resolve().await;

        assert!(cx.is_cloud());
        assert_eq!(cx.project_id(), "pinned");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn override_without_successful_lookup_stays_local() {
        let resolver =
            EnvironmentResolver::new(true, FakeSource::answering(None)).with_project_override("pinned");

        assert_eq!(resolver.resolve().await, DeploymentContext::local());
    }

    #[tokio::test]
    async fn override_is_ignored_when_flag_is_off() {
        let source = FakeSource::answering(Some("adc-project"));
        let resolver =
            EnvironmentResolver::new(false, source.clone()).with_project_override("pinned");

        assert_eq!(resolver.resolve().await, DeploymentContext::local());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
