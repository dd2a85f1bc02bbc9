use std::sync::{Arc, RwLock};
use std::time::Duration;

use gcp_auth::TokenProvider;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::{debug, warn};

use crate::telemetry::error::TelemetryError;

const TRACE_SCOPE: &str = "https://www.googleapis.com/auth/trace.append";

/// gcp_auth caches tokens and renews them ahead of expiry, so polling it
/// well inside the one hour token lifetime keeps the header fresh.
const TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Look up the project id through Application Default Credentials.
///
/// On Cloud Run this queries the metadata server.
pub async fn project_id_from_adc() -> Result<String, TelemetryError> {
    let provider = gcp_auth::provider()
        .await
        .map_err(|e| TelemetryError::Auth(format!("Failed to create auth provider: {}", e)))?;

    let project_id = provider
        .project_id()
        .await
        .map_err(|e| TelemetryError::Auth(format!("Failed to resolve project id: {}", e)))?;

    Ok(project_id.to_string())
}

fn bearer(token: &str) -> Result<MetadataValue<Ascii>, TelemetryError> {
    MetadataValue::try_from(format!("Bearer {}", token))
        .map_err(|e| TelemetryError::Auth(format!("Invalid token format: {}", e)))
}

/// Attaches Cloud Trace credentials to every OTLP export request.
///
/// The bearer token is swapped in by a background task; the interceptor
/// itself only reads the latest value.
#[derive(Clone)]
pub struct GcpAuthInterceptor {
    authorization: Arc<RwLock<MetadataValue<Ascii>>>,
    user_project: Option<MetadataValue<Ascii>>,
}

impl GcpAuthInterceptor {
    /// Create the interceptor from Application Default Credentials
    pub async fn from_adc(project_id: String) -> Result<Self, TelemetryError> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| TelemetryError::Auth(format!("Failed to create auth provider: {}", e)))?;

        let token = provider
            .token(&[TRACE_SCOPE])
            .await
            .map_err(|e| TelemetryError::Auth(format!("Failed to get token: {}", e)))?;

        let user_project = if project_id.is_empty() {
            None
        } else {
            Some(
                MetadataValue::try_from(project_id.as_str())
                    .map_err(|e| TelemetryError::Auth(format!("Invalid project ID: {}", e)))?,
            )
        };

        let authorization = Arc::new(RwLock::new(bearer(token.as_str())?));
        spawn_refresh(provider, Arc::downgrade(&authorization));

        Ok(Self {
            authorization,
            user_project,
        })
    }
}

/// Refresh until every interceptor clone (and so the exporter) is gone.
fn spawn_refresh(
    provider: Arc<dyn TokenProvider>,
    authorization: std::sync::Weak<RwLock<MetadataValue<Ascii>>>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TOKEN_REFRESH_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(slot) = authorization.upgrade() else {
                debug!("Exporter dropped, stopping token refresh");
                return;
            };

            let refreshed = match provider.token(&[TRACE_SCOPE]).await {
                Ok(token) => bearer(token.as_str()),
                Err(e) => Err(TelemetryError::Auth(format!("Failed to refresh token: {}", e))),
            };

            match refreshed {
                Ok(value) => match slot.write() {
                    Ok(mut current) => *current = value,
                    Err(_) => {
                        warn!("Token slot poisoned, stopping token refresh");
                        return;
                    }
                },
                Err(err) => warn!(error = %err, "Keeping previous Cloud Trace token"),
            }
        }
    });
}

impl Interceptor for GcpAuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let authorization = self
            .authorization
            .read()
            .map_err(|_| Status::internal("Cloud Trace token unavailable"))?
            .clone();

        let metadata = request.metadata_mut();
        metadata.insert("authorization", authorization);
        if let Some(project) = &self.user_project {
            metadata.insert("x-goog-user-project", project.clone());
        }

        Ok(request)
    }
}
