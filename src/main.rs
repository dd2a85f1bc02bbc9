use std::env;
use std::time::Duration;

use actix_web::{get, web, App, HttpResponse, HttpServer};
use cloudrun_observability::problem::ProblemDetail;
use cloudrun_observability::telemetry::{self, BoxError, RequestLogger, TelemetryConfig, TraceAwareLogger};
use serde::Deserialize;
use tracing::info;
use tracing_actix_web::TracingLogger;

const MAX_USER_LEN: usize = 64;
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct HelloQuery {
    user: Option<String>,
}

#[get("/")]
#[tracing::instrument(skip(query, logger), fields(user))]
async fn hello(
    query: web::Query<HelloQuery>,
    logger: RequestLogger,
) -> Result<HttpResponse, ProblemDetail> {
    let user = query.user.as_deref().unwrap_or("anonymous");
    if user.chars().count() > MAX_USER_LEN {
        logger.warn(format!("Rejected user name of {} chars", user.chars().count()));
        return Err(ProblemDetail::bad_request(format!(
            "user must be at most {} characters",
            MAX_USER_LEN
        )));
    }

    tracing::Span::current().record("user", user);
    logger.info(format!("Hello endpoint called by {}", user));
    Ok(HttpResponse::Ok().body(format!("Hello, {}!", user)))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

#[tokio::main]
async fn main() {
    let config = TelemetryConfig::from_env();
    let pipeline = telemetry::bootstrap_or_exit(&config).await;
    let factory = pipeline.logger_factory();

    let port: u16 = match env::var("PORT").ok().map(|p| p.parse()) {
        None => 8080,
        Some(Ok(port)) => port,
        Some(Err(err)) => {
            let invalid_port: BoxError = format!("PORT must be a number: {}", err).into();
            telemetry::safe_shutdown([
                Err(invalid_port),
                pipeline.shutdown(SHUTDOWN_DEADLINE).await.map_err(BoxError::from),
            ]);
            return;
        }
    };

    info!("Starting server on port {}", port);

    let served = match HttpServer::new(move || {
        App::new()
            .wrap(TraceAwareLogger::new(factory.clone()))
            .wrap(TracingLogger::default())
            .service(hello)
            .service(health)
    })
    .bind(("0.0.0.0", port))
    {
        Ok(server) => server.run().await,
        Err(err) => Err(err),
    };

    telemetry::safe_shutdown([
        served.map_err(BoxError::from),
        pipeline.shutdown(SHUTDOWN_DEADLINE).await.map_err(BoxError::from),
    ]);
}
