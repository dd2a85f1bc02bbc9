use std::convert::Infallible;
use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};

use crate::telemetry::logger::{RequestLogger, SpanReference, TraceAwareLoggerFactory};

/// Attaches a [`RequestLogger`] to every request before the handler runs.
///
/// Register it inside `TracingLogger` so the request span is already current:
/// `App::new().wrap(TraceAwareLogger::new(factory)).wrap(TracingLogger::default())`.
#[derive(Clone)]
pub struct TraceAwareLogger {
    factory: Arc<TraceAwareLoggerFactory>,
}

impl TraceAwareLogger {
    pub fn new(factory: TraceAwareLoggerFactory) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TraceAwareLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceAwareLoggerService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceAwareLoggerService {
            service,
            factory: self.factory.clone(),
        }))
    }
}

pub struct TraceAwareLoggerService<S> {
    service: S,
    factory: Arc<TraceAwareLoggerFactory>,
}

impl<S, B> Service<ServiceRequest> for TraceAwareLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let logger = self.factory.logger_for(&SpanReference::current());
        req.extensions_mut().insert(logger);
        self.service.call(req)
    }
}

/// Logger attached to this request, or a plain one when the middleware did not run
pub fn get_logger(req: &HttpRequest) -> RequestLogger {
    req.extensions()
        .get::<RequestLogger>()
        .cloned()
        .unwrap_or_default()
}

impl FromRequest for RequestLogger {
    type Error = Infallible;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(get_logger(req)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::telemetry::environment::DeploymentContext;
    use crate::telemetry::logger::tests::{traced_context, SPAN_ID, TRACE_ID};
    use crate::telemetry::propagation::{install_propagator, DEFAULT_PROPAGATORS};
    use actix_web::{test, web, App, HttpResponse};
    use opentelemetry::trace::{TraceFlags, TracerProvider};
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use serde_json::{json, Value};
    use tracing_actix_web::TracingLogger;
    use tracing_subscriber::layer::SubscriberExt;

    /// Responds with the trace fields of the attached logger
    pub(crate) async fn echo(logger: RequestLogger) -> HttpResponse {
        logger.info("echo called");
        match logger.trace_fields() {
            Some(fields) => HttpResponse::Ok().json(json!({
                "trace": fields.trace,
                "spanId": fields.span_id,
                "sampled": fields.sampled,
            })),
            None => HttpResponse::Ok().json(json!({})),
        }
    }

    fn factory() -> TraceAwareLoggerFactory {
        TraceAwareLoggerFactory::new(DeploymentContext::local())
    }

    #[actix_web::test]
    async fn attached_logger_carries_call_trace() {
        let _cx = traced_context(TraceFlags::SAMPLED).attach();
        let app = test::init_service(
            App::new()
                .wrap(TraceAwareLogger::new(factory()))
                .route("/", web::get().to(echo)),
        )
        .await;

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;

        assert_eq!(body["trace"], format!("projects/local/traces/{}", TRACE_ID));
        assert_eq!(body["spanId"], SPAN_ID);
        assert_eq!(body["sampled"], true);
    }

    #[actix_web::test]
    async fn untraced_call_gets_plain_logger() {
        let app = test::init_service(
            App::new()
                .wrap(TraceAwareLogger::new(factory()))
                .route("/", web::get().to(echo)),
        )
        .await;

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;

        assert_eq!(body, json!({}));
    }

    #[actix_web::test]
    async fn missing_middleware_falls_back_to_plain_logger() {
        let _cx = traced_context(TraceFlags::SAMPLED).attach();
        let app = test::init_service(App::new().route("/", web::get().to(echo))).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({}));
    }

    #[actix_web::test]
    async fn get_logger_without_extension_is_plain() {
        let req = test::TestRequest::default().to_http_request();

        assert_eq!(get_logger(&req), RequestLogger::plain());
    }

    #[actix_web::test]
    async fn logger_follows_propagated_traceparent() {
        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("middleware-test")));
        let _subscriber = tracing::subscriber::set_default(subscriber);
        install_propagator(&DEFAULT_PROPAGATORS);

        let app = test::init_service(
            App::new()
                .wrap(TraceAwareLogger::new(factory()))
                .wrap(TracingLogger::default())
                .route("/", web::get().to(echo)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("traceparent", format!("00-{}-{}-01", TRACE_ID, SPAN_ID)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["trace"], format!("projects/local/traces/{}", TRACE_ID));
        assert_eq!(body["sampled"], true);
        // The server span is a child of the caller's span.
        let span_id = body["spanId"].as_str().unwrap();
        assert_eq!(span_id.len(), 16);
        assert_ne!(span_id, SPAN_ID);
    }
}
