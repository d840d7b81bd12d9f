use anyhow::Result;
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::{
    resource::{SERVICE_NAME, SERVICE_VERSION},
    SCHEMA_URL,
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const OTLP_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env_value(value: Option<String>) -> Self {
        match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("pretty") | Some("text") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

pub struct TelemetryConfig {
    pub service_name: String,
    pub otlp_endpoint: Option<String>,
    pub deployment_id: String,
    pub environment: String,
    pub service_version: String,
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            deployment_id: std::env::var("OTEL_DEPLOYMENT_ID")
                .unwrap_or_else(|_| ulid::Ulid::new().to_string()),
            environment: std::env::var("OTEL_DEPLOYMENT_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            service_version: std::env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_format: LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok()),
        }
    }

    fn resource(&self) -> Resource {
        Resource::from_schema_url(
            [
                KeyValue::new(SERVICE_NAME, self.service_name.clone()),
                KeyValue::new(SERVICE_VERSION, self.service_version.clone()),
                KeyValue::new("deployment.environment", self.environment.clone()),
                KeyValue::new("deployment.id", self.deployment_id.clone()),
            ],
            SCHEMA_URL,
        )
    }
}

/// Spans are always recorded locally; they are exported only when an OTLP
/// endpoint is configured.
fn build_tracer_provider(config: &TelemetryConfig) -> Result<TracerProvider> {
    let builder = TracerProvider::builder()
        .with_resource(config.resource())
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default());

    let Some(endpoint) = &config.otlp_endpoint else {
        return Ok(builder.build());
    };

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .with_timeout(OTLP_EXPORT_TIMEOUT)
        .build()?;

    Ok(builder
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .build())
}

/// Reads and writes W3C `traceparent`/`tracestate` headers.
pub fn install_trace_propagator() {
    global::set_text_map_propagator(TraceContextPropagator::new());
}

pub fn init_telemetry(config: TelemetryConfig) -> Result<()> {
    install_trace_propagator();
    let tracer_provider = build_tracer_provider(&config)?;
    global::set_tracer_provider(tracer_provider.clone());

    let tracer = tracer_provider.tracer(config.service_name.clone());
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("hyper=info".parse()?)
        .add_directive("reqwest=info".parse()?)
        .add_directive("tower_http=info".parse()?);

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .json()
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(fmt_layer)
        .init();

    tracing::info!(
        service_name = %config.service_name,
        deployment_id = %config.deployment_id,
        environment = %config.environment,
        log_format = ?config.log_format,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::info!("Shutting down telemetry");
    global::shutdown_tracer_provider();
}

pub mod middleware {
    use axum::{
        extract::{MatchedPath, Request},
        http::{HeaderName, HeaderValue},
        middleware::Next,
        response::Response,
    };
    use opentelemetry::{
        global,
        trace::{SpanKind, TraceContextExt, Tracer},
        Context,
    };
    use opentelemetry_http::HeaderExtractor;
    use tracing::Instrument;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

    /// Route template for span names, so ids in the path do not fan out
    /// into one span name per resource.
    fn route_of(request: &Request) -> String {
        request
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string())
    }

    /// Opens a server span per request, continuing any incoming trace
    /// context, and echoes the trace id back as `x-request-id`.
    pub async fn trace_layer(mut request: Request, next: Next) -> Response {
        let parent_context = global::get_text_map_propagator(|propagator| {
            propagator.extract(&HeaderExtractor(request.headers()))
        });

        let route = route_of(&request);
        let method = request.method().clone();

        let tracer = global::tracer("http-server");
        let span_builder = tracer
            .span_builder(format!("{} {}", method, route))
            .with_kind(SpanKind::Server);
        let context =
            Context::current_with_span(tracer.build_with_context(span_builder, &parent_context));

        // Query strings can carry search terms, so only the route is recorded.
        let tracing_span = tracing::info_span!("http_request", method = %method, route = %route);
        tracing_span.set_parent(context.clone());

        let request_id = context.span().span_context().trace_id().to_string();
        request.extensions_mut().insert(request_id.clone());

        let mut response = next.run(request).instrument(tracing_span.clone()).await;

        tracing_span.in_scope(|| {
            let status = response.status();
            if status.is_server_error() {
                tracing::warn!(status = status.as_u16(), request_id = %request_id, "Request failed");
            } else {
                tracing::info!(status = status.as_u16(), request_id = %request_id, "Request completed");
            }
        });

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}
