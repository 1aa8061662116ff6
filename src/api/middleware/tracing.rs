//! Per-request spans for the HTTP edge.

use axum::body::Body;
use axum::http::{Request, header};
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse,
    TraceLayer,
};
use tracing::{Level, Span};

/// Trace layer type returned by [`layer`].
pub type HttpTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    DefaultOnRequest,
    DefaultOnResponse,
    DefaultOnBodyChunk,
    DefaultOnEos,
    DefaultOnFailure,
>;

/// Builds the request tracing layer.
///
/// Each request gets an `http` span carrying the method, path and a
/// truncated user agent; responses are logged at `INFO` with latency in
/// milliseconds and 5xx responses additionally at `ERROR`.
///
/// ```text
/// INFO http{method=GET path=/abc123 ua="curl/8.0"}: finished processing request latency=3 ms status=302
/// ```
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request<Body>) -> Span)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}

const MAX_UA_IN_SPAN: usize = 64;

fn request_span(request: &Request<Body>) -> Span {
    let ua = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|ua| ua.chars().take(MAX_UA_IN_SPAN).collect::<String>())
        .unwrap_or_default();

    tracing::info_span!(
        "http",
        method = %request.method(),
        path = %request.uri().path(),
        ua = %ua,
    )
}
