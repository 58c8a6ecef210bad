use axum::{
    Router,
    http::{HeaderName, Request, Response},
};
use std::{net::SocketAddr, time::Duration};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

const REQUEST_ID_HEADER: &str = "x-request-id";

fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

/// Wraps a service router with request ids, tracing, a 1 MiB body limit and a
/// concurrency cap. `service` tags every request span and log line.
pub fn with_http_layers(router: Router, service: &'static str) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<_>| {
            tracing::info_span!(
                "http_request",
                service = %service,
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id(request)
            )
        })
        .on_request(move |request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                service = %service,
                request_id = %request_id(request),
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    router
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(ConcurrencyLimitLayer::new(100))
}

pub fn bind_addr(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((host.parse::<std::net::IpAddr>()?, port)))
}

/// Serves `app` on `addr` until Ctrl-C.
pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get};
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    type Fields = Arc<Mutex<Vec<(String, String)>>>;

    struct RecordSpanFields(Fields);

    impl<S: tracing::Subscriber> Layer<S> for RecordSpanFields {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            let mut fields = Collect(Vec::new());
            attrs.record(&mut fields);
            self.0.lock().unwrap().extend(fields.0);
        }
    }

    struct Collect(Vec<(String, String)>);

    impl Visit for Collect {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }
    }

    #[tokio::test]
    async fn request_span_names_the_service() {
        let fields = Fields::default();
        let subscriber = Registry::default().with(RecordSpanFields(fields.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = with_http_layers(Router::new().route("/health", get(|| async { "ok" })), "payment_service");
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let fields = fields.lock().unwrap();
        assert!(fields.contains(&("service".to_string(), "payment_service".to_string())));
        assert!(fields.iter().any(|(name, value)| name == "request_id" && value != "-"));
    }
}
