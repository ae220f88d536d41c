//! HTTP front door for the Azure Functions custom handler
//!
//! With `enableForwardingHttpRequest` the Functions host forwards the HTTP
//! trigger request as-is to `{route}` on `FUNCTIONS_CUSTOMHANDLER_PORT` and
//! relays our response back to the caller.
//!
//! Routes:
//! - `POST {route}`: relay a telemetry batch
//! - `GET /health`: liveness

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::relay::{DownlinkRelay, RelayOutcome, BODY_ERROR_HANDLED};
use crate::ttn::DownlinkSink;

/// Header the Functions host stamps on forwarded requests
pub const INVOCATION_ID_HEADER: &str = "x-azure-functions-invocationid";
/// Per-batch tally on a processed response
pub const REPORT_HEADER: &str = "x-relay-report";
/// Reason a batch was answered "Error Handled"
pub const FAULT_HEADER: &str = "x-relay-fault";

impl IntoResponse for RelayOutcome {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::OK);

        // Status and body stay fixed; the detail rides along in a header
        let detail = match &self {
            RelayOutcome::NoData => None,
            RelayOutcome::Processed(report) => Some((
                REPORT_HEADER,
                format!(
                    "received={} delivered={} rejected={} failed={} skipped={}",
                    report.received,
                    report.delivered,
                    report.rejected,
                    report.failed,
                    report.skipped
                ),
            )),
            RelayOutcome::Faulted(e) => Some((FAULT_HEADER, e.to_string())),
        };

        let mut response = (status, self.body()).into_response();
        if let Some((name, value)) = detail {
            if let Ok(value) = HeaderValue::from_str(&value) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn relay_batch<S>(
    State(relay): State<Arc<DownlinkRelay<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> RelayOutcome
where
    S: DownlinkSink + 'static,
{
    let invocation_id = headers
        .get(INVOCATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!("invocation", %invocation_id);
    relay
        .handle(&body)
        .instrument(span)
        .await
}

/// A panic anywhere in the handler is still acknowledged as handled
fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("CRITICAL ERROR: relay handler panicked");
    (StatusCode::OK, BODY_ERROR_HANDLED).into_response()
}

/// Build the router around a relay
pub fn router<S>(relay: DownlinkRelay<S>, route: &str) -> Router
where
    S: DownlinkSink + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route(route, post(relay_batch::<S>))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(relay))
}

/// Serve until Ctrl+C or SIGTERM
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Ctrl+C received, shutting down..."),
        _ = terminate => info!("SIGTERM received, shutting down..."),
    }
}
