//! Liveness endpoint and Prometheus metrics for the funnel bot.
//!
//! Exposes:
//! - `GET /health` for the hosting platform's liveness probe
//! - `GET /metrics` with
//!   - `funnel_events_total` (counter by event kind)
//!   - `funnel_transitions_total` (counter by from/to state)
//!   - `funnel_leads_total` (counter by persistence status)
//!   - `funnel_sessions` (gauge)
//!   - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec,
    IntGauge, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::funnel::State;

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "funnel_events_total",
        "Inbound funnel events by kind",
        &["event"]
    )
    .expect("failed to register event counter")
});

static TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "funnel_transitions_total",
        "Funnel state transitions",
        &["from", "to"]
    )
    .expect("failed to register transition counter")
});

static LEADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "funnel_leads_total",
        "Finalized leads by persistence status",
        &["status"]
    )
    .expect("failed to register lead counter")
});

static SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("funnel_sessions", "Sessions held in memory")
        .expect("failed to register sessions gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&EVENTS_TOTAL);
    Lazy::force(&TRANSITIONS_TOTAL);
    Lazy::force(&LEADS_TOTAL);
    Lazy::force(&SESSIONS);
}

/// Count one handled event and the transition it caused.
pub fn record_event(kind: &'static str, from: State, to: State) {
    init_collectors();
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
    TRANSITIONS_TOTAL
        .with_label_values(&[from.as_str(), to.as_str()])
        .inc();
}

/// `status` is one of `persisted`, `dropped`, `failed`.
pub fn record_lead(status: &'static str) {
    init_collectors();
    LEADS_TOTAL.with_label_values(&[status]).inc();
}

pub fn set_sessions(count: usize) {
    init_collectors();
    SESSIONS.set(i64::try_from(count).unwrap_or(i64::MAX));
}

fn plain(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

async fn metrics_response() -> Result<Response<Full<Bytes>>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "encode error"));
    }

    let mut response = plain(StatusCode::OK, buffer);
    if let Ok(value) = encoder.format_type().parse() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, value);
    }
    Ok(response)
}

async fn route(path: &str) -> Result<Response<Full<Bytes>>, Infallible> {
    match path {
        "/health" | "/" => Ok(plain(StatusCode::OK, "OK")),
        "/metrics" => metrics_response().await,
        _ => Ok(plain(StatusCode::NOT_FOUND, Bytes::new())),
    }
}

async fn handle_request(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    route(req.uri().path()).await
}

async fn serve(listener: TcpListener) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service_fn(handle_request);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                warn!(?peer, "Health connection error: {}", err);
            }
        });
    }
}

/// Bind the health/metrics endpoint and serve it in the background.
pub async fn spawn_health_server(addr: SocketAddr) -> anyhow::Result<SocketAddr> {
    init_collectors();
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "Health endpoint started");

    tokio::spawn(async move {
        if let Err(err) = serve(listener).await {
            error!(addr = %bound, "Health server failed: {}", err);
        }
    });
    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn records_transitions_by_state() {
        record_event("restart", State::Idle, State::Engaged);

        assert!(EVENTS_TOTAL.with_label_values(&["restart"]).get() >= 1);
        assert!(
            TRANSITIONS_TOTAL
                .with_label_values(&["idle", "engaged"])
                .get()
                >= 1
        );
    }

    #[test]
    fn records_lead_statuses_separately() {
        let before = LEADS_TOTAL.with_label_values(&["dropped"]).get();
        record_lead("dropped");
        assert!(LEADS_TOTAL.with_label_values(&["dropped"]).get() >= before + 1);
    }

    #[test]
    fn sessions_gauge_tracks_count() {
        set_sessions(12);
        assert_eq!(SESSIONS.get(), 12);
    }

    #[test]
    fn init_collectors_can_be_called_multiple_times() {
        init_collectors();
        init_collectors();
    }

    #[tokio::test]
    async fn health_route_answers_ok() {
        let response = route("/health").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = route("/admin").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_route_exposes_funnel_counters() {
        record_event("text", State::AwaitingEmail, State::Completed);

        let response = route("/metrics").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(hyper::header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.contains("text/plain"));

        let text = body_text(response).await;
        assert!(text.contains("funnel_events_total"));
        assert!(text.contains("awaiting_email"));
    }

    #[tokio::test]
    async fn server_serves_health_over_tcp() {
        let addr = spawn_health_server("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();

        let body = reqwest::get(format!("http://{}/health", addr))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "OK");
    }
}
