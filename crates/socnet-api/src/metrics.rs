// Prometheus metrics
// Decision: Served on a separate listener so scrapes never compete with the worker queue
// Decision: Latency is recorded for successful requests only

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use socnet_pool::{PoolStats, WorkerPool};

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUESTS_FAILED_TOTAL: &str = "http_requests_failed_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const REQUESTS_TO_HOST_TOTAL: &str = "http_requests_to_host_total";

pub const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.5, 1.0, 2.0, 5.0];

/// Install the global Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )
        .context("Invalid latency buckets")?
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    describe();
    Ok(handle)
}

fn describe() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Number of HTTP requests");
    metrics::describe_counter!(REQUESTS_FAILED_TOTAL, "Number of failed HTTP requests");
    metrics::describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request latencies in seconds"
    );
    metrics::describe_counter!(
        REQUESTS_TO_HOST_TOTAL,
        "Number of requests to each database host"
    );
    metrics::describe_gauge!("worker_pool_tasks_total", "Tasks submitted to the worker pool");
    metrics::describe_gauge!("worker_pool_tasks_completed", "Tasks run by the worker pool");
    metrics::describe_gauge!("worker_pool_tasks_refused", "Tasks refused by the worker pool");
    metrics::describe_gauge!("worker_pool_tasks_queued", "Tasks waiting in the worker pool queue");
}

/// Router exposing `/metrics`
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || std::future::ready(handle.render())),
    )
}

/// Serve `/metrics` on its own listener
pub async fn serve(addr: SocketAddr, handle: PrometheusHandle) -> Result<()> {
    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics listener on {addr}"))?;
    tracing::info!("Metrics server listening on {}", addr);

    axum::serve(listener, router(handle))
        .await
        .context("Metrics server error")
}

/// Count and time requests per matched route
pub async fn track_requests(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let endpoint = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => req.uri().path().to_owned(),
    };

    let response = next.run(req).await;

    metrics::counter!(REQUESTS_TOTAL, "endpoint" => endpoint.clone()).increment(1);
    if response.status().is_success() {
        metrics::histogram!(REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
            .record(start.elapsed().as_secs_f64());
    } else {
        metrics::counter!(REQUESTS_FAILED_TOTAL, "endpoint" => endpoint).increment(1);
    }

    response
}

/// Publish worker pool counters as gauges
pub fn record_worker_pool(stats: &PoolStats) {
    metrics::gauge!("worker_pool_tasks_total").set(stats.last_id as f64);
    metrics::gauge!("worker_pool_tasks_completed").set(stats.completed as f64);
    metrics::gauge!("worker_pool_tasks_refused").set(stats.refused as f64);
    metrics::gauge!("worker_pool_tasks_queued").set(stats.queued as f64);
}

/// Sample worker pool counters until the task is aborted
pub async fn sample_worker_pool(workers: Arc<WorkerPool>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        record_worker_pool(&workers.stats());
    }
}
