//! Health check HTTP server for container orchestration
//!
//! Readiness follows the engine connection: the worker is ready once a
//! fetch-and-lock poll has succeeded recently.

use crate::observability::metrics::{metrics, MetricsSnapshot};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use warp::http::StatusCode;
use warp::Filter;

/// A poll older than this marks the engine connection unhealthy
const POLL_STALENESS_THRESHOLD_SECONDS: u64 = 120;

/// HTTP health check server
pub struct HealthServer {
    worker_id: String,
    port: u16,
}

impl HealthServer {
    pub fn new(worker_id: String, port: u16) -> Self {
        Self { worker_id, port }
    }

    /// Serve `/health`, `/metrics`, `/ready`, `/live` and `/` until the task is dropped
    pub async fn start(self: Arc<Self>) {
        let routes = self.routes();
        tracing::info!(port = self.port, "Starting health server");
        warp::serve(routes).run(([0, 0, 0, 0], self.port)).await;
    }

    fn routes(
        self: &Arc<Self>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let health_server = Arc::clone(self);

        let health_route = warp::path("health").and(warp::get()).and_then(move || {
            let server = Arc::clone(&health_server);
            async move {
                let status = server.health_status(&metrics().get_metrics(), current_timestamp());
                let code = if status.status == "healthy" {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&status), code))
            }
        });

        let metrics_route = warp::path("metrics").and(warp::get()).and_then(|| async {
            Ok::<_, Infallible>(warp::reply::json(&metrics().get_metrics()))
        });

        let ready_route = warp::path("ready").and(warp::get()).and_then(|| async {
            let now = current_timestamp();
            let check = engine_check(metrics().get_metrics().engine.last_successful_poll, now);
            let ready = check.status == "healthy";
            let response = ReadinessResponse {
                ready,
                timestamp: now,
            };
            let code = if ready {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&response), code))
        });

        let live_route = warp::path("live").and(warp::get()).and_then(|| async {
            Ok::<_, Infallible>(warp::reply::json(&LivenessResponse {
                alive: true,
                timestamp: current_timestamp(),
            }))
        });

        let root_route = warp::path::end().and(warp::get()).and_then(|| async {
            let endpoints = HashMap::from([
                ("/health", "Overall health status with detailed checks"),
                ("/metrics", "Task, engine and provider metrics"),
                ("/ready", "Readiness probe; ready after a recent successful poll"),
                ("/live", "Liveness probe"),
            ]);
            Ok::<_, Infallible>(warp::reply::json(&endpoints))
        });

        health_route
            .or(metrics_route)
            .or(ready_route)
            .or(live_route)
            .or(root_route)
    }

    fn health_status(&self, snapshot: &MetricsSnapshot, now: u64) -> HealthStatus {
        let mut checks = HashMap::new();
        checks.insert(
            "engine".to_string(),
            engine_check(snapshot.engine.last_successful_poll, now),
        );
        checks.insert(
            "worker".to_string(),
            worker_check(&snapshot.lifecycle.current_state, now),
        );

        let healthy = checks.values().all(|check| check.status == "healthy");

        HealthStatus {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            timestamp: now,
            worker_id: self.worker_id.clone(),
            uptime_seconds: snapshot.lifecycle.uptime_seconds,
            checks,
        }
    }
}

fn engine_check(last_successful_poll: u64, now: u64) -> HealthCheck {
    let (status, message) = if last_successful_poll == 0 {
        ("unhealthy", "No successful poll yet".to_string())
    } else {
        let age = now.saturating_sub(last_successful_poll);
        if age > POLL_STALENESS_THRESHOLD_SECONDS {
            ("unhealthy", format!("Last successful poll {age} seconds ago"))
        } else {
            ("healthy", "Engine reachable".to_string())
        }
    };

    HealthCheck {
        status: status.to_string(),
        message: Some(message),
        last_check: now,
    }
}

fn worker_check(state: &str, now: u64) -> HealthCheck {
    let status = if state == "running" { "healthy" } else { "unhealthy" };
    HealthCheck {
        status: status.to_string(),
        message: Some(format!("Worker state: {state}")),
        last_check: now,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
    pub last_check: u64,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: String,
    timestamp: u64,
    worker_id: String,
    uptime_seconds: u64,
    checks: HashMap<String, HealthCheck>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::MetricsCollector;

    #[test]
    fn test_engine_check() {
        let now = 10_000;
        assert_eq!(engine_check(0, now).status, "unhealthy");
        assert_eq!(engine_check(now - 5, now).status, "healthy");
        assert_eq!(engine_check(now - 600, now).status, "unhealthy");
        // Clock skew must not underflow
        assert_eq!(engine_check(now + 5, now).status, "healthy");
    }

    #[test]
    fn test_worker_check() {
        assert_eq!(worker_check("running", 1).status, "healthy");
        assert_eq!(worker_check("stopped", 1).status, "unhealthy");
    }

    #[test]
    fn test_overall_health_status() {
        let server = HealthServer::new("worker-1".to_string(), 8080);
        let collector = MetricsCollector::new();

        let status = server.health_status(&collector.get_metrics(), current_timestamp());
        assert_eq!(status.status, "degraded");
        assert_eq!(status.worker_id, "worker-1");

        collector.set_worker_state("running");
        collector.fetch_completed(0);
        let status = server.health_status(&collector.get_metrics(), current_timestamp());
        assert_eq!(status.status, "healthy");
        assert!(status.checks.contains_key("engine"));
        assert!(status.checks.contains_key("worker"));
    }

    #[tokio::test]
    async fn test_routes() {
        let server = Arc::new(HealthServer::new("worker-1".to_string(), 0));
        let routes = server.routes();

        let live = warp::test::request().path("/live").reply(&routes).await;
        assert_eq!(live.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(live.body()).unwrap();
        assert_eq!(body["alive"], true);

        let metrics = warp::test::request().path("/metrics").reply(&routes).await;
        assert_eq!(metrics.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(metrics.body()).unwrap();
        assert!(body["tasks"].is_object());
        assert!(body["engine"].is_object());

        let missing = warp::test::request().path("/nope").reply(&routes).await;
        assert_eq!(missing.status(), 404);
    }
}
