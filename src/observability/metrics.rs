//! Thread-safe metrics collection system
//!
//! Atomic counters plus a mutex-protected window of processing times, covering
//! task handling, the engine connection and the logistics provider.

use crate::processing::CompletionKind;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of processing time samples kept for percentiles
const MAX_TIMING_SAMPLES: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Thread-safe metrics collector using atomics and mutexes
pub struct MetricsCollector {
    // Task handling
    tasks_received: AtomicU64,
    tasks_in_flight: AtomicU64,
    completed_success: AtomicU64,
    completed_business_error: AtomicU64,
    completed_input_error: AtomicU64,
    failures_reported: AtomicU64,
    task_panics: AtomicU64,

    // Engine
    fetch_polls: AtomicU64,
    tasks_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    report_failures: AtomicU64,
    last_successful_poll: AtomicU64,

    // Logistics provider
    provider_requests: AtomicU64,
    provider_transport_errors: AtomicU64,

    processing_times: Mutex<Vec<u64>>, // in milliseconds

    // Lifecycle
    worker_state: Mutex<String>,
    uptime_start: AtomicU64,
    state_transitions: AtomicU64,
    health_status: AtomicBool,
    last_health_check: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let now = current_timestamp();
        Self {
            tasks_received: AtomicU64::new(0),
            tasks_in_flight: AtomicU64::new(0),
            completed_success: AtomicU64::new(0),
            completed_business_error: AtomicU64::new(0),
            completed_input_error: AtomicU64::new(0),
            failures_reported: AtomicU64::new(0),
            task_panics: AtomicU64::new(0),
            fetch_polls: AtomicU64::new(0),
            tasks_fetched: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            report_failures: AtomicU64::new(0),
            last_successful_poll: AtomicU64::new(0),
            provider_requests: AtomicU64::new(0),
            provider_transport_errors: AtomicU64::new(0),
            processing_times: Mutex::new(Vec::new()),
            worker_state: Mutex::new("initializing".to_string()),
            uptime_start: AtomicU64::new(now),
            state_transitions: AtomicU64::new(0),
            health_status: AtomicBool::new(false),
            last_health_check: AtomicU64::new(0),
        }
    }

    // Task metrics
    pub fn task_received(&self) {
        self.tasks_received.fetch_add(1, Ordering::Relaxed);
        self.tasks_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_completed(&self, kind: CompletionKind, duration: Duration) {
        let counter = match kind {
            CompletionKind::Success => &self.completed_success,
            CompletionKind::BusinessError => &self.completed_business_error,
            CompletionKind::InputError => &self.completed_input_error,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.task_finished(duration);
    }

    pub fn task_failure_reported(&self, duration: Duration) {
        self.failures_reported.fetch_add(1, Ordering::Relaxed);
        self.task_finished(duration);
    }

    /// A processing task panicked; its failure is counted separately
    pub fn task_panicked(&self) {
        self.task_panics.fetch_add(1, Ordering::Relaxed);
    }

    fn task_finished(&self, duration: Duration) {
        // Saturating so a reset during processing cannot wrap the gauge
        let _ = self
            .tasks_in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
        self.record_processing_time(duration);
    }

    fn record_processing_time(&self, duration: Duration) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(duration.as_millis() as u64);

            if times.len() > MAX_TIMING_SAMPLES {
                times.remove(0);
            }
        }
    }

    // Engine metrics
    pub fn fetch_completed(&self, fetched: usize) {
        self.fetch_polls.fetch_add(1, Ordering::Relaxed);
        self.tasks_fetched
            .fetch_add(fetched as u64, Ordering::Relaxed);
        let now = current_timestamp();
        self.last_successful_poll.store(now, Ordering::Relaxed);
        self.update_health_status(true, now);
    }

    pub fn fetch_failed(&self) {
        self.fetch_polls.fetch_add(1, Ordering::Relaxed);
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        self.update_health_status(false, current_timestamp());
    }

    /// The engine refused a completion or failure report
    pub fn report_failed(&self) {
        self.report_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Provider metrics
    pub fn provider_request_sent(&self) {
        self.provider_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_transport_error(&self) {
        self.provider_transport_errors
            .fetch_add(1, Ordering::Relaxed);
    }

    // Lifecycle metrics
    pub fn set_worker_state(&self, state: &str) {
        if let Ok(mut current_state) = self.worker_state.lock() {
            if *current_state != state {
                self.state_transitions.fetch_add(1, Ordering::Relaxed);
                *current_state = state.to_string();
            }
        }
    }

    /// Engine health as of the most recent poll
    fn update_health_status(&self, healthy: bool, now: u64) {
        self.health_status.store(healthy, Ordering::Relaxed);
        self.last_health_check.store(now, Ordering::Relaxed);
    }

    // Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.tasks_received,
            &self.tasks_in_flight,
            &self.completed_success,
            &self.completed_business_error,
            &self.completed_input_error,
            &self.failures_reported,
            &self.task_panics,
            &self.fetch_polls,
            &self.tasks_fetched,
            &self.fetch_failures,
            &self.report_failures,
            &self.last_successful_poll,
            &self.provider_requests,
            &self.provider_transport_errors,
            &self.state_transitions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }

        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);
        self.update_health_status(false, 0);

        if let Ok(mut times) = self.processing_times.lock() {
            times.clear();
        }
        if let Ok(mut state) = self.worker_state.lock() {
            *state = "initializing".to_string();
        }
    }

    /// Average and p50/p95/p99 of the recorded processing times
    fn processing_time_statistics(&self) -> (f64, f64, f64, f64) {
        let Ok(times) = self.processing_times.lock() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut sorted_times = times.clone();
        sorted_times.sort_unstable();

        let avg = sorted_times.iter().sum::<u64>() as f64 / sorted_times.len() as f64;
        (
            avg,
            percentile(&sorted_times, 50.0),
            percentile(&sorted_times, 95.0),
            percentile(&sorted_times, 99.0),
        )
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95, p99) = self.processing_time_statistics();

        let current_state = self
            .worker_state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|_| "unknown".to_string());

        MetricsSnapshot {
            tasks: TaskMetrics {
                tasks_received: self.tasks_received.load(Ordering::Relaxed),
                tasks_in_flight: self.tasks_in_flight.load(Ordering::Relaxed),
                completed_success: self.completed_success.load(Ordering::Relaxed),
                completed_business_error: self.completed_business_error.load(Ordering::Relaxed),
                completed_input_error: self.completed_input_error.load(Ordering::Relaxed),
                failures_reported: self.failures_reported.load(Ordering::Relaxed),
                panics: self.task_panics.load(Ordering::Relaxed),
                avg_processing_time_ms: avg,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
                processing_time_p99_ms: p99,
            },
            engine: EngineMetrics {
                fetch_polls: self.fetch_polls.load(Ordering::Relaxed),
                tasks_fetched: self.tasks_fetched.load(Ordering::Relaxed),
                fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
                report_failures: self.report_failures.load(Ordering::Relaxed),
                last_successful_poll: self.last_successful_poll.load(Ordering::Relaxed),
            },
            provider: ProviderMetrics {
                requests_sent: self.provider_requests.load(Ordering::Relaxed),
                transport_errors: self.provider_transport_errors.load(Ordering::Relaxed),
            },
            lifecycle: LifecycleMetrics {
                current_state,
                uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
                state_transitions: self.state_transitions.load(Ordering::Relaxed),
                healthy: self.health_status.load(Ordering::Relaxed),
                last_health_check: self.last_health_check.load(Ordering::Relaxed),
            },
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub tasks: TaskMetrics,
    pub engine: EngineMetrics,
    pub provider: ProviderMetrics,
    pub lifecycle: LifecycleMetrics,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct TaskMetrics {
    pub tasks_received: u64,
    pub tasks_in_flight: u64,
    pub completed_success: u64,
    pub completed_business_error: u64,
    pub completed_input_error: u64,
    pub failures_reported: u64,
    pub panics: u64,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub processing_time_p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct EngineMetrics {
    pub fetch_polls: u64,
    pub tasks_fetched: u64,
    pub fetch_failures: u64,
    pub report_failures: u64,
    pub last_successful_poll: u64,
}

#[derive(Debug, Serialize)]
pub struct ProviderMetrics {
    pub requests_sent: u64,
    pub transport_errors: u64,
}

#[derive(Debug, Serialize)]
pub struct LifecycleMetrics {
    pub current_state: String,
    pub uptime_seconds: u64,
    pub state_transitions: u64,
    pub healthy: bool,
    pub last_health_check: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let len = sorted_data.len();
    let index = (percentile / 100.0) * (len - 1) as f64;

    if index.fract() == 0.0 {
        sorted_data[index as usize] as f64
    } else {
        let lower_value = sorted_data[index.floor() as usize] as f64;
        let upper_value = sorted_data[index.ceil() as usize] as f64;

        lower_value + (upper_value - lower_value) * index.fract()
    }
}
