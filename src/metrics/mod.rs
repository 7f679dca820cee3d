/*!
 * # Metrics Module
 *
 * In-process counters and histograms for the ERP API, exported in the
 * Prometheus text format at `/metrics`.
 *
 * - HTTP request metrics (count and latency per route and status class)
 * - Business counters (production entries, inventory adjustments, alerts)
 */

use dashmap::DashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

impl From<std::fmt::Error> for MetricsError {
    fn from(err: std::fmt::Error) -> Self {
        MetricsError::ExportError(err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Upper bounds (seconds) of the latency buckets.
const LATENCY_BUCKETS: [f64; 8] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0, 5.0];

#[derive(Debug, Clone)]
pub struct Histogram {
    buckets: Arc<[AtomicU64; LATENCY_BUCKETS.len()]>,
    sum_micros: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            buckets: Arc::new(std::array::from_fn(|_| AtomicU64::new(0))),
            sum_micros: Arc::new(AtomicU64::new(0)),
            count: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, duration: Duration) {
        let secs = duration.as_secs_f64();
        for (bound, bucket) in LATENCY_BUCKETS.iter().zip(self.buckets.iter()) {
            if secs <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.sum_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Cumulative bucket counts paired with their upper bound.
    pub fn buckets(&self) -> Vec<(f64, u64)> {
        LATENCY_BUCKETS
            .iter()
            .zip(self.buckets.iter())
            .map(|(bound, count)| (*bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Metric series are keyed by name plus a rendered label set.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<(String, String), Counter>,
    histograms: DashMap<(String, String), Histogram>,
}

fn render_labels(labels: &[(&str, &str)]) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",")
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Counter {
        self.counters
            .entry((name.to_string(), render_labels(labels)))
            .or_default()
            .clone()
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Histogram {
        self.histograms
            .entry((name.to_string(), render_labels(labels)))
            .or_default()
            .clone()
    }

    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let mut output = String::new();

        let mut counters: Vec<_> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().get()))
            .collect();
        counters.sort();
        let mut last_name = None;
        for ((name, labels), value) in counters {
            if last_name.as_ref() != Some(&name) {
                writeln!(output, "# TYPE {} counter", name)?;
                last_name = Some(name.clone());
            }
            if labels.is_empty() {
                writeln!(output, "{} {}", name, value)?;
            } else {
                writeln!(output, "{}{{{}}} {}", name, labels, value)?;
            }
        }

        let mut histograms: Vec<_> = self
            .histograms
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        histograms.sort_by(|a, b| a.0.cmp(&b.0));
        let mut last_name = None;
        for ((name, labels), histogram) in histograms {
            if last_name.as_ref() != Some(&name) {
                writeln!(output, "# TYPE {} histogram", name)?;
                last_name = Some(name.clone());
            }
            let sep = if labels.is_empty() { "" } else { "," };
            for (bound, count) in histogram.buckets() {
                writeln!(
                    output,
                    "{}_bucket{{{}{}le=\"{}\"}} {}",
                    name, labels, sep, bound, count
                )?;
            }
            writeln!(
                output,
                "{}_bucket{{{}{}le=\"+Inf\"}} {}",
                name,
                labels,
                sep,
                histogram.get_count()
            )?;
            writeln!(output, "{}_sum{{{}}} {}", name, labels, histogram.get_sum())?;
            writeln!(output, "{}_count{{{}}} {}", name, labels, histogram.get_count())?;
        }

        Ok(output)
    }
}

lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Records one completed HTTP request.
pub fn record_http_request(method: &str, route: &str, status: u16, duration: Duration) {
    let class = status_class(status);
    METRICS
        .counter(
            "http_requests_total",
            &[("method", method), ("route", route), ("status", class)],
        )
        .inc();
    METRICS
        .histogram(
            "http_request_duration_seconds",
            &[("method", method), ("route", route)],
        )
        .observe(duration);
}

/// Increments a label-less business counter such as `production_entries_recorded_total`.
pub fn increment_counter(name: &str) {
    METRICS.counter(name, &[]).inc();
}

pub async fn metrics_handler() -> Result<String, MetricsError> {
    METRICS.export_metrics()
}
