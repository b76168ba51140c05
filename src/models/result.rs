use serde::{Deserialize, Serialize};
use crate::core::percentile::{mean, percentile_sorted, sorted};
use crate::models::api_endpoint::HttpMethod;

/// Request volume. Percentiles are taken over the per-second request counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total_count: u64,
    pub average_rate: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl RequestStats {
    pub fn from_series(total_count: u64, duration_secs: f64, per_second: &[f64]) -> Self {
        let series = sorted(per_second);
        RequestStats {
            total_count,
            average_rate: if duration_secs > 0.0 {
                total_count as f64 / duration_secs
            } else {
                0.0
            },
            p50: percentile_sorted(&series, 50.0),
            p95: percentile_sorted(&series, 95.0),
            p99: percentile_sorted(&series, 99.0),
        }
    }
}

/// Milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub average: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let ordered = sorted(samples);
        LatencyStats {
            average: mean(samples),
            p50: percentile_sorted(&ordered, 50.0),
            p95: percentile_sorted(&ordered, 95.0),
            p99: percentile_sorted(&ordered, 99.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputStats {
    pub average_bytes_per_second: f64,
}

/// Outcome of one (endpoint, role) measurement window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub endpoint_path: String,
    pub http_method: HttpMethod,
    pub role_name: Option<String>,
    pub duration_seconds: f64,
    pub requests: RequestStats,
    pub latency: LatencyStats,
    pub throughput: ThroughputStats,
    pub error_count: u64,
    #[serde(rename = "status2xxCount")]
    pub status_2xx_count: u64,
    #[serde(rename = "status4xxCount")]
    pub status_4xx_count: u64,
    #[serde(rename = "status5xxCount")]
    pub status_5xx_count: u64,
}

impl TestResult {
    /// Transport errors over finished requests, as a fraction.
    pub fn error_rate(&self) -> f64 {
        self.error_count as f64 / self.requests.total_count.max(1) as f64
    }

    pub fn label(&self) -> String {
        match &self.role_name {
            Some(role) => format!("{} {} ({})", self.http_method, self.endpoint_path, role),
            None => format!("{} {}", self.http_method, self.endpoint_path),
        }
    }
}
