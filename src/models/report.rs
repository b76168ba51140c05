use serde::{Deserialize, Serialize};
use crate::models::bottleneck::BottleneckInfo;
use crate::models::duplex_metrics::DuplexMetrics;
use crate::models::profile::Profile;
use crate::models::result::TestResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_endpoints_tested: usize,
    pub total_requests: u64,
    pub overall_average_latency: f64,
    pub overall_error_rate_percent: f64,
    pub max_requests_per_second: f64,
    pub duplex_attempted: u64,
    pub duplex_successful: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressLevel<T> {
    pub concurrency: usize,
    pub result: T,
    pub breached: bool,
}

/// Capacity curve, truncated at the first breaching level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressCurve<T> {
    pub subject: String,
    pub levels: Vec<StressLevel<T>>,
    pub breaking_point: Option<usize>,
}

impl<T> StressCurve<T> {
    pub fn new(subject: String, levels: Vec<StressLevel<T>>) -> Self {
        let breaking_point = levels.iter().find(|l| l.breached).map(|l| l.concurrency);
        StressCurve { subject, levels, breaking_point }
    }

    pub fn highest_stable(&self) -> Option<usize> {
        self.levels.iter().filter(|l| !l.breached).map(|l| l.concurrency).max()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressReport {
    pub http: Option<StressCurve<TestResult>>,
    pub duplex: Option<StressCurve<DuplexMetrics>>,
}

impl StressReport {
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.duplex.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestReport {
    pub timestamp: String,
    pub profile: Profile,
    pub target: String,
    pub summary: ReportSummary,
    pub public_endpoints: Vec<TestResult>,
    pub authenticated_endpoints: Vec<TestResult>,
    pub websocket: Vec<DuplexMetrics>,
    pub stress_tests: StressReport,
    pub bottlenecks: Vec<BottleneckInfo>,
    pub recommendations: Vec<String>,
}

impl LoadTestReport {
    pub fn all_http_results(&self) -> impl Iterator<Item = &TestResult> {
        self.public_endpoints.iter().chain(self.authenticated_endpoints.iter())
    }
}
