use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

// declaration order is the report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Critical => "🔴",
            Severity::Warning => "🟡",
            Severity::Info => "🔵",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Endpoint,
    Duplex,
}

pub const AVG_LATENCY_MS: &str = "avgLatencyMs";
pub const P99_LATENCY_MS: &str = "p99LatencyMs";
pub const ERROR_RATE_PERCENT: &str = "errorRatePercent";
pub const STATUS_5XX: &str = "status5xxCount";
pub const CONNECTION_FAILURE_PERCENT: &str = "connectionFailurePercent";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BottleneckInfo {
    pub severity: Severity,
    pub subject_kind: SubjectKind,
    pub subject_label: String,
    pub issue_description: String,
    pub numeric_metrics: BTreeMap<String, f64>,
}

impl BottleneckInfo {
    pub fn new(
        severity: Severity,
        subject_kind: SubjectKind,
        subject_label: &str,
        issue_description: String,
    ) -> Self {
        BottleneckInfo {
            severity,
            subject_kind,
            subject_label: subject_label.to_string(),
            issue_description,
            numeric_metrics: BTreeMap::new(),
        }
    }

    pub fn metric(mut self, name: &str, value: f64) -> Self {
        self.numeric_metrics.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.numeric_metrics.get(name).copied()
    }
}
