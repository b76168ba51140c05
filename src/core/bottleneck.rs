use crate::models::bottleneck::{
    BottleneckInfo, Severity, SubjectKind, AVG_LATENCY_MS, CONNECTION_FAILURE_PERCENT,
    ERROR_RATE_PERCENT, P99_LATENCY_MS, STATUS_5XX,
};
use crate::models::duplex_metrics::DuplexMetrics;
use crate::models::result::TestResult;

const LATENCY_CRITICAL_MS: f64 = 1000.0;
const LATENCY_WARNING_MS: f64 = 500.0;
const P99_WARNING_MS: f64 = 2000.0;
const ERROR_RATE_CRITICAL: f64 = 0.05;
const ERROR_RATE_WARNING: f64 = 0.01;
const DUPLEX_FAILURE_CRITICAL: f64 = 0.25;
const DUPLEX_FAILURE_WARNING: f64 = 0.10;
const DUPLEX_LATENCY_WARNING_MS: f64 = 200.0;

/// Apply every threshold rule to every result; critical entries first, then
/// warnings, input order kept within a tier. All comparisons are strict.
pub fn detect_bottlenecks<'a>(
    http_results: impl IntoIterator<Item = &'a TestResult>,
    duplex_results: &[DuplexMetrics],
) -> Vec<BottleneckInfo> {
    let mut found = Vec::new();
    for result in http_results {
        check_http(result, &mut found);
    }
    for metrics in duplex_results {
        check_duplex(metrics, &mut found);
    }
    // sort_by_key is stable
    found.sort_by_key(|b| b.severity);
    found
}

fn check_http(result: &TestResult, found: &mut Vec<BottleneckInfo>) {
    let label = result.label();
    let avg = result.latency.average;
    if avg > LATENCY_CRITICAL_MS {
        found.push(
            BottleneckInfo::new(
                Severity::Critical,
                SubjectKind::Endpoint,
                &label,
                format!("Very high average latency: {:.1}ms", avg),
            )
            .metric(AVG_LATENCY_MS, avg),
        );
    } else if avg > LATENCY_WARNING_MS {
        found.push(
            BottleneckInfo::new(
                Severity::Warning,
                SubjectKind::Endpoint,
                &label,
                format!("High average latency: {:.1}ms", avg),
            )
            .metric(AVG_LATENCY_MS, avg),
        );
    }

    let p99 = result.latency.p99;
    if p99 > P99_WARNING_MS {
        found.push(
            BottleneckInfo::new(
                Severity::Warning,
                SubjectKind::Endpoint,
                &label,
                format!("High tail latency: p99 {:.1}ms", p99),
            )
            .metric(P99_LATENCY_MS, p99),
        );
    }

    let error_rate = result.error_rate();
    let severity = if error_rate > ERROR_RATE_CRITICAL {
        Some(Severity::Critical)
    } else if error_rate > ERROR_RATE_WARNING {
        Some(Severity::Warning)
    } else {
        None
    };
    if let Some(severity) = severity {
        found.push(
            BottleneckInfo::new(
                severity,
                SubjectKind::Endpoint,
                &label,
                format!(
                    "Error rate {:.2}% ({} of {} requests)",
                    error_rate * 100.0,
                    result.error_count,
                    result.requests.total_count
                ),
            )
            .metric(ERROR_RATE_PERCENT, error_rate * 100.0),
        );
    }

    if result.status_5xx_count > 0 {
        found.push(
            BottleneckInfo::new(
                Severity::Critical,
                SubjectKind::Endpoint,
                &label,
                format!("{} server errors (5xx)", result.status_5xx_count),
            )
            .metric(STATUS_5XX, result.status_5xx_count as f64),
        );
    }
}

fn check_duplex(metrics: &DuplexMetrics, found: &mut Vec<BottleneckInfo>) {
    let label = metrics.label();
    let failure_rate = metrics.failure_rate();
    let severity = if failure_rate > DUPLEX_FAILURE_CRITICAL {
        Some(Severity::Critical)
    } else if failure_rate > DUPLEX_FAILURE_WARNING {
        Some(Severity::Warning)
    } else {
        None
    };
    if let Some(severity) = severity {
        found.push(
            BottleneckInfo::new(
                severity,
                SubjectKind::Duplex,
                &label,
                format!(
                    "{} of {} connections failed ({:.1}%)",
                    metrics.connections.failed,
                    metrics.connections.attempted,
                    failure_rate * 100.0
                ),
            )
            .metric(CONNECTION_FAILURE_PERCENT, failure_rate * 100.0),
        );
    }

    let avg = metrics.latency.average;
    if avg > DUPLEX_LATENCY_WARNING_MS {
        found.push(
            BottleneckInfo::new(
                Severity::Warning,
                SubjectKind::Duplex,
                &label,
                format!("High WebSocket latency: {:.1}ms", avg),
            )
            .metric(AVG_LATENCY_MS, avg),
        );
    }
}
