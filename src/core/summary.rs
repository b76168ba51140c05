use crate::core::percentile::mean;
use crate::models::duplex_metrics::DuplexMetrics;
use crate::models::report::ReportSummary;
use crate::models::result::TestResult;

/// Run-level roll-up. The average latency is the plain mean of per-result averages.
pub fn summarize(
    public: &[TestResult],
    authenticated: &[TestResult],
    duplex: &[DuplexMetrics],
) -> ReportSummary {
    let http: Vec<&TestResult> = public.iter().chain(authenticated.iter()).collect();
    let total_requests: u64 = http.iter().map(|r| r.requests.total_count).sum();
    let total_errors: u64 = http.iter().map(|r| r.error_count).sum();
    let averages: Vec<f64> = http.iter().map(|r| r.latency.average).collect();

    ReportSummary {
        total_endpoints_tested: http.len(),
        total_requests,
        overall_average_latency: mean(&averages),
        overall_error_rate_percent: if total_requests > 0 {
            total_errors as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        },
        max_requests_per_second: http.iter().map(|r| r.requests.average_rate).fold(0.0, f64::max),
        duplex_attempted: duplex.iter().map(|d| d.connections.attempted).sum(),
        duplex_successful: duplex.iter().map(|d| d.connections.successful).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_endpoint::HttpMethod;
    use crate::models::duplex_metrics::{ConnectionStats, DuplexSamples, EventStats};
    use crate::models::result::{LatencyStats, RequestStats, ThroughputStats};

    fn result(total: u64, errors: u64, avg_ms: f64, rps: f64) -> TestResult {
        TestResult {
            endpoint_path: "/api/x".to_string(),
            http_method: HttpMethod::Get,
            role_name: None,
            duration_seconds: 10.0,
            requests: RequestStats {
                total_count: total,
                average_rate: rps,
                ..RequestStats::default()
            },
            latency: LatencyStats { average: avg_ms, ..LatencyStats::default() },
            throughput: ThroughputStats::default(),
            error_count: errors,
            status_2xx_count: total - errors,
            status_4xx_count: 0,
            status_5xx_count: 0,
        }
    }

    #[test]
    fn error_rate_spans_both_groups() {
        let public = [result(1000, 5, 100.0, 100.0)];
        let authenticated = [result(2000, 15, 300.0, 200.0)];
        let summary = summarize(&public, &authenticated, &[]);
        assert_eq!(summary.total_requests, 3000);
        assert_eq!(summary.total_endpoints_tested, 2);
        assert!((summary.overall_error_rate_percent - 20.0 / 3000.0 * 100.0).abs() < 1e-9);
        assert!((summary.overall_error_rate_percent - 0.667).abs() < 0.001);
        assert_eq!(summary.overall_average_latency, 200.0);
        assert_eq!(summary.max_requests_per_second, 200.0);
    }

    #[test]
    fn duplex_totals() {
        let duplex = DuplexMetrics::new(
            "student",
            ConnectionStats { attempted: 10, successful: 8, failed: 2 },
            EventStats::default(),
            DuplexSamples::default(),
            5.0,
        );
        let summary = summarize(&[], &[], &[duplex.clone(), duplex]);
        assert_eq!(summary.duplex_attempted, 20);
        assert_eq!(summary.duplex_successful, 16);
        assert_eq!(summary.total_requests, 0);
        assert_eq!(summary.overall_error_rate_percent, 0.0);
        assert_eq!(summary.overall_average_latency, 0.0);
    }
}
