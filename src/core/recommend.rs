use std::collections::HashSet;
use crate::models::bottleneck::{
    BottleneckInfo, SubjectKind, AVG_LATENCY_MS, ERROR_RATE_PERCENT, P99_LATENCY_MS,
};

const LATENCY_FLAG_MS: f64 = 500.0;
const ERROR_RATE_FLAG_PERCENT: f64 = 5.0;

const LATENCY_ADVICE: &[&str] = &[
    "Cache frequently read data (class lists, announcements) in Redis or an in-process cache",
    "Add database indexes for the columns used in slow endpoint filters and joins",
    "Paginate large list endpoints instead of returning whole tables",
    "Profile slow queries and eliminate N+1 query patterns",
];

const ERROR_ADVICE: &[&str] = &[
    "Add retry with exponential backoff for transient upstream failures",
    "Introduce rate limiting so overload degrades into 429s instead of failures",
    "Increase the database connection pool size and review pool timeouts",
    "Scale horizontally behind a load balancer",
];

const DUPLEX_ADVICE: &[&str] = &[
    "Use a shared pub/sub adapter (e.g. Redis) so WebSocket connections spread across instances",
    "Tune heartbeat/ping intervals to drop dead connections promptly",
    "Batch pushed events instead of emitting one message per change",
    "Raise file descriptor and connection limits on the WebSocket host",
];

const BASELINE_ADVICE: &[&str] = &[
    "Enable response compression (gzip/brotli)",
    "Serve static assets from a CDN",
    "Set up continuous monitoring and alerting on latency and error rates",
    "Scale horizontally behind a load balancer",
];

/// Remediation text for the detected bottlenecks, baseline advice last, no duplicates.
pub fn recommendations(bottlenecks: &[BottleneckInfo]) -> Vec<String> {
    let high_latency = bottlenecks.iter().any(|b| {
        [AVG_LATENCY_MS, P99_LATENCY_MS]
            .iter()
            .filter_map(|name| b.get(name))
            .any(|ms| ms > LATENCY_FLAG_MS)
    });
    let high_error_rate = bottlenecks
        .iter()
        .any(|b| b.get(ERROR_RATE_PERCENT).is_some_and(|rate| rate > ERROR_RATE_FLAG_PERCENT));
    let duplex_issues = bottlenecks.iter().any(|b| b.subject_kind == SubjectKind::Duplex);

    let mut blocks: Vec<&[&str]> = Vec::new();
    if high_latency {
        blocks.push(LATENCY_ADVICE);
    }
    if high_error_rate {
        blocks.push(ERROR_ADVICE);
    }
    if duplex_issues {
        blocks.push(DUPLEX_ADVICE);
    }
    blocks.push(BASELINE_ADVICE);

    let mut seen = HashSet::new();
    blocks
        .into_iter()
        .flat_map(|block| block.iter())
        .filter(|advice| seen.insert(**advice))
        .map(|advice| advice.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bottleneck::Severity;

    fn latency(label: &str, ms: f64) -> BottleneckInfo {
        BottleneckInfo::new(Severity::Critical, SubjectKind::Endpoint, label, "slow".to_string())
            .metric(AVG_LATENCY_MS, ms)
    }

    fn errors(label: &str, percent: f64) -> BottleneckInfo {
        BottleneckInfo::new(Severity::Critical, SubjectKind::Endpoint, label, "failing".to_string())
            .metric(ERROR_RATE_PERCENT, percent)
    }

    #[test]
    fn baseline_only_without_bottlenecks() {
        let advice = recommendations(&[]);
        assert_eq!(advice.len(), BASELINE_ADVICE.len());
        assert_eq!(advice[0], BASELINE_ADVICE[0]);
    }

    #[test]
    fn repeated_flags_yield_no_duplicates() {
        let found = vec![
            latency("GET /api/classes", 1200.0),
            errors("GET /api/classes", 12.0),
            latency("GET /api/grades", 800.0),
            errors("GET /api/grades", 7.5),
        ];
        let advice = recommendations(&found);
        let unique: HashSet<&String> = advice.iter().collect();
        assert_eq!(unique.len(), advice.len());
        // latency, errors and baseline share one scaling line
        assert_eq!(
            advice.len(),
            LATENCY_ADVICE.len() + ERROR_ADVICE.len() + BASELINE_ADVICE.len() - 1
        );
        assert_eq!(advice[0], LATENCY_ADVICE[0]);
    }

    #[test]
    fn warning_level_error_rate_does_not_flag() {
        let advice = recommendations(&[errors("GET /api/health", 3.0)]);
        assert_eq!(advice.len(), BASELINE_ADVICE.len());
    }

    #[test]
    fn duplex_entry_adds_connection_advice() {
        let entry = BottleneckInfo::new(
            Severity::Warning,
            SubjectKind::Duplex,
            "WebSocket (student)",
            "15 of 100 connections failed".to_string(),
        );
        let advice = recommendations(&[entry]);
        assert!(advice.iter().any(|a| a == DUPLEX_ADVICE[1]));
        assert!(!advice.iter().any(|a| a == LATENCY_ADVICE[0]));
    }
}
