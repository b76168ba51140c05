use prettytable::{format, row, Cell, Row, Table};
use crate::models::report::LoadTestReport;

pub fn show_report_with_table(report: &LoadTestReport) {
    println!("Load test summary ({} profile, {}):", report.profile, report.target);
    summary_table(report).printstd();

    let results = results_table(report);
    if !results.is_empty() {
        println!("Endpoints:");
        results.printstd();
    }

    if !report.bottlenecks.is_empty() {
        println!("Bottlenecks:");
        bottleneck_table(report).printstd();
    }
}

fn summary_table(report: &LoadTestReport) -> Table {
    let s = &report.summary;
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(row!["Metric", "Value"]);
    table.add_row(row!["Endpoints tested", s.total_endpoints_tested]);
    table.add_row(row!["Total requests", s.total_requests]);
    table.add_row(row!["Average latency", format!("{:.2}ms", s.overall_average_latency)]);
    table.add_row(row!["Error rate", format!("{:.3}%", s.overall_error_rate_percent)]);
    table.add_row(row!["Peak RPS", format!("{:.2}", s.max_requests_per_second)]);
    table.add_row(row![
        "WebSocket connections",
        format!("{}/{}", s.duplex_successful, s.duplex_attempted)
    ]);
    if let Some(curve) = &report.stress_tests.http {
        table.add_row(row!["HTTP breaking point", breaking_point(curve.breaking_point)]);
    }
    if let Some(curve) = &report.stress_tests.duplex {
        table.add_row(row!["WebSocket breaking point", breaking_point(curve.breaking_point)]);
    }
    table
}

fn results_table(report: &LoadTestReport) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(row!["Endpoint", "Requests", "RPS", "Avg", "p95", "p99", "Errors"]);
    for r in report.all_http_results() {
        table.add_row(Row::new(vec![
            Cell::new(&r.label()),
            Cell::new(&r.requests.total_count.to_string()).style_spec("r"),
            Cell::new(&format!("{:.2}", r.requests.average_rate)).style_spec("r"),
            Cell::new(&format!("{:.2}ms", r.latency.average)).style_spec("r"),
            Cell::new(&format!("{:.2}ms", r.latency.p95)).style_spec("r"),
            Cell::new(&format!("{:.2}ms", r.latency.p99)).style_spec("r"),
            Cell::new(&r.error_count.to_string())
                .style_spec(if r.error_count > 0 { "rFr" } else { "r" }),
        ]));
    }
    for m in &report.websocket {
        table.add_row(Row::new(vec![
            Cell::new(&m.label()),
            Cell::new(&format!("{}/{} conn", m.connections.successful, m.connections.attempted))
                .style_spec("r"),
            Cell::new("-").style_spec("r"),
            Cell::new(&format!("{:.2}ms", m.latency.average)).style_spec("r"),
            Cell::new(&format!("{:.2}ms", m.latency.p95)).style_spec("r"),
            Cell::new(&format!("{:.2}ms", m.latency.p99)).style_spec("r"),
            Cell::new(&m.events.errors.to_string()).style_spec("r"),
        ]));
    }
    table
}

fn bottleneck_table(report: &LoadTestReport) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    for b in &report.bottlenecks {
        table.add_row(row![b.severity.icon(), b.subject_label, b.issue_description]);
    }
    table
}

fn breaking_point(level: Option<usize>) -> String {
    match level {
        Some(level) => format!("{} connections", level),
        None => "not reached".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Profile;
    use crate::models::report::{ReportSummary, StressReport};

    fn empty_report() -> LoadTestReport {
        LoadTestReport {
            timestamp: "2026-10-18T14:36:05Z".to_string(),
            profile: Profile::Quick,
            target: "http://localhost:3000".to_string(),
            summary: ReportSummary { total_requests: 42, ..ReportSummary::default() },
            public_endpoints: Vec::new(),
            authenticated_endpoints: Vec::new(),
            websocket: Vec::new(),
            stress_tests: StressReport::default(),
            bottlenecks: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn summary_rows() {
        let rendered = summary_table(&empty_report()).to_string();
        assert!(rendered.contains("Total requests"));
        assert!(rendered.contains("42"));
        assert!(!rendered.contains("breaking point"));
        assert!(results_table(&empty_report()).is_empty());
    }

    #[test]
    fn breaking_point_text() {
        assert_eq!(breaking_point(Some(150)), "150 connections");
        assert_eq!(breaking_point(None), "not reached");
    }
}
