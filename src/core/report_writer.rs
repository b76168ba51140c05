use std::fmt::{self, Write};
use std::path::{Path, PathBuf};
use anyhow::Context;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use crate::models::report::{LoadTestReport, StressCurve};
use crate::models::result::TestResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub json: PathBuf,
}

/// RFC 3339 timestamp for the report body.
pub fn report_timestamp(now: OffsetDateTime) -> anyhow::Result<String> {
    now.format(&Rfc3339).context("formatting report timestamp")
}

/// Compact timestamp for file names, e.g. `20261018-143605`.
pub fn file_stamp(now: OffsetDateTime) -> anyhow::Result<String> {
    now.format(format_description!("[year][month][day]-[hour][minute][second]"))
        .context("formatting report file stamp")
}

/// Write `load-test-<stamp>.md` and `load-test-<stamp>.json` under `dir`.
pub async fn write_reports(
    report: &LoadTestReport,
    dir: &Path,
    stamp: &str,
) -> anyhow::Result<ReportPaths> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating reports directory {}", dir.display()))?;
    let paths = ReportPaths {
        markdown: dir.join(format!("load-test-{}.md", stamp)),
        json: dir.join(format!("load-test-{}.json", stamp)),
    };
    let json = serde_json::to_string_pretty(report).context("serializing report")?;
    tokio::fs::write(&paths.json, json)
        .await
        .with_context(|| format!("writing {}", paths.json.display()))?;
    tokio::fs::write(&paths.markdown, render_markdown(report))
        .await
        .with_context(|| format!("writing {}", paths.markdown.display()))?;
    Ok(paths)
}

pub fn render_markdown(report: &LoadTestReport) -> String {
    let mut out = String::new();
    // writing into a String cannot fail
    let _ = render(report, &mut out);
    out
}

fn render(report: &LoadTestReport, out: &mut String) -> fmt::Result {
    let s = &report.summary;
    writeln!(out, "# Load Test Report")?;
    writeln!(out)?;
    writeln!(out, "- **Generated:** {}", report.timestamp)?;
    writeln!(out, "- **Profile:** {}", report.profile)?;
    writeln!(out, "- **Target:** {}", report.target)?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Endpoints tested | {} |", s.total_endpoints_tested)?;
    writeln!(out, "| Total requests | {} |", s.total_requests)?;
    writeln!(out, "| Average latency | {:.2} ms |", s.overall_average_latency)?;
    writeln!(out, "| Error rate | {:.3}% |", s.overall_error_rate_percent)?;
    writeln!(out, "| Peak requests/sec | {:.2} |", s.max_requests_per_second)?;
    writeln!(out, "| WebSocket connections | {}/{} |", s.duplex_successful, s.duplex_attempted)?;
    writeln!(out)?;

    render_http_section(out, "Public Endpoints", &report.public_endpoints)?;
    render_http_section(out, "Authenticated Endpoints", &report.authenticated_endpoints)?;

    writeln!(out, "## WebSocket Connections")?;
    writeln!(out)?;
    if report.websocket.is_empty() {
        writeln!(out, "_No WebSocket results._")?;
    } else {
        writeln!(
            out,
            "| Role | Attempted | Connected | Failed | Sent | Received | Errors \
             | Avg (ms) | p95 (ms) | p99 (ms) |"
        )?;
        writeln!(out, "|---|---|---|---|---|---|---|---|---|---|")?;
        for m in &report.websocket {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.2} |",
                m.role_name,
                m.connections.attempted,
                m.connections.successful,
                m.connections.failed,
                m.events.sent,
                m.events.received,
                m.events.errors,
                m.latency.average,
                m.latency.p95,
                m.latency.p99
            )?;
        }
    }
    writeln!(out)?;

    if !report.stress_tests.is_empty() {
        writeln!(out, "## Stress Tests")?;
        writeln!(out)?;
        if let Some(curve) = &report.stress_tests.http {
            render_curve(out, curve, |r| {
                (r.requests.average_rate, r.latency.average, r.error_rate())
            })?;
        }
        if let Some(curve) = &report.stress_tests.duplex {
            render_curve(out, curve, |m| {
                (m.connections.successful as f64, m.latency.average, m.failure_rate())
            })?;
        }
    }

    writeln!(out, "## Bottlenecks")?;
    writeln!(out)?;
    if report.bottlenecks.is_empty() {
        writeln!(out, "No bottlenecks detected.")?;
    } else {
        for b in &report.bottlenecks {
            writeln!(
                out,
                "- {} **{}** `{}`: {}",
                b.severity.icon(),
                b.severity.as_str().to_uppercase(),
                b.subject_label,
                b.issue_description
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## Recommendations")?;
    writeln!(out)?;
    for advice in &report.recommendations {
        writeln!(out, "- {}", advice)?;
    }
    Ok(())
}

fn render_http_section(out: &mut String, title: &str, results: &[TestResult]) -> fmt::Result {
    writeln!(out, "## {}", title)?;
    writeln!(out)?;
    if results.is_empty() {
        writeln!(out, "_No results._")?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(
        out,
        "| Endpoint | Method | Role | Requests | Req/s | Avg (ms) | p50 (ms) | p95 (ms) \
         | p99 (ms) | Errors | 2xx | 4xx | 5xx | KB/s |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|---|---|---|---|---|---|")?;
    for r in results {
        writeln!(
            out,
            "| {} | {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} \
             | {} | {} | {} | {} | {:.2} |",
            r.endpoint_path,
            r.http_method,
            r.role_name.as_deref().unwrap_or("-"),
            r.requests.total_count,
            r.requests.average_rate,
            r.latency.average,
            r.latency.p50,
            r.latency.p95,
            r.latency.p99,
            r.error_count,
            r.status_2xx_count,
            r.status_4xx_count,
            r.status_5xx_count,
            r.throughput.average_bytes_per_second / 1024.0
        )?;
    }
    writeln!(out)
}

// columns: (throughput figure, avg latency, error rate fraction)
fn render_curve<T>(
    out: &mut String,
    curve: &StressCurve<T>,
    columns: impl Fn(&T) -> (f64, f64, f64),
) -> fmt::Result {
    writeln!(out, "### {}", curve.subject)?;
    writeln!(out)?;
    writeln!(out, "| Concurrency | Throughput | Avg (ms) | Error rate | Breached |")?;
    writeln!(out, "|---|---|---|---|---|")?;
    for level in &curve.levels {
        let (throughput, avg, error_rate) = columns(&level.result);
        writeln!(
            out,
            "| {} | {:.2} | {:.2} | {:.2}% | {} |",
            level.concurrency,
            throughput,
            avg,
            error_rate * 100.0,
            if level.breached { "yes" } else { "no" }
        )?;
    }
    writeln!(out)?;
    match curve.breaking_point {
        Some(level) => writeln!(out, "Breaking point: **{}** concurrent connections.", level)?,
        None => writeln!(out, "No breaking point reached.")?,
    }
    writeln!(out)
}
