use anyhow::{anyhow, Context};
use reqwest::Url;
use time::OffsetDateTime;
use tokio::net::lookup_host;
use tracing::{debug, info, warn};
use crate::core::bottleneck::detect_bottlenecks;
use crate::core::check_target::check_target;
use crate::core::execute::{self, LoadRequest};
use crate::core::recommend::recommendations;
use crate::core::report_writer::{file_stamp, report_timestamp, write_reports, ReportPaths};
use crate::core::sleep_guard::SleepGuard;
use crate::core::stress::escalate;
use crate::core::summary::summarize;
use crate::core::{duplex, provision};
use crate::models::duplex_metrics::DuplexMetrics;
use crate::models::profile::RunConfig;
use crate::models::report::{LoadTestReport, StressCurve, StressLevel, StressReport};
use crate::models::result::TestResult;
use crate::models::role_credential::SessionMap;
use crate::models::setup::TargetConfig;

/// A finished run: the report and where it was written.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: LoadTestReport,
    pub paths: ReportPaths,
}

/// Execute every enabled phase in order, then analyse and persist the report.
/// Only an invalid configuration, an unresolvable target or a failed report
/// write end the run with an error.
pub async fn run(config: &RunConfig, target: &TargetConfig) -> anyhow::Result<RunOutcome> {
    check_target(target, config).context("invalid target configuration")?;
    preflight(&target.base_url).await?;
    let _sleep_guard = SleepGuard::new(config.keep_awake);

    info!(profile = %config.profile, target = %target.base_url, "load test started");

    let needs_sessions =
        config.authenticated.enabled || config.duplex.enabled || config.stress.enabled;
    let sessions = if needs_sessions {
        provision::provision_sessions(target).await?
    } else {
        SessionMap::new()
    };

    let public_endpoints = if config.public.enabled {
        run_public_phase(config, target).await
    } else {
        Vec::new()
    };
    let authenticated_endpoints = if config.authenticated.enabled {
        run_authenticated_phase(config, target, &sessions).await
    } else {
        Vec::new()
    };
    let websocket = if config.duplex.enabled {
        run_duplex_phase(config, target, &sessions).await
    } else {
        Vec::new()
    };
    let stress_tests = if config.stress.enabled {
        run_stress_phase(config, target, &sessions).await
    } else {
        StressReport::default()
    };

    let bottlenecks = detect_bottlenecks(
        public_endpoints.iter().chain(authenticated_endpoints.iter()),
        &websocket,
    );
    let recommendations = recommendations(&bottlenecks);
    let summary = summarize(&public_endpoints, &authenticated_endpoints, &websocket);

    let now = OffsetDateTime::now_utc();
    let report = LoadTestReport {
        timestamp: report_timestamp(now)?,
        profile: config.profile,
        target: target.base_url.clone(),
        summary,
        public_endpoints,
        authenticated_endpoints,
        websocket,
        stress_tests,
        bottlenecks,
        recommendations,
    };
    let paths = write_reports(&report, &config.reports_dir, &file_stamp(now)?).await?;
    info!(
        markdown = %paths.markdown.display(),
        json = %paths.json.display(),
        bottlenecks = report.bottlenecks.len(),
        "report written"
    );
    Ok(RunOutcome { report, paths })
}

/// Resolve the target host once; a target that cannot be resolved makes every
/// phase meaningless.
pub async fn preflight(base_url: &str) -> anyhow::Result<()> {
    let url = Url::parse(base_url).with_context(|| format!("invalid base url {}", base_url))?;
    let host = url.host_str().ok_or_else(|| anyhow!("base url has no host: {}", base_url))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| anyhow!("base url has no port: {}", base_url))?;
    let mut addrs = lookup_host((host, port))
        .await
        .with_context(|| format!("cannot resolve target host {}", host))?;
    let first = addrs
        .next()
        .ok_or_else(|| anyhow!("target host {} resolved to no addresses", host))?;
    debug!(%first, "target resolved");
    Ok(())
}

async fn run_public_phase(config: &RunConfig, target: &TargetConfig) -> Vec<TestResult> {
    info!(endpoints = target.public_endpoints.len(), "public phase");
    let mut results = Vec::new();
    for endpoint in &target.public_endpoints {
        let request = LoadRequest { base_url: &target.base_url, endpoint, session: None };
        match execute::run(&request, &config.public.load, config.show_progress).await {
            Ok(result) => results.push(result),
            Err(e) => warn!(
                endpoint = %endpoint.label(),
                error = %e,
                "endpoint test failed, omitted from report"
            ),
        }
    }
    results
}

async fn run_authenticated_phase(
    config: &RunConfig,
    target: &TargetConfig,
    sessions: &SessionMap,
) -> Vec<TestResult> {
    info!(
        endpoints = target.authenticated_endpoints.len(),
        roles = sessions.len(),
        "authenticated phase"
    );
    let mut results = Vec::new();
    for endpoint in &target.authenticated_endpoints {
        for credential in &target.roster {
            let role = credential.role_name.as_str();
            if !endpoint.allows(role) {
                debug!(endpoint = %endpoint.label(), role, "role not allowed, skipped");
                continue;
            }
            let Some(session) = sessions.get(role) else {
                warn!(endpoint = %endpoint.label(), role, "no session for role, skipped");
                continue;
            };
            let request =
                LoadRequest { base_url: &target.base_url, endpoint, session: Some(session) };
            match execute::run(&request, &config.authenticated.load, config.show_progress).await {
                Ok(result) => results.push(result),
                Err(e) => warn!(
                    endpoint = %endpoint.label(),
                    role,
                    error = %e,
                    "endpoint test failed, omitted from report"
                ),
            }
        }
    }
    results
}

async fn run_duplex_phase(
    config: &RunConfig,
    target: &TargetConfig,
    sessions: &SessionMap,
) -> Vec<DuplexMetrics> {
    let url = target.duplex_url();
    info!(%url, "duplex phase");
    let mut results = Vec::new();
    for role in target.duplex_roles() {
        let Some(session) = sessions.get(&role) else {
            warn!(role = %role, "no session for role, duplex test skipped");
            continue;
        };
        let load = &config.duplex.load;
        match duplex::run(&url, &target.duplex, session, load, config.show_progress).await {
            Ok(metrics) => results.push(metrics),
            Err(e) => warn!(role = %role, error = %e, "duplex test failed, omitted from report"),
        }
    }
    results
}

async fn run_stress_phase(
    config: &RunConfig,
    target: &TargetConfig,
    sessions: &SessionMap,
) -> StressReport {
    let mut report = StressReport::default();
    let show_progress = config.show_progress;

    match target.stress_target() {
        Some(endpoint) => {
            let public = target.public_endpoints.contains(endpoint);
            // endpoints outside the public list run as the first roster role that may call them
            let session = if public {
                None
            } else {
                target
                    .roster
                    .iter()
                    .filter(|c| endpoint.allows(&c.role_name))
                    .find_map(|c| sessions.get(&c.role_name))
            };
            if !public && session.is_none() {
                warn!(
                    endpoint = %endpoint.label(),
                    "no session can call the stress endpoint, http stress skipped"
                );
            } else {
                let request = LoadRequest { base_url: &target.base_url, endpoint, session };
                let base = config.public.load.with_duration(config.stress.http.window_secs);
                let subject = endpoint.label();
                let levels = escalate(&subject, &config.stress.http, |connections| {
                    let load = base.with_connections(connections);
                    async move { execute::run(&request, &load, show_progress).await }
                })
                .await;
                report.http = Some(finish_curve(subject, levels));
            }
        }
        None => warn!("no stress endpoint configured, http stress skipped"),
    }

    let duplex_session = target.duplex_roles().into_iter().find_map(|role| sessions.get(&role));
    match duplex_session {
        Some(session) => {
            let url = target.duplex_url();
            let url = url.as_str();
            let protocol = &target.duplex;
            let base = config.duplex.load.with_duration(config.stress.duplex.window_secs);
            let subject = format!("WebSocket ({})", session.role_name);
            let levels = escalate(&subject, &config.stress.duplex, |connections| {
                let load = base.with_connections(connections);
                async move { duplex::run(url, protocol, session, &load, show_progress).await }
            })
            .await;
            report.duplex = Some(finish_curve(subject, levels));
        }
        None => warn!("no authenticated role available, duplex stress skipped"),
    }
    report
}

fn finish_curve<T>(subject: String, levels: Vec<StressLevel<T>>) -> StressCurve<T> {
    let curve = StressCurve::new(subject, levels);
    match curve.breaking_point {
        Some(level) => info!(subject = %curve.subject, level, "breaking point found"),
        None => info!(
            subject = %curve.subject,
            highest = ?curve.highest_stable(),
            "no breaking point within plan"
        ),
    }
    curve
}
