use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::{anyhow, Context};
use futures::future::join_all;
use reqwest::{Client, Method, Url};
use serde_json::{json, Value};
use tokio::time::{sleep_until, timeout};
use tracing::{debug, info};
use crate::core::progress::PhaseProgress;
use crate::models::api_endpoint::EndpointSpec;
use crate::models::profile::HttpLoad;
use crate::models::result::{LatencyStats, RequestStats, TestResult, ThroughputStats};
use crate::models::role_credential::AuthSession;

/// What to hit: an endpoint on a base URL, optionally as an authenticated role.
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub base_url: &'a str,
    pub endpoint: &'a EndpointSpec,
    pub session: Option<&'a AuthSession>,
}

struct PreparedRequest {
    method: Method,
    url: Url,
    bearer_token: Option<String>,
    body: Option<Value>,
}

/// `<name> <version> (<os>; <os version>)`
pub fn user_agent() -> String {
    let info = os_info::get();
    format!(
        "{} {} ({}; {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        info.os_type(),
        info.version()
    )
}

/// A client holding at most one idle connection, so each task drives its own socket.
pub fn http_client(request_timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(request_timeout)
        .pool_max_idle_per_host(1)
        .build()
        .context("building http client")
}

// samples owned by a single connection task
struct ConnectionSamples {
    latencies_ms: Vec<f64>,
    per_second: Vec<u64>,
    bytes: u64,
    finished: u64,
    errors: u64,
    status_2xx: u64,
    status_4xx: u64,
    status_5xx: u64,
}

impl ConnectionSamples {
    fn new(window_secs: usize) -> Self {
        ConnectionSamples {
            latencies_ms: Vec::new(),
            per_second: vec![0; window_secs],
            bytes: 0,
            finished: 0,
            errors: 0,
            status_2xx: 0,
            status_4xx: 0,
            status_5xx: 0,
        }
    }

    fn record_response(
        &mut self,
        status: u16,
        bytes: usize,
        latency: Duration,
        since_start: Duration,
    ) {
        self.finished += 1;
        self.bytes += bytes as u64;
        self.latencies_ms.push(latency.as_secs_f64() * 1000.0);
        match status {
            200..=299 => self.status_2xx += 1,
            400..=499 => self.status_4xx += 1,
            500..=599 => self.status_5xx += 1,
            _ => {}
        }
        // completions during drain are outside the window
        if let Some(slot) = self.per_second.get_mut(since_start.as_secs() as usize) {
            *slot += 1;
        }
    }

    fn record_error(&mut self) {
        self.finished += 1;
        self.errors += 1;
    }

    fn absorb(&mut self, other: ConnectionSamples) {
        self.latencies_ms.extend(other.latencies_ms);
        for (slot, count) in self.per_second.iter_mut().zip(other.per_second) {
            *slot += count;
        }
        self.bytes += other.bytes;
        self.finished += other.finished;
        self.errors += other.errors;
        self.status_2xx += other.status_2xx;
        self.status_4xx += other.status_4xx;
        self.status_5xx += other.status_5xx;
    }
}

/// Drive `load.connections` independent request loops against one endpoint for
/// `load.duration_secs`, then let in-flight requests drain for at most
/// `load.drain_grace_secs`.
pub async fn run(
    request: &LoadRequest<'_>,
    load: &HttpLoad,
    show_progress: bool,
) -> anyhow::Result<TestResult> {
    let endpoint = request.endpoint;
    let url = format!("{}{}", request.base_url.trim_end_matches('/'), endpoint.path);
    let url = Url::parse(&url).with_context(|| format!("invalid endpoint url {}", url))?;
    // token and body only travel on authenticated calls
    let bearer_token = request.session.map(|s| s.bearer_token.clone());
    let body = match (&bearer_token, endpoint.method.is_mutating()) {
        (Some(_), true) => Some(endpoint.request_body.clone().unwrap_or_else(|| json!({}))),
        _ => None,
    };
    let prepared = Arc::new(PreparedRequest {
        method: endpoint.method.as_reqwest(),
        url,
        bearer_token,
        body,
    });
    let role_name = request.session.map(|s| s.role_name.clone());

    let window = Duration::from_secs(load.duration_secs);
    let window_secs = load.duration_secs as usize;
    let request_timeout = Duration::from_secs(load.request_timeout_secs.max(1));
    // one client per connection
    let clients = (0..load.connections)
        .map(|_| http_client(request_timeout))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let test_start = Instant::now();
    let test_end = test_start + window;
    let hard_stop = test_end + Duration::from_secs(load.drain_grace_secs);
    let mut handles = Vec::with_capacity(clients.len());
    for client in clients {
        let prepared = prepared.clone();
        handles.push(tokio::spawn(drive_connection(
            client,
            prepared,
            test_start,
            test_end,
            hard_stop,
            request_timeout,
            window_secs,
        )));
    }

    let mut progress = PhaseProgress::start(&endpoint.label(), window, show_progress);
    sleep_until(tokio::time::Instant::from_std(test_end)).await;
    progress.draining("waiting for in-flight requests");
    let joined = join_all(handles).await;
    progress.finish();

    let mut samples = ConnectionSamples::new(window_secs);
    for handle in joined {
        let connection =
            handle.map_err(|e| anyhow!("connection task stopped unexpectedly: {}", e))?;
        samples.absorb(connection);
    }

    let duration_seconds = window.as_secs_f64();
    let per_second: Vec<f64> = samples.per_second.iter().map(|&c| c as f64).collect();
    let result = TestResult {
        endpoint_path: endpoint.path.clone(),
        http_method: endpoint.method,
        role_name,
        duration_seconds,
        requests: RequestStats::from_series(samples.finished, duration_seconds, &per_second),
        latency: LatencyStats::from_samples(&samples.latencies_ms),
        throughput: ThroughputStats {
            average_bytes_per_second: if duration_seconds > 0.0 {
                samples.bytes as f64 / duration_seconds
            } else {
                0.0
            },
        },
        error_count: samples.errors,
        status_2xx_count: samples.status_2xx,
        status_4xx_count: samples.status_4xx,
        status_5xx_count: samples.status_5xx,
    };
    info!(
        target_label = %result.label(),
        requests = result.requests.total_count,
        rps = result.requests.average_rate,
        avg_ms = result.latency.average,
        p99_ms = result.latency.p99,
        errors = result.error_count,
        "http load finished"
    );
    Ok(result)
}

async fn drive_connection(
    client: Client,
    prepared: Arc<PreparedRequest>,
    test_start: Instant,
    test_end: Instant,
    hard_stop: Instant,
    request_timeout: Duration,
    window_secs: usize,
) -> ConnectionSamples {
    let mut samples = ConnectionSamples::new(window_secs);
    // one request in flight at a time
    while Instant::now() < test_end {
        let sent_at = Instant::now();
        let budget = request_timeout.min(hard_stop.saturating_duration_since(sent_at));
        match timeout(budget, send_once(&client, &prepared)).await {
            Ok(Ok((status, bytes))) => {
                let finished_at = Instant::now();
                samples.record_response(
                    status,
                    bytes,
                    finished_at - sent_at,
                    finished_at - test_start,
                );
            }
            Ok(Err(e)) => {
                debug!(url = %prepared.url, error = %e, "request failed");
                samples.record_error();
            }
            Err(_) => {
                debug!(url = %prepared.url, "request timed out");
                samples.record_error();
            }
        }
    }
    samples
}

async fn send_once(
    client: &Client,
    prepared: &PreparedRequest,
) -> Result<(u16, usize), reqwest::Error> {
    let mut request = client.request(prepared.method.clone(), prepared.url.clone());
    if let Some(token) = &prepared.bearer_token {
        request = request.bearer_auth(token);
    }
    if let Some(body) = &prepared.body {
        request = request.json(body);
    }
    let response = request.send().await?;
    let status = response.status().as_u16();
    // read the body so the connection can be reused
    let body = response.bytes().await?;
    Ok((status, body.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_endpoint::HttpMethod;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn short_load() -> HttpLoad {
        HttpLoad { connections: 2, duration_secs: 1, request_timeout_secs: 2, drain_grace_secs: 1 }
    }

    fn session(role: &str, token: &str) -> AuthSession {
        AuthSession {
            role_name: role.to_string(),
            bearer_token: token.to_string(),
            identity: json!({"id": 1}),
        }
    }

    #[tokio::test]
    async fn public_get_counts_2xx_and_omits_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let endpoint = EndpointSpec::get("/api/health", "Health");
        let request = LoadRequest { base_url: &server.uri(), endpoint: &endpoint, session: None };
        let result = run(&request, &short_load(), false).await.unwrap();

        assert!(result.requests.total_count > 0);
        assert_eq!(result.status_2xx_count, result.requests.total_count);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.role_name, None);
        assert!(result.throughput.average_bytes_per_second > 0.0);
        assert!(result.requests.p50 > 0.0);
        assert!(result.latency.p50 <= result.latency.p95);
        assert!(result.latency.p95 <= result.latency.p99);

        let received = server.received_requests().await.unwrap();
        assert!(received.iter().all(|r| r.headers.get("authorization").is_none()));
    }

    #[tokio::test]
    async fn authenticated_post_sends_token_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/grades"))
            .and(header("authorization", "Bearer tok-teacher"))
            .and(body_json(json!({"score": 90})))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let endpoint = EndpointSpec::get("/api/grades", "Record grade")
            .with_method(HttpMethod::Post)
            .with_body(json!({"score": 90}));
        let teacher = session("teacher", "tok-teacher");
        let request = LoadRequest {
            base_url: &server.uri(),
            endpoint: &endpoint,
            session: Some(&teacher),
        };
        let result = run(&request, &short_load(), false).await.unwrap();

        assert!(result.status_2xx_count > 0);
        assert_eq!(result.status_4xx_count, 0);
        assert_eq!(result.role_name.as_deref(), Some("teacher"));
        assert_eq!(result.http_method, HttpMethod::Post);
    }

    #[tokio::test]
    async fn server_errors_land_in_5xx_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let endpoint = EndpointSpec::get("/api/classes", "Classes");
        let request = LoadRequest { base_url: &server.uri(), endpoint: &endpoint, session: None };
        let result = run(&request, &short_load(), false).await.unwrap();

        assert!(result.status_5xx_count > 0);
        assert_eq!(result.status_5xx_count, result.requests.total_count);
        assert_eq!(result.error_count, 0);
    }

    #[tokio::test]
    async fn refused_connections_are_transport_errors() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let base_url = format!("http://127.0.0.1:{}", port);
        let endpoint = EndpointSpec::get("/api/health", "Health");
        let load = HttpLoad { connections: 1, ..short_load() };
        let request = LoadRequest { base_url: &base_url, endpoint: &endpoint, session: None };
        let result = run(&request, &load, false).await.unwrap();

        assert!(result.error_count > 0);
        assert_eq!(result.error_count, result.requests.total_count);
        assert_eq!(result.status_2xx_count + result.status_4xx_count + result.status_5xx_count, 0);
        assert_eq!(result.latency.average, 0.0);
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let endpoint = EndpointSpec::get("/api/slow", "Slow");
        let load = HttpLoad {
            connections: 1,
            duration_secs: 1,
            request_timeout_secs: 1,
            drain_grace_secs: 1,
        };
        let request = LoadRequest { base_url: &server.uri(), endpoint: &endpoint, session: None };
        let started = Instant::now();
        let result = run(&request, &load, false).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(result.error_count >= 1);
        assert_eq!(result.status_2xx_count, 0);
    }
}
