use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::{anyhow, Context};
use futures::future::join_all;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, sleep, sleep_until, timeout, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use crate::core::progress::PhaseProgress;
use crate::models::duplex_metrics::{ConnectionStats, DuplexMetrics, DuplexSamples, EventStats};
use crate::models::profile::DuplexLoad;
use crate::models::role_credential::AuthSession;
use crate::models::setup::DuplexProtocol;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize)]
struct SubscribeMessage<'a> {
    event: &'a str,
    id: u64,
    data: SubscribeData<'a>,
}

#[derive(Debug, Serialize)]
struct SubscribeData<'a> {
    topics: &'a [String],
}

#[derive(Debug, Deserialize)]
struct InboundEvent {
    event: String,
    #[serde(default)]
    id: Option<u64>,
}

// per-socket results, merged after the window closes
#[derive(Debug, Default)]
struct SocketResult {
    message_ms: Vec<f64>,
    sent: u64,
    received: u64,
    errors: u64,
}

// outcome of one connection attempt
enum Attempt {
    Connected { connect_ms: f64, socket: SocketResult },
    Failed,
}

// everything an attempt task needs besides its handshake request
struct SocketPlan {
    protocol: Arc<DuplexProtocol>,
    ramp_done: watch::Receiver<bool>,
    test_end: Instant,
    connect_timeout: Duration,
    message_interval: Duration,
}

/// Start `load.connections` authenticated connection attempts on a fixed stagger,
/// exchange subscribe/ack round trips until the window closes, then close them all.
/// No attempt starts after the window closes; a handshake still pending when it
/// closes counts as failed.
pub async fn run(
    url: &str,
    protocol: &DuplexProtocol,
    session: &AuthSession,
    load: &DuplexLoad,
    show_progress: bool,
) -> anyhow::Result<DuplexMetrics> {
    // fail fast on a URL that can never connect
    handshake_request(url, &session.bearer_token)?;

    let protocol = Arc::new(protocol.clone());
    let window = Duration::from_secs(load.duration_secs);
    let test_start = Instant::now();
    let test_end = test_start + window;
    let (ramp_done_tx, ramp_done_rx) = watch::channel(false);
    let mut connections = ConnectionStats::default();
    let mut handles = Vec::with_capacity(load.connections);
    let label = format!("WebSocket ({})", session.role_name);
    let mut progress = PhaseProgress::start(&label, window, show_progress);

    for attempt in 0..load.connections {
        if Instant::now() >= test_end {
            warn!(
                role = %session.role_name,
                started = attempt,
                planned = load.connections,
                "ramp-up outlasted the window, remaining attempts not started"
            );
            break;
        }
        connections.attempted += 1;
        let plan = SocketPlan {
            protocol: protocol.clone(),
            ramp_done: ramp_done_rx.clone(),
            test_end,
            connect_timeout: load.connect_timeout(),
            message_interval: load.message_interval(),
        };
        let request = handshake_request(url, &session.bearer_token)?;
        handles.push(tokio::spawn(open_socket(attempt, request, plan)));
        // throttle the ramp
        if attempt + 1 < load.connections {
            let remaining = test_end.saturating_duration_since(Instant::now());
            sleep(load.connect_delay().min(remaining)).await;
        }
    }
    let _ = ramp_done_tx.send(true);

    sleep_until(tokio::time::Instant::from_std(test_end)).await;
    progress.draining("closing websocket connections");
    let joined = join_all(handles).await;
    progress.finish();

    let mut events = EventStats::default();
    let mut connect_ms = Vec::new();
    let mut message_ms = Vec::new();
    for handle in joined {
        match handle.map_err(|e| anyhow!("websocket task stopped unexpectedly: {}", e))? {
            Attempt::Connected { connect_ms: latency, socket } => {
                connections.successful += 1;
                connect_ms.push(latency);
                events.sent += socket.sent;
                events.received += socket.received;
                events.errors += socket.errors;
                message_ms.extend(socket.message_ms);
            }
            Attempt::Failed => connections.failed += 1,
        }
    }

    let metrics = DuplexMetrics::new(
        &session.role_name,
        connections,
        events,
        DuplexSamples { connect_ms, message_ms },
        test_start.elapsed().as_secs_f64(),
    );
    info!(
        role = %session.role_name,
        attempted = connections.attempted,
        successful = connections.successful,
        failed = connections.failed,
        sent = events.sent,
        received = events.received,
        avg_ms = metrics.latency.average,
        "websocket load finished"
    );
    Ok(metrics)
}

async fn open_socket(attempt: usize, request: Request, plan: SocketPlan) -> Attempt {
    let started = Instant::now();
    let budget = plan.connect_timeout.min(plan.test_end.saturating_duration_since(started));
    match timeout(budget, connect_async(request)).await {
        Ok(Ok((socket, _))) => {
            let connect_ms = started.elapsed().as_secs_f64() * 1000.0;
            let socket = drive_socket(
                socket,
                plan.protocol,
                plan.ramp_done,
                plan.test_end,
                plan.message_interval,
            )
            .await;
            Attempt::Connected { connect_ms, socket }
        }
        Ok(Err(e)) => {
            debug!(attempt, error = %e, "websocket connection rejected");
            Attempt::Failed
        }
        Err(_) => {
            debug!(attempt, "websocket connection timed out");
            Attempt::Failed
        }
    }
}

fn handshake_request(url: &str, token: &str) -> anyhow::Result<Request> {
    let mut request = url
        .into_client_request()
        .with_context(|| format!("invalid websocket url {}", url))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .context("bearer token is not a valid header value")?;
    request.headers_mut().insert("Authorization", bearer);
    Ok(request)
}

async fn drive_socket(
    socket: Socket,
    protocol: Arc<DuplexProtocol>,
    mut ramp_done: watch::Receiver<bool>,
    test_end: Instant,
    message_interval: Duration,
) -> SocketResult {
    let mut result = SocketResult::default();
    let (mut write, mut read) = socket.split();
    let mut pending: VecDeque<(u64, Instant)> = VecDeque::new();
    let mut next_id = 0u64;
    let stop = sleep_until(tokio::time::Instant::from_std(test_end));
    tokio::pin!(stop);

    // listen only until every connection is up
    let mut open = true;
    while open && !*ramp_done.borrow() {
        tokio::select! {
            _ = &mut stop => break,
            changed = ramp_done.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            frame = read.next() => {
                open = handle_frame(frame, &protocol, &mut pending, &mut result);
            }
        }
    }

    if open && Instant::now() < test_end {
        let mut ticker = interval(message_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let message = SubscribeMessage {
                        event: &protocol.subscribe_event,
                        id: next_id,
                        data: SubscribeData { topics: &protocol.topics },
                    };
                    let text = match serde_json::to_string(&message) {
                        Ok(text) => text,
                        Err(_) => continue,
                    };
                    match write.send(Message::Text(text)).await {
                        Ok(()) => {
                            result.sent += 1;
                            pending.push_back((next_id, Instant::now()));
                            next_id += 1;
                        }
                        Err(e) => {
                            debug!(error = %e, "websocket send failed");
                            result.errors += 1;
                            break;
                        }
                    }
                }
                frame = read.next() => {
                    if !handle_frame(frame, &protocol, &mut pending, &mut result) {
                        open = false;
                        break;
                    }
                }
            }
        }
    }

    if open {
        let close = async {
            let _ = write.send(Message::Close(None)).await;
            let _ = write.close().await;
        };
        let _ = timeout(Duration::from_secs(2), close).await;
    }
    result
}

// false once the socket is gone
fn handle_frame(
    frame: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    protocol: &DuplexProtocol,
    pending: &mut VecDeque<(u64, Instant)>,
    result: &mut SocketResult,
) -> bool {
    match frame {
        Some(Ok(Message::Text(text))) => {
            if let Ok(inbound) = serde_json::from_str::<InboundEvent>(&text) {
                tally_event(&inbound, protocol, pending, result);
            }
            true
        }
        Some(Ok(Message::Close(_))) | None => false,
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            debug!(error = %e, "websocket read failed");
            result.errors += 1;
            false
        }
    }
}

fn tally_event(
    inbound: &InboundEvent,
    protocol: &DuplexProtocol,
    pending: &mut VecDeque<(u64, Instant)>,
    result: &mut SocketResult,
) {
    if inbound.event == protocol.ack_event {
        // acks without an id settle the oldest subscribe
        let settled = match inbound.id {
            Some(id) => pending
                .iter()
                .position(|(pending_id, _)| *pending_id == id)
                .and_then(|index| pending.remove(index)),
            None => pending.pop_front(),
        };
        if let Some((_, sent_at)) = settled {
            result.message_ms.push(sent_at.elapsed().as_secs_f64() * 1000.0);
        }
    }
    if protocol.push_events.iter().any(|e| *e == inbound.event) {
        result.received += 1;
    }
    if protocol.error_events.iter().any(|e| *e == inbound.event) {
        result.errors += 1;
    }
}
