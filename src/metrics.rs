//! Prometheus-compatible metrics endpoint
//!
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Samples kept for tick time percentiles
const TICK_HISTORY: usize = 1000;

/// Metrics registry for the match server
#[derive(Debug)]
pub struct Metrics {
    // Lobby
    pub connections_active: AtomicU64,
    pub queue_length: AtomicU64,
    pub rooms_active: AtomicU64,

    // Matches
    pub matches_started: AtomicU64,
    pub matches_completed: AtomicU64,
    pub matches_abandoned: AtomicU64,

    // Network
    pub messages_received: AtomicU64,
    pub messages_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub messages_malformed: AtomicU64,

    // Tick timing (microseconds), across all rooms
    pub tick_count: AtomicU64,
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub connections_active: u64,
    pub queue_length: u64,
    pub rooms_active: u64,
    pub matches_started: u64,
    pub matches_completed: u64,
    pub matches_abandoned: u64,
    pub messages_received: u64,
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub messages_malformed: u64,
    pub tick_count: u64,
    pub tick_time_us: u64,
    pub tick_time_p95_us: u64,
    pub tick_time_p99_us: u64,
    pub tick_time_max_us: u64,
    pub uptime_seconds: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            queue_length: AtomicU64::new(0),
            rooms_active: AtomicU64::new(0),
            matches_started: AtomicU64::new(0),
            matches_completed: AtomicU64::new(0),
            matches_abandoned: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            messages_malformed: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn record_message_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.messages_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        // Saturating; never wraps below zero
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Lobby gauges, published by the lobby after every change
    pub fn set_lobby_gauges(&self, queue_length: usize, rooms_active: usize) {
        self.queue_length.store(queue_length as u64, Ordering::Relaxed);
        self.rooms_active.store(rooms_active as u64, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |a: &AtomicU64| a.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_active: load(&self.connections_active),
            queue_length: load(&self.queue_length),
            rooms_active: load(&self.rooms_active),
            matches_started: load(&self.matches_started),
            matches_completed: load(&self.matches_completed),
            matches_abandoned: load(&self.matches_abandoned),
            messages_received: load(&self.messages_received),
            messages_sent: load(&self.messages_sent),
            bytes_sent: load(&self.bytes_sent),
            messages_malformed: load(&self.messages_malformed),
            tick_count: load(&self.tick_count),
            tick_time_us: load(&self.tick_time_us),
            tick_time_p95_us: load(&self.tick_time_p95_us),
            tick_time_p99_us: load(&self.tick_time_p99_us),
            tick_time_max_us: load(&self.tick_time_max_us),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("pong_arena_connections_active", "Active WebTransport connections", "gauge", s.connections_active);
        metric!("pong_arena_queue_length", "Participants waiting for a match", "gauge", s.queue_length);
        metric!("pong_arena_rooms_active", "Rooms currently registered", "gauge", s.rooms_active);

        metric!("pong_arena_matches_started_total", "Rooms created", "counter", s.matches_started);
        metric!("pong_arena_matches_completed_total", "Matches that reached the winning score", "counter", s.matches_completed);
        metric!("pong_arena_matches_abandoned_total", "Matches ended by a disconnect", "counter", s.matches_abandoned);

        metric!("pong_arena_messages_received_total", "Inbound messages accepted", "counter", s.messages_received);
        metric!("pong_arena_messages_sent_total", "Outbound messages queued", "counter", s.messages_sent);
        metric!("pong_arena_bytes_sent_total", "Outbound payload bytes queued", "counter", s.bytes_sent);
        metric!("pong_arena_messages_malformed_total", "Inbound messages discarded as malformed", "counter", s.messages_malformed);

        metric!("pong_arena_tick_count", "Room ticks processed", "counter", s.tick_count);
        metric!("pong_arena_tick_time_microseconds", "Last room tick time", "gauge", s.tick_time_us);
        metric!("pong_arena_tick_time_p95_microseconds", "95th percentile room tick time", "gauge", s.tick_time_p95_us);
        metric!("pong_arena_tick_time_p99_microseconds", "99th percentile room tick time", "gauge", s.tick_time_p99_us);
        metric!("pong_arena_tick_time_max_microseconds", "Maximum room tick time", "gauge", s.tick_time_max_us);

        metric!("pong_arena_uptime_seconds", "Server uptime in seconds", "counter", s.uptime_seconds);

        output
    }

    /// JSON format metrics
    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        serde_json::json!({
            "lobby": {
                "connections": s.connections_active,
                "queue_length": s.queue_length,
                "rooms_active": s.rooms_active,
            },
            "matches": {
                "started": s.matches_started,
                "completed": s.matches_completed,
                "abandoned": s.matches_abandoned,
            },
            "network": {
                "messages_received": s.messages_received,
                "messages_sent": s.messages_sent,
                "bytes_sent": s.bytes_sent,
                "messages_malformed": s.messages_malformed,
            },
            "performance": {
                "tick_count": s.tick_count,
                "tick_time_us": s.tick_time_us,
                "tick_time_p95_us": s.tick_time_p95_us,
                "tick_time_p99_us": s.tick_time_p99_us,
                "tick_time_max_us": s.tick_time_max_us,
            },
            "uptime_seconds": s.uptime_seconds,
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Build the HTTP response for a raw request
/// More specific paths are matched first.
fn route(metrics: &Metrics, request: &str) -> String {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("GET "))
        .and_then(|rest| rest.split_whitespace().next());

    match path {
        Some("/metrics/json") | Some("/json") => {
            http_response("200 OK", "application/json", &metrics.to_json())
        }
        Some("/metrics") => http_response(
            "200 OK",
            "text/plain; version=0.0.4",
            &metrics.to_prometheus(),
        ),
        Some("/health") | Some("/") => http_response("200 OK", "text/plain", "OK"),
        _ => http_response("404 Not Found", "text/plain", ""),
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, bind_address: String, port: u16) -> anyhow::Result<()> {
    let addr = format!("{}:{}", bind_address, port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = route(&metrics, &request);
                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
