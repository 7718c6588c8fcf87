// Telemetry transport - newline-delimited JSON (or SSE framed) snapshot stream
use crate::application::dashboard_controller::{DashboardEvent, TransportEvent};
use crate::domain::machine::{AnomalyEvent, MachineReading, RecommendationEvent, Snapshot};
use crate::infrastructure::config::UpstreamSettings;
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;

pub const MACHINE_DATA_EVENT: &str = "machine_data";
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// A snapshot payload must name its machines. Every other field may be absent.
#[derive(Debug, Deserialize)]
struct SnapshotBody {
    machines: Vec<MachineReading>,
    #[serde(default)]
    anomalies: Vec<AnomalyEvent>,
    #[serde(default)]
    recommendations: Vec<RecommendationEvent>,
}

impl From<SnapshotBody> for Snapshot {
    fn from(body: SnapshotBody) -> Self {
        Snapshot {
            machines: body.machines,
            anomalies: body.anomalies,
            recommendations: body.recommendations,
        }
    }
}

#[derive(Debug)]
pub enum StreamLine {
    Skip,
    Snapshot(Snapshot),
    OtherEvent(String),
    Invalid(serde_json::Error),
}

pub fn parse_stream_line(line: &str) -> StreamLine {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') || line.starts_with("event:") {
        return StreamLine::Skip;
    }
    let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);

    let record: Map<String, Value> = match serde_json::from_str(payload) {
        Ok(record) => record,
        Err(e) => return StreamLine::Invalid(e),
    };

    if let Some(event) = record.get("event").and_then(Value::as_str) {
        if event != MACHINE_DATA_EVENT {
            return StreamLine::OtherEvent(event.to_string());
        }
        return decode_snapshot(record.get("data").cloned().unwrap_or(Value::Null));
    }
    if record.contains_key("machines") {
        return decode_snapshot(Value::Object(record));
    }
    match record.get("type").and_then(Value::as_str) {
        Some(kind) => StreamLine::OtherEvent(kind.to_string()),
        None => {
            tracing::debug!("Skipping stream object without machines or event name");
            StreamLine::Skip
        }
    }
}

fn decode_snapshot(data: Value) -> StreamLine {
    match serde_json::from_value::<SnapshotBody>(data) {
        Ok(body) => StreamLine::Snapshot(body.into()),
        Err(e) => StreamLine::Invalid(e),
    }
}

/// Reassembles lines across body chunks. A line longer than the limit is
/// dropped up to its terminating newline.
#[derive(Debug)]
pub struct LineBuffer {
    buf: BytesMut,
    scanned: usize,
    limit: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            limit,
            discarding: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(self.scanned + offset);
            self.buf.advance(1);
            self.scanned = 0;
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).trim_end_matches('\r').to_string());
        }
        self.scanned = self.buf.len();

        if self.buf.len() > self.limit {
            tracing::warn!(
                "Dropping telemetry line over {} bytes with no newline",
                self.limit
            );
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        lines
    }
}

pub struct TelemetryStream {
    client: reqwest::Client,
    url: String,
    reconnect_delay: Duration,
}

impl TelemetryStream {
    pub fn new(upstream: &UpstreamSettings) -> anyhow::Result<Self> {
        // No overall timeout: the body stays open for the life of the link.
        let client = reqwest::Client::builder()
            .connect_timeout(upstream.request_timeout())
            .build()?;
        Ok(Self {
            client,
            url: upstream.url(&upstream.stream_path),
            reconnect_delay: upstream.reconnect_delay(),
        })
    }

    /// Streams until the controller goes away, reconnecting after each loss.
    pub async fn run(self, events: mpsc::Sender<DashboardEvent>) {
        loop {
            if let Err(()) = self.stream_once(&events).await {
                return;
            }
            tracing::debug!("Reconnecting to {} in {:?}", self.url, self.reconnect_delay);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    // Err only when the receiving side is closed.
    async fn stream_once(&self, events: &mpsc::Sender<DashboardEvent>) -> Result<(), ()> {
        let response = match self
            .client
            .get(&self.url)
            .header("Accept", "application/x-ndjson, text/event-stream")
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Telemetry stream unavailable at {}: {}", self.url, e);
                return if events.is_closed() { Err(()) } else { Ok(()) };
            }
        };

        tracing::info!("Telemetry stream connected to {}", self.url);
        send(events, TransportEvent::Connected).await?;

        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::warn!("Telemetry stream read failed: {}", e);
                    break;
                }
            };
            for line in lines.push(&chunk) {
                match parse_stream_line(&line) {
                    StreamLine::Snapshot(snapshot) => {
                        send(events, TransportEvent::MachineData(snapshot)).await?
                    }
                    StreamLine::OtherEvent(event) => {
                        tracing::debug!("Ignoring stream event {}", event)
                    }
                    StreamLine::Invalid(e) => {
                        tracing::warn!("Skipping undecodable telemetry line: {}", e)
                    }
                    StreamLine::Skip => {}
                }
            }
        }

        send(events, TransportEvent::Disconnected).await
    }
}

async fn send(events: &mpsc::Sender<DashboardEvent>, event: TransportEvent) -> Result<(), ()> {
    events
        .send(DashboardEvent::Transport(event))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;

    const SNAPSHOT: &str = r#"{"machines":[{"id":"M1","temperature":61.0,"status":"operational"}],"anomalies":[],"recommendations":[]}"#;

    #[test]
    fn test_bare_and_enveloped_lines() {
        assert!(matches!(parse_stream_line(SNAPSHOT), StreamLine::Snapshot(_)));

        let envelope = format!(r#"{{"event":"machine_data","data":{}}}"#, SNAPSHOT);
        match parse_stream_line(&envelope) {
            StreamLine::Snapshot(s) => assert_eq!(s.machines[0].temperature, 61.0),
            other => panic!("unexpected: {:?}", other),
        }

        assert!(matches!(
            parse_stream_line(r#"{"event":"security_alert","data":{}}"#),
            StreamLine::OtherEvent(e) if e == "security_alert"
        ));
    }

    #[test]
    fn test_sse_framing() {
        assert!(matches!(parse_stream_line(": keep-alive"), StreamLine::Skip));
        assert!(matches!(parse_stream_line("event: machine_data"), StreamLine::Skip));
        assert!(matches!(parse_stream_line(""), StreamLine::Skip));
        assert!(matches!(
            parse_stream_line(&format!("data: {}", SNAPSHOT)),
            StreamLine::Snapshot(_)
        ));
    }

    #[test]
    fn test_objects_without_machines_are_not_snapshots() {
        assert!(matches!(parse_stream_line("{}"), StreamLine::Skip));
        assert!(matches!(
            parse_stream_line(r#"{"type":"heartbeat"}"#),
            StreamLine::OtherEvent(e) if e == "heartbeat"
        ));
        assert!(matches!(
            parse_stream_line(r#"{"anomalies":[],"recommendations":[]}"#),
            StreamLine::Skip
        ));
        assert!(matches!(
            parse_stream_line(r#"{"event":"machine_data","data":{}}"#),
            StreamLine::Invalid(_)
        ));
        assert!(matches!(
            parse_stream_line(r#"{"event":"machine_data"}"#),
            StreamLine::Invalid(_)
        ));
        assert!(matches!(
            parse_stream_line(r#"{"machines":"offline"}"#),
            StreamLine::Invalid(_)
        ));
    }

    #[test]
    fn test_explicit_empty_fleet_is_a_snapshot() {
        match parse_stream_line(r#"{"machines":[]}"#) {
            StreamLine::Snapshot(s) => assert_eq!(s, Snapshot::default()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(parse_stream_line("{not json"), StreamLine::Invalid(_)));
        assert!(matches!(parse_stream_line("[1,2,3]"), StreamLine::Invalid(_)));
    }

    #[test]
    fn test_line_buffer_reassembles_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"machines\"").is_empty());
        assert_eq!(buffer.push(b":[]}\r\n{\"a\""), vec!["{\"machines\":[]}"]);
        assert_eq!(buffer.push(b":1}\n\n"), vec!["{\"a\":1}", ""]);
    }

    #[test]
    fn test_line_buffer_drops_overlong_line() {
        let mut buffer = LineBuffer::with_limit(8);
        assert!(buffer.push(b"0123456789").is_empty());
        assert!(buffer.buf.is_empty());
        assert!(buffer.push(b"abc").is_empty());
        assert_eq!(buffer.push(b"def\n{}\n"), vec!["{}"]);
        assert_eq!(buffer.push(b"short\n"), vec!["short"]);
    }

    #[test]
    fn test_line_buffer_resumes_scan_after_partial_chunk() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"abc").is_empty());
        assert_eq!(buffer.scanned, 3);
        assert_eq!(buffer.push(b"d\nef"), vec!["abcd"]);
        assert_eq!(buffer.scanned, 2);
    }

    #[tokio::test]
    async fn test_stream_emits_connect_data_disconnect() {
        let body = format!("{}\n: ping\n{}\n", SNAPSHOT, SNAPSHOT);
        let router = Router::new().route(
            "/api/stream",
            get(move || {
                let body = body.clone();
                async move { Body::from(body) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let stream = TelemetryStream {
            client: reqwest::Client::new(),
            url: format!("http://{}/api/stream", addr),
            reconnect_delay: Duration::from_secs(60),
        };
        let (tx, mut rx) = mpsc::channel(8);
        assert!(stream.stream_once(&tx).await.is_ok());
        drop(tx);

        let mut kinds = Vec::new();
        while let Some(DashboardEvent::Transport(event)) = rx.recv().await {
            kinds.push(match event {
                TransportEvent::Connected => "connect",
                TransportEvent::MachineData(_) => "data",
                TransportEvent::Disconnected => "disconnect",
            });
        }
        assert_eq!(kinds, vec!["connect", "data", "data", "disconnect"]);
    }
}
