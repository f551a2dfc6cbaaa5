// Live WebSocket ingest with exponential reconnect.
// Invariants: one transport at a time; the same URL on every attempt; retries until stopped.

use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use telemetry_core::connection::{ConnectionTracker, ReconnectPolicy};

use crate::constants::{CLOSE_TIMEOUT_MS, CONNECT_TIMEOUT_MS};
use crate::producer::MessageProducer;
use crate::telemetry::IngestSink;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct ConnectionManager {
    url: String,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    sink: Option<IngestSink>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
            sink: None,
            cancel: None,
            task: None,
        }
    }

    // Bounds the TCP connect plus the upgrade handshake of each attempt.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl MessageProducer for ConnectionManager {
    fn name(&self) -> &'static str {
        "live"
    }

    fn start(&mut self, sink: IngestSink) {
        if self.cancel.is_some() {
            warn!(url = %self.url, "connection manager already started");
            return;
        }
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(connection_loop(
            self.url.clone(),
            self.policy,
            self.connect_timeout,
            sink.clone(),
            cancel_rx,
        ));
        self.sink = Some(sink);
        self.cancel = Some(cancel_tx);
        self.task = Some(task);
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.close();
        }
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            info!(url = %self.url, "connection manager stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

enum LinkEnd {
    Cancelled,
    Lost(String),
}

async fn connection_loop(
    url: String,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    sink: IngestSink,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut tracker = ConnectionTracker::new(policy);
    if tracker.enable().is_none() {
        return;
    }
    sink.set_connection(tracker.status());

    loop {
        info!(%url, retry_count = tracker.retry_count(), "connecting");
        let connected = tokio::select! {
            _ = &mut cancel => break,
            result = time::timeout(connect_timeout, connect_async(url.as_str())) => result,
        };

        match connected {
            Ok(Ok((stream, _response))) => {
                if tracker.on_open().is_some() {
                    info!(%url, "telemetry link online");
                    sink.set_connection(tracker.status());
                }
                match pump_frames(stream, &sink, &mut cancel).await {
                    LinkEnd::Cancelled => break,
                    LinkEnd::Lost(reason) => warn!(%url, %reason, "telemetry link lost"),
                }
            }
            Ok(Err(err)) => warn!(%url, ?err, "telemetry connect failed"),
            Err(_elapsed) => warn!(
                %url,
                timeout_ms = connect_timeout.as_millis() as u64,
                "telemetry connect timed out"
            ),
        }

        let Some(delay) = tracker.on_closed() else {
            break;
        };
        sink.set_connection(tracker.status());
        info!(
            delay_ms = delay.as_millis() as u64,
            retry_count = tracker.retry_count(),
            "reconnect scheduled"
        );

        tokio::select! {
            _ = &mut cancel => break,
            _ = time::sleep(delay) => {}
        }
        if tracker.on_retry_elapsed().is_some() {
            sink.set_connection(tracker.status());
        }
    }

    tracker.disable();
    debug!(%url, "connection task exited");
}

async fn pump_frames(
    mut stream: WsStream,
    sink: &IngestSink,
    cancel: &mut oneshot::Receiver<()>,
) -> LinkEnd {
    loop {
        tokio::select! {
            _ = &mut *cancel => {
                let close = time::timeout(Duration::from_millis(CLOSE_TIMEOUT_MS), stream.close(None));
                if close.await.is_err() {
                    debug!("websocket close handshake timed out");
                }
                return LinkEnd::Cancelled;
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(WsMessage::Text(text))) => {
                        sink.accept_frame(&text);
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        sink.accept_bytes(&bytes);
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = frame
                            .map(|frame| format!("closed by peer: {}", frame.reason))
                            .unwrap_or_else(|| "closed by peer".to_string());
                        return LinkEnd::Lost(reason);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return LinkEnd::Lost(err.to_string()),
                    None => return LinkEnd::Lost("stream ended".to_string()),
                }
            }
        }
    }
}
