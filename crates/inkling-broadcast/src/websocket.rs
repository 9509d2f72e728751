//! WebSocket fan-out server using `tokio-tungstenite`.
//!
//! Each accepted socket gets a reader loop handling [`ClientFrame`]s, a
//! writer task draining an outbound queue, and one forwarding task per
//! subscribed topic.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use inkling_protocol::{ClientFrame, Codec, JsonCodec, RoomCode, RoomEvent, ServerFrame, room_topic};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, TopicHub, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Frames queued for one connection before forwarding tasks wait.
const OUTBOUND_BUFFER: usize = 64;

/// Serves room topics from a [`TopicHub`] to WebSocket clients.
pub struct FanoutServer {
    listener: TcpListener,
    hub: Arc<TopicHub>,
}

impl FanoutServer {
    /// Binds to `addr`. Port 0 picks a free port; see
    /// [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str, hub: Arc<TopicHub>) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "fan-out server listening");
        Ok(Self { listener, hub })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }

    /// Accepts connections until `shutdown` flips to `true` or its sender
    /// is dropped. Open connections are left to finish on their own.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let hub = self.hub.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve(stream, addr, hub).await {
                                tracing::debug!(%addr, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %TransportError::AcceptFailed(e), "accept failed");
                    }
                },
            }
        }
        tracing::info!("fan-out server stopped");
    }
}

async fn serve(stream: TcpStream, addr: SocketAddr, hub: Arc<TopicHub>) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;
    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    tracing::debug!(%id, %addr, "subscriber connected");

    let (mut sink, mut incoming) = ws.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerFrame>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let text = match JsonCodec.encode(&frame).map(String::from_utf8) {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    tracing::warn!(%id, error = %e, "encoded frame is not UTF-8");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%id, error = %e, "failed to encode frame");
                    continue;
                }
            };
            sink.send(Message::text(text))
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        let _ = sink.close().await;
        Ok::<_, TransportError>(())
    });

    let mut subscriber = Subscriber::new(id, hub, out_tx);
    let mut result = Ok(());
    while let Some(msg) = incoming.next().await {
        match msg {
            Ok(Message::Text(text)) => subscriber.handle(text.as_bytes()).await,
            Ok(Message::Binary(data)) => subscriber.handle(&data).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/frame
            Err(e) => {
                result = Err(TransportError::ReceiveFailed(e.to_string()));
                break;
            }
        }
    }

    // Dropping the subscriber stops its forwarders, which closes the queue
    // and lets the writer finish.
    drop(subscriber);
    match writer.await {
        Ok(Err(e)) if result.is_ok() => result = Err(e),
        _ => {}
    }
    tracing::debug!(%id, "subscriber disconnected");
    result
}

/// Per-connection subscription state.
struct Subscriber {
    id: ConnectionId,
    hub: Arc<TopicHub>,
    out: mpsc::Sender<ServerFrame>,
    forwarders: HashMap<String, JoinHandle<()>>,
}

impl Subscriber {
    fn new(id: ConnectionId, hub: Arc<TopicHub>, out: mpsc::Sender<ServerFrame>) -> Self {
        Self {
            id,
            hub,
            out,
            forwarders: HashMap::new(),
        }
    }

    async fn handle(&mut self, data: &[u8]) {
        let reply = match JsonCodec.decode::<ClientFrame>(data) {
            Ok(ClientFrame::Subscribe { topic }) => self.subscribe(&topic),
            Ok(ClientFrame::Unsubscribe { topic }) => self.unsubscribe(&topic),
            Ok(ClientFrame::Ping { nonce }) => ServerFrame::Pong { nonce },
            Err(e) => ServerFrame::Error {
                message: e.to_string(),
            },
        };
        let _ = self.out.send(reply).await;
    }

    fn subscribe(&mut self, raw: &str) -> ServerFrame {
        let Some(topic) = normalize_topic(raw) else {
            return ServerFrame::Error {
                message: format!("unknown topic {raw:?}"),
            };
        };
        if !self.forwarders.contains_key(&topic) {
            let rx = self.hub.subscribe(&topic);
            let task = forward(self.id, topic.clone(), rx, self.out.clone());
            self.forwarders.insert(topic.clone(), task);
            tracing::debug!(id = %self.id, topic, "subscribed");
        }
        ServerFrame::Subscribed { topic }
    }

    fn unsubscribe(&mut self, raw: &str) -> ServerFrame {
        let topic = normalize_topic(raw).unwrap_or_else(|| raw.to_string());
        if let Some(task) = self.forwarders.remove(&topic) {
            task.abort();
            tracing::debug!(id = %self.id, topic, "unsubscribed");
        }
        ServerFrame::Unsubscribed { topic }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        for task in self.forwarders.values() {
            task.abort();
        }
    }
}

/// `rooms/{code}` with the code normalized, or `None` for anything else.
fn normalize_topic(raw: &str) -> Option<String> {
    let code = raw.strip_prefix("rooms/")?;
    RoomCode::parse(code).ok().map(|code| room_topic(&code))
}

fn forward(
    id: ConnectionId,
    topic: String,
    mut rx: broadcast::Receiver<RoomEvent>,
    out: mpsc::Sender<ServerFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let frame = ServerFrame::Event {
                        topic: topic.clone(),
                        event,
                    };
                    if out.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%id, topic, skipped, "subscriber lagging, events dropped");
                    if out.send(lag_notice(&topic, skipped)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Tells a client it missed events on `topic` and must refetch the room
/// state before trusting further events.
fn lag_notice(topic: &str, skipped: u64) -> ServerFrame {
    ServerFrame::Error {
        message: format!("resync {topic}: {skipped} events dropped"),
    }
}
