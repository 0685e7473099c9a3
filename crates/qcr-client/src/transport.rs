//! WebSocket transport: owns the one connection and its lifecycle.
//!
//! A connection is driven by a single task that multiplexes outbound frames
//! (from an unbounded channel) and inbound frames (from the socket). Inbound
//! text frames go to an [`InboundHandler`]; when the connection ends, by
//! either side, the handler's `on_close` runs exactly once.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::errors::RpcError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of the client's connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected.
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Open and usable.
    Connected,
    /// Closed by either side; a fresh `open` is needed.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        })
    }
}

/// Receives the transport's inbound events.
pub trait InboundHandler: Send + Sync + 'static {
    /// A text frame arrived.
    fn on_message(&self, frame: &str);
    /// The connection ended. Called once per connection.
    fn on_close(&self);
}

enum Outbound {
    Frame(String),
    Close,
}

/// One dialled connection.
struct Link {
    id: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
}

struct Shared {
    handler: Arc<dyn InboundHandler>,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Option<Arc<Link>>>,
    /// Bumped by every `close()`, under the `link` lock.
    closes: AtomicU64,
}

impl Shared {
    /// Tear down `link` once, no matter how many paths race to close it.
    fn finish(&self, link: &Link, reason: &str) {
        if link.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let was_current = {
            let mut current = self.link.lock();
            let is_current = current.as_ref().is_some_and(|l| l.id == link.id);
            if is_current {
                *current = None;
            }
            is_current
        };
        if was_current {
            let _ = self.state.send_replace(ConnectionState::Closed);
        }
        info!(connection = link.id, reason, "connection closed");
        self.handler.on_close();
    }
}

/// The client's single duplex channel to the backend.
pub struct WsTransport {
    url: String,
    connect_timeout: Duration,
    shared: Arc<Shared>,
    dial: tokio::sync::Mutex<()>,
    /// Completed dial attempts, successful or not.
    dials: AtomicU64,
    /// Failure of the most recent dial; cleared when a dial succeeds.
    last_dial_error: Mutex<Option<RpcError>>,
    next_link_id: AtomicU64,
}

impl WsTransport {
    /// Create a transport for `url`. Nothing is dialled until [`open`](Self::open).
    pub fn new(
        url: impl Into<String>,
        connect_timeout: Duration,
        handler: Arc<dyn InboundHandler>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.into(),
            connect_timeout,
            shared: Arc::new(Shared {
                handler,
                state,
                link: Mutex::new(None),
                closes: AtomicU64::new(0),
            }),
            dial: tokio::sync::Mutex::new(()),
            dials: AtomicU64::new(0),
            last_dial_error: Mutex::new(None),
            next_link_id: AtomicU64::new(1),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Open the connection.
    ///
    /// Resolves immediately when already connected. Callers that arrive
    /// while a dial is in flight wait for it and share its outcome, failure
    /// included. A `close()` issued before the dial completes wins: the new
    /// socket is shut and the call fails.
    pub async fn open(&self) -> Result<(), RpcError> {
        if self.state() == ConnectionState::Connected {
            return Ok(());
        }
        let dials_seen = self.dials.load(Ordering::Acquire);
        let _dial = self.dial.lock().await;
        let previous = self.state();
        if previous == ConnectionState::Connected {
            return Ok(());
        }
        if self.dials.load(Ordering::Acquire) != dials_seen {
            if let Some(err) = self.last_dial_error.lock().clone() {
                return Err(err);
            }
        }

        let closes_seen = self.shared.closes.load(Ordering::Acquire);
        let _ = self.shared.state.send_replace(ConnectionState::Connecting);
        info!(url = %self.url, "connecting");
        let outcome = self.dial_socket().await;
        let result = match outcome {
            Ok(ws) => self.install(ws, closes_seen).await,
            Err(err) => {
                warn!(url = %self.url, error = %err, "connection failed");
                if self.shared.closes.load(Ordering::Acquire) == closes_seen {
                    let _ = self.shared.state.send_replace(previous);
                }
                Err(err)
            }
        };

        *self.last_dial_error.lock() = result.as_ref().err().cloned();
        let _ = self.dials.fetch_add(1, Ordering::AcqRel);
        result
    }

    /// Make `ws` the live connection unless a close arrived during the dial.
    async fn install(&self, mut ws: WsStream, closes_seen: u64) -> Result<(), RpcError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = {
            let mut slot = self.shared.link.lock();
            if self.shared.closes.load(Ordering::Acquire) == closes_seen {
                let link = Arc::new(Link {
                    id: self.next_link_id.fetch_add(1, Ordering::Relaxed),
                    outbound: tx,
                    closed: AtomicBool::new(false),
                });
                *slot = Some(Arc::clone(&link));
                let _ = self.shared.state.send_replace(ConnectionState::Connected);
                Some(link)
            } else {
                None
            }
        };

        let Some(link) = link else {
            warn!(url = %self.url, "closed while connecting, dropping new socket");
            let _ = ws.close(None).await;
            return Err(RpcError::Connection {
                url: self.url.clone(),
                reason: "closed while connecting".to_owned(),
            });
        };
        info!(url = %self.url, connection = link.id, "connected");

        drop(tokio::spawn(connection_loop(
            ws,
            rx,
            link,
            Arc::clone(&self.shared),
        )));
        Ok(())
    }

    async fn dial_socket(&self) -> Result<WsStream, RpcError> {
        let failed = |reason: String| RpcError::Connection {
            url: self.url.clone(),
            reason,
        };
        match tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
            Ok(Ok((ws, _response))) => Ok(ws),
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(_) => Err(failed(format!(
                "timed out after {}ms",
                self.connect_timeout.as_millis()
            ))),
        }
    }

    /// Queue a text frame for sending.
    pub fn send(&self, frame: String) -> Result<(), RpcError> {
        let link = self.shared.link.lock().clone();
        match link {
            Some(link) if self.state() == ConnectionState::Connected => link
                .outbound
                .send(Outbound::Frame(frame))
                .map_err(|_| RpcError::NotConnected),
            _ => Err(RpcError::NotConnected),
        }
    }

    /// Close the connection. Pending calls are failed through the handler's
    /// `on_close` before this returns.
    pub fn close(&self) {
        let link = {
            let slot = self.shared.link.lock();
            let _ = self.shared.closes.fetch_add(1, Ordering::AcqRel);
            if slot.is_none() {
                let _ = self.shared.state.send_replace(ConnectionState::Closed);
            }
            slot.clone()
        };
        if let Some(link) = link {
            let _ = link.outbound.send(Outbound::Close);
            self.shared.finish(&link, "closed by client");
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(link) = self.shared.link.lock().as_ref() {
            let _ = link.outbound.send(Outbound::Close);
        }
    }
}

async fn connection_loop(
    ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    link: Arc<Link>,
    shared: Arc<Shared>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let reason = loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = ws_tx.send(Message::text(text)).await {
                        break format!("send failed: {e}");
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break "closed by client".to_owned();
                }
            },
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => shared.handler.on_message(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(f) => format!(
                            "closed by server: {} {}",
                            u16::from(f.code),
                            f.reason.as_str()
                        ),
                        None => "closed by server".to_owned(),
                    };
                }
                Some(Ok(Message::Binary(bytes))) => {
                    debug!(len = bytes.len(), "ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("read failed: {e}"),
                None => break "stream ended".to_owned(),
            },
        }
    };

    shared.finish(&link, &reason);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
