//! The managed WebSocket channel.
//!
//! [`spawn_socket`] runs one connection state machine in a dedicated tokio
//! task: dial, keepalive, reconnect with capped backoff, terminal stop.
//! The task owns every timer it starts; dropping a session sleep or the
//! keepalive interval on any exit path is the teardown, so no timer can
//! outlive the phase that armed it.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use obyava_shared::constants::{KEEPALIVE_FRAME, KEEPALIVE_INTERVAL_SECS};

use crate::backoff::ReconnectPolicy;

/// Lifecycle state of the channel. Owned exclusively by the socket task;
/// everyone else observes it through the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Commands sent *into* the socket task.
#[derive(Debug)]
pub enum SocketCommand {
    /// Ensure a live channel exists. No-op while open or connecting; while
    /// a reconnect delay is pending this cancels the timer and dials now.
    Connect,
    /// Tear the channel down and stop reconnecting until the next
    /// `Connect`.
    Disconnect,
    /// Transmit a text frame. Dropped with a log if the channel is not
    /// open; nothing is queued.
    Send(String),
}

/// Notifications sent *from* the socket task.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketNotification {
    /// The channel opened (first connect or reconnect).
    Opened,
    /// A text frame arrived.
    Frame(String),
    /// The channel closed; an automatic reconnect may follow.
    Closed,
    /// The attempt cap was reached. No further automatic retries; only an
    /// explicit `connect()` re-arms the machine.
    RetriesExhausted,
}

/// Endpoint, credential and retry configuration for one channel.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Base `ws://`/`wss://` URL including the path, without query string.
    pub endpoint: String,
    /// Bearer credential, appended as `?token=`. The task refuses to dial
    /// without one.
    pub token: Option<String>,
    pub keepalive: Duration,
    pub reconnect: ReconnectPolicy,
}

impl SocketConfig {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            keepalive: Duration::from_secs(KEEPALIVE_INTERVAL_SECS),
            reconnect: ReconnectPolicy::standard(),
        }
    }

    fn url(&self) -> Option<String> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        Some(format!("{}?token={}", self.endpoint, token))
    }
}

/// Outbound seam the engines talk through, so they can be exercised
/// against a recording sink in tests.
pub trait FrameSink: Send + Sync {
    fn can_send(&self) -> bool;
    fn send_text(&self, frame: String);
}

/// Cloneable handle to a spawned socket task. The task ends once every
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    cmd_tx: mpsc::UnboundedSender<SocketCommand>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SocketHandle {
    pub fn connect(&self) {
        let _ = self.cmd_tx.send(SocketCommand::Connect);
    }

    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(SocketCommand::Disconnect);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn can_send(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Transmit a text frame if the channel is open, else drop it with a
    /// log. Callers must not assume delivery; check [`Self::can_send`]
    /// first to surface "not connected" to the user.
    pub fn send(&self, frame: impl Into<String>) {
        let frame = frame.into();
        if !self.can_send() {
            warn!(len = frame.len(), "dropping outbound frame, channel not open");
            return;
        }
        let _ = self.cmd_tx.send(SocketCommand::Send(frame));
    }
}

impl FrameSink for SocketHandle {
    fn can_send(&self) -> bool {
        SocketHandle::can_send(self)
    }

    fn send_text(&self, frame: String) {
        self.send(frame);
    }
}

/// Spawn the socket task for one channel.
///
/// Returns the command handle and the notification stream. The task starts
/// parked; call [`SocketHandle::connect`] to dial.
pub fn spawn_socket(
    config: SocketConfig,
) -> (SocketHandle, mpsc::UnboundedReceiver<SocketNotification>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (notif_tx, notif_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);

    tokio::spawn(run_socket(config, cmd_rx, notif_tx, state_tx));

    (SocketHandle { cmd_tx, state_rx }, notif_rx)
}

enum SessionEnd {
    /// Server closed or the transport failed; backoff applies.
    RemoteClose,
    /// Explicit `Disconnect`; park until the next `Connect`.
    LocalClose,
    /// Every handle dropped; the task is done.
    HandlesGone,
}

async fn run_socket(
    config: SocketConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<SocketCommand>,
    notif_tx: mpsc::UnboundedSender<SocketNotification>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut policy = config.reconnect.clone();

    'idle: loop {
        // Parked: no channel, no pending retry.
        match cmd_rx.recv().await {
            None => break 'idle,
            Some(SocketCommand::Connect) => {}
            Some(SocketCommand::Disconnect) => continue 'idle,
            Some(SocketCommand::Send(frame)) => {
                warn!(len = frame.len(), "dropping outbound frame, channel not open");
                continue 'idle;
            }
        }

        let Some(url) = config.url() else {
            warn!(endpoint = %config.endpoint, "refusing to dial without a credential");
            continue 'idle;
        };

        policy.reset();

        'session: loop {
            let _ = state_tx.send(ConnectionState::Connecting);

            match connect_async(&url).await {
                Ok((stream, _)) => {
                    info!(endpoint = %config.endpoint, "channel open");
                    policy.reset();
                    let _ = state_tx.send(ConnectionState::Open);
                    let _ = notif_tx.send(SocketNotification::Opened);

                    let outcome = drive(stream, &config, &mut cmd_rx, &notif_tx, &state_tx).await;

                    let _ = state_tx.send(ConnectionState::Closed);
                    let _ = notif_tx.send(SocketNotification::Closed);
                    info!(endpoint = %config.endpoint, "channel closed");

                    match outcome {
                        SessionEnd::RemoteClose => {}
                        SessionEnd::LocalClose => break 'session,
                        SessionEnd::HandlesGone => return,
                    }
                }
                Err(e) => {
                    warn!(endpoint = %config.endpoint, error = %e, "connect failed");
                    let _ = state_tx.send(ConnectionState::Closed);
                }
            }

            // At most one pending retry timer exists at a time; a Connect
            // command cancels it and dials immediately.
            let Some(delay) = policy.next_delay() else {
                error!(
                    endpoint = %config.endpoint,
                    attempts = policy.attempts(),
                    "reconnect attempts exhausted"
                );
                let _ = notif_tx.send(SocketNotification::RetriesExhausted);
                break 'session;
            };
            debug!(
                endpoint = %config.endpoint,
                delay_ms = delay.as_millis() as u64,
                attempt = policy.attempts(),
                "reconnect scheduled"
            );

            let retry = sleep(delay);
            tokio::pin!(retry);
            loop {
                tokio::select! {
                    _ = &mut retry => break,
                    cmd = cmd_rx.recv() => match cmd {
                        None => return,
                        Some(SocketCommand::Connect) => break,
                        Some(SocketCommand::Disconnect) => break 'session,
                        Some(SocketCommand::Send(frame)) => {
                            warn!(len = frame.len(), "dropping outbound frame, channel not open");
                        }
                    }
                }
            }
        }
    }
}

async fn drive(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    config: &SocketConfig,
    cmd_rx: &mut mpsc::UnboundedReceiver<SocketCommand>,
    notif_tx: &mpsc::UnboundedSender<SocketNotification>,
    state_tx: &watch::Sender<ConnectionState>,
) -> SessionEnd {
    let (mut sink, mut source) = stream.split();

    // First tick one full period after open.
    let mut keepalive = interval_at(Instant::now() + config.keepalive, config.keepalive);

    loop {
        tokio::select! {
            _ = keepalive.tick() => {
                if sink.send(Message::Text(KEEPALIVE_FRAME.into())).await.is_err() {
                    return SessionEnd::RemoteClose;
                }
            }

            cmd = cmd_rx.recv() => match cmd {
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::HandlesGone;
                }
                Some(SocketCommand::Connect) => {
                    debug!(endpoint = %config.endpoint, "connect while open is a no-op");
                }
                Some(SocketCommand::Disconnect) => {
                    let _ = state_tx.send(ConnectionState::Closing);
                    let _ = sink.send(Message::Close(None)).await;
                    return SessionEnd::LocalClose;
                }
                Some(SocketCommand::Send(frame)) => {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        return SessionEnd::RemoteClose;
                    }
                }
            },

            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = notif_tx.send(SocketNotification::Frame(text));
                }
                Some(Ok(Message::Close(_))) | None => return SessionEnd::RemoteClose,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(endpoint = %config.endpoint, error = %e, "socket error");
                    return SessionEnd::RemoteClose;
                }
            },
        }
    }
}
