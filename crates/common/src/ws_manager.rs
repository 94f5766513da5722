//! WebSocket connection manager with heartbeat and reconnection.
//!
//! Owns one logical subscription to an upstream feed. Each session dials,
//! sends the handler's subscribe frame, then forwards incoming text frames
//! to the handler until something fails. Failures are treated as transient:
//! the connection is closed and redialed after a capped linear backoff, and
//! the manager only returns on shutdown.

use crate::error::{Error, Result};
use crate::messages::ControlCommand;
use crate::ws_handler::WsHandler;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::{
    client_async_tls_with_config,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message},
    Connector,
};
use tracing::{debug, error, info, warn};
use url::Url;

/// Configuration for the WebSocket manager.
#[derive(Debug, Clone)]
pub struct WsManagerConfig {
    /// Timeout for TCP connect.
    pub dial_timeout: Duration,
    /// Timeout for writing the subscribe frame.
    pub write_timeout: Duration,
    /// Interval between ping frames.
    pub ping_interval: Duration,
    /// Deadline for the matching pong. A missed pong fails the session,
    /// which is the only liveness check; reads carry no per-read timeout.
    pub pong_timeout: Duration,
    /// Backoff step: sleep `step * failure_count`, capped at `backoff_max`.
    pub backoff_step: Duration,
    /// Maximum reconnection delay.
    pub backoff_max: Duration,
    /// Label for metrics (e.g., "aisstream").
    pub feed_label: String,
}

impl Default for WsManagerConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
            backoff_step: Duration::from_secs(5),
            backoff_max: Duration::from_secs(30),
            feed_label: "unknown".to_string(),
        }
    }
}

/// WebSocket connection manager.
/// Handles connection lifecycle, heartbeat, and reconnection.
pub struct WsManager<H: WsHandler> {
    handler: Arc<H>,
    config: WsManagerConfig,
    command_rx: mpsc::Receiver<ControlCommand>,
    session_id: String,
}

impl<H: WsHandler> WsManager<H> {
    /// Create a new WebSocket manager.
    pub fn new(
        handler: H,
        config: WsManagerConfig,
        command_rx: mpsc::Receiver<ControlCommand>,
        session_id: String,
    ) -> Self {
        Self {
            handler: Arc::new(handler),
            config,
            command_rx,
            session_id,
        }
    }

    /// Run the WebSocket manager. Reconnects on disconnection until shutdown.
    pub async fn run(mut self) -> Result<()> {
        let mut failures: u32 = 0;

        loop {
            match self.session(&mut failures).await {
                Ok(()) => {
                    info!("[{}] WebSocket closed gracefully", self.session_id);
                    return Ok(());
                }
                Err(e) => {
                    counter!("seawatch_feed_errors_total", "feed" => self.config.feed_label.clone(), "error_type" => "disconnect").increment(1);
                    let delay = backoff_delay(&self.config, failures);
                    warn!(
                        "[{}] WebSocket disconnected: {:?}, reconnecting in {:?}",
                        self.session_id, e, delay
                    );
                    self.handler.on_disconnect().await;
                    failures += 1;

                    // A shutdown arriving mid-backoff must not wait the sleep out.
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        cmd = self.command_rx.recv() => {
                            if matches!(cmd, Some(ControlCommand::Shutdown) | None) {
                                info!("[{}] shutdown during backoff", self.session_id);
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    /// One connected session. Returns Ok on shutdown, Err on any transport
    /// failure (which the caller turns into a reconnect).
    async fn session(&mut self, failures: &mut u32) -> Result<()> {
        let url_str = self.handler.url();
        info!("[{}] Connecting to WebSocket: {}", self.session_id, url_str);

        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::Generic("no host in URL".to_string()))?;
        let port = url.port().unwrap_or(443);
        let addr_str = format!("{}:{}", host, port);

        // Resolve DNS and prefer IPv4 to avoid IPv6 timeout issues
        let addrs: Vec<SocketAddr> = addr_str
            .to_socket_addrs()
            .map_err(|e| Error::Generic(format!("DNS resolution failed: {}", e)))?
            .collect();

        let mut sorted_addrs: Vec<SocketAddr> =
            addrs.iter().filter(|a| a.is_ipv4()).copied().collect();
        sorted_addrs.extend(addrs.iter().filter(|a| a.is_ipv6()).copied());

        debug!(
            "[{}] Resolved addresses (IPv4 first): {:?}",
            self.session_id, sorted_addrs
        );

        let mut tcp_stream = None;
        for addr in &sorted_addrs {
            match timeout(self.config.dial_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    debug!("[{}] TCP connected to {}", self.session_id, addr);
                    tcp_stream = Some(stream);
                    break;
                }
                Ok(Err(e)) => {
                    debug!("[{}] TCP connect to {} failed: {}", self.session_id, addr, e);
                }
                Err(_) => {
                    debug!("[{}] TCP connect to {} timed out", self.session_id, addr);
                }
            }
        }

        let tcp_stream =
            tcp_stream.ok_or_else(|| Error::Generic("all connection attempts failed".to_string()))?;

        let mut root_store = rustls::RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs();
        for cert in certs.certs {
            let _ = root_store.add(cert);
        }

        let connector = Connector::Rustls(Arc::new(
            rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Generic(format!("TLS config error: {}", e)))?
            .with_root_certificates(root_store)
            .with_no_client_auth(),
        ));

        let (ws_stream, response) =
            client_async_tls_with_config(url_str, tcp_stream, None, Some(connector)).await?;

        debug!(
            "[{}] WebSocket handshake complete, status: {:?}",
            self.session_id,
            response.status()
        );
        let (mut write, mut read) = ws_stream.split();

        gauge!("seawatch_feed_connections", "feed" => self.config.feed_label.clone()).set(1.0);
        info!("[{}] WebSocket connected", self.session_id);

        if let Some(sub_msg) = self.handler.on_connect_message() {
            debug!("[{}] Sending subscription: {}", self.session_id, sub_msg);
            timeout(self.config.write_timeout, write.send(Message::Text(sub_msg)))
                .await
                .map_err(|_| Error::Timeout("subscribe write"))??;
        }

        self.handler.on_reconnect().await;

        let mut ping_interval = interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping_interval.reset(); // Don't fire immediately

        // Deadline for the pong matching the last ping, None when idle.
        let mut pong_due: Option<Instant> = None;

        let result = loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            counter!("seawatch_feed_messages_received_total", "feed" => self.config.feed_label.clone()).increment(1);
                            *failures = 0;
                            if let Err(e) = self.handler.on_message(&text).await {
                                error!("[{}] Error handling message: {:?}", self.session_id, e);
                                counter!("seawatch_feed_errors_total", "feed" => self.config.feed_label.clone(), "error_type" => "handler").increment(1);
                            }
                        }
                        Some(Ok(Message::Binary(_))) => {
                            debug!("[{}] Ignoring binary frame", self.session_id);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            debug!("[{}] Received ping, sending pong", self.session_id);
                            if let Err(e) = write.send(Message::Pong(data)).await {
                                break Err(Error::WebSocket(e));
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("[{}] Received pong", self.session_id);
                            pong_due = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("[{}] Received close frame: {:?}", self.session_id, frame);
                            break Err(Error::ConnectionClosed);
                        }
                        Some(Ok(Message::Frame(_))) => {
                            // Raw frame, ignore
                        }
                        Some(Err(e)) => {
                            error!("[{}] WebSocket error: {:?}", self.session_id, e);
                            break Err(Error::WebSocket(e));
                        }
                        None => {
                            info!("[{}] WebSocket stream ended", self.session_id);
                            break Err(Error::ConnectionClosed);
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ControlCommand::Shutdown) => {
                            info!("[{}] Received shutdown command", self.session_id);
                            let close_frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: "shutdown".into(),
                            };
                            let _ = write.send(Message::Close(Some(close_frame))).await;
                            break Ok(());
                        }
                        None => {
                            // Command channel closed, treat as shutdown
                            info!("[{}] Command channel closed", self.session_id);
                            break Ok(());
                        }
                    }
                }

                _ = ping_interval.tick() => {
                    debug!("[{}] Sending ping", self.session_id);
                    if let Err(e) = write.send(Message::Ping(vec![])).await {
                        break Err(Error::WebSocket(e));
                    }
                    if pong_due.is_none() {
                        pong_due = Some(Instant::now() + self.config.pong_timeout);
                    }
                }

                _ = maybe_deadline(pong_due) => {
                    // A wedged read surfaces here and becomes a reconnect.
                    warn!("[{}] Pong deadline missed", self.session_id);
                    break Err(Error::Timeout("pong"));
                }
            }
        };

        gauge!("seawatch_feed_connections", "feed" => self.config.feed_label.clone()).set(0.0);
        result
    }
}

/// Sleep until the deadline, or forever when there is none.
async fn maybe_deadline(due: Option<Instant>) {
    match due {
        Some(t) => tokio::time::sleep_until(t).await,
        None => std::future::pending().await,
    }
}

/// Reconnect delay: `step * failures`, capped. The first retry is immediate.
fn backoff_delay(config: &WsManagerConfig, failures: u32) -> Duration {
    (config.backoff_step * failures).min(config.backoff_max)
}
