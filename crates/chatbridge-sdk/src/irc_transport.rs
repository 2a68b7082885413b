//! IRC-over-WebSocket implementation of [`ChatTransport`].
//!
//! One spawned task owns the socket.  The public methods talk to it through
//! a command channel; inbound `PRIVMSG` lines leave through the event
//! channel handed out by [`ChatTransport::connect`].
//!
//! After the first successful login, a dropped connection is re-established
//! by the socket task after [`IrcTransportConfig::reconnect_interval`] with
//! the same handshake.  Pings issued while disconnected fail with
//! [`SessionError::Disconnected`].

use std::collections::VecDeque;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chatbridge_models::{Channel, ChatEvent, ChatIdentity, RemoteEndpoint};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use crate::error::SessionError;
use crate::irc::IrcLine;
use crate::transport::{ChatTransport, Connected};

/// Public chat server endpoint.
pub const DEFAULT_CHAT_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

const CAPABILITIES: &str = "CAP REQ :twitch.tv/tags twitch.tv/commands";
const PING_LINE: &str = "PING :tmi.twitch.tv";
const LOGIN_FAILURES: [&str; 2] = ["Login authentication failed", "Improperly formatted auth"];

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Settings for [`IrcTransport`].
#[derive(Debug, Clone)]
pub struct IrcTransportConfig {
    /// WebSocket URL of the chat server (`ws://` or `wss://`).
    pub url: String,
    /// Pause before re-establishing a dropped connection.
    pub reconnect_interval: Duration,
    /// How long [`ChatTransport::ping`] waits for the `PONG`.
    pub ping_timeout: Duration,
    /// How long a login waits for the `001` welcome.
    pub welcome_timeout: Duration,
}

impl Default for IrcTransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHAT_URL.to_string(),
            reconnect_interval: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(10),
            welcome_timeout: Duration::from_secs(10),
        }
    }
}

impl IrcTransportConfig {
    /// Defaults, with the server URL overridable through `CHATBRIDGE_CHAT_URL`.
    pub fn from_env() -> Self {
        match std::env::var("CHATBRIDGE_CHAT_URL") {
            Ok(url) if !url.trim().is_empty() => Self {
                url,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }
}

enum Command {
    Send(String),
    Ping(oneshot::Sender<Result<Duration, SessionError>>),
}

struct PendingPing {
    sent_at: Instant,
    reply: oneshot::Sender<Result<Duration, SessionError>>,
}

/// Why the socket pump stopped.
enum Stop {
    /// The transport or the event consumer went away.
    Shutdown,
    /// The connection dropped; try again.
    Lost(String),
}

/// Chat client speaking the server's IRC dialect over a WebSocket.
pub struct IrcTransport {
    config: IrcTransportConfig,
    commands: OnceLock<mpsc::Sender<Command>>,
}

impl IrcTransport {
    /// Create an unconnected transport.
    pub fn new(config: IrcTransportConfig) -> Self {
        Self {
            config,
            commands: OnceLock::new(),
        }
    }

    fn commands(&self) -> Result<&mpsc::Sender<Command>, SessionError> {
        self.commands.get().ok_or(SessionError::Disconnected)
    }
}

impl std::fmt::Debug for IrcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcTransport")
            .field("config", &self.config)
            .field("connected", &self.commands.get().is_some())
            .finish()
    }
}

#[async_trait]
impl ChatTransport for IrcTransport {
    async fn connect(
        &self,
        identity: &ChatIdentity,
        channels: &[Channel],
    ) -> Result<Connected, SessionError> {
        if self.commands.get().is_some() {
            return Err(SessionError::EstablishFailed(
                "transport is already connected".into(),
            ));
        }

        let endpoint = endpoint_from_url(&self.config.url)?;
        let ws = login(&self.config, identity, channels).await?;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (events_tx, events_rx) = mpsc::channel(256);
        if self.commands.set(cmd_tx).is_err() {
            return Err(SessionError::EstablishFailed(
                "transport is already connected".into(),
            ));
        }

        info!(
            endpoint = %endpoint,
            username = %identity.username,
            channels = channels.len(),
            "logged in to chat server"
        );

        tokio::spawn(drive(
            ws,
            cmd_rx,
            events_tx,
            self.config.clone(),
            identity.clone(),
            channels.to_vec(),
        ));

        Ok(Connected {
            endpoint,
            events: events_rx,
        })
    }

    async fn ping(&self) -> Result<Duration, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands()?
            .send(Command::Ping(reply_tx))
            .await
            .map_err(|_| SessionError::Disconnected)?;

        match tokio::time::timeout(self.config.ping_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(SessionError::Disconnected),
            Err(_) => Err(SessionError::PingTimeout(self.config.ping_timeout)),
        }
    }

    async fn say(&self, channel: &Channel, text: &str) -> Result<(), SessionError> {
        let text = text.replace(['\r', '\n'], " ");
        self.commands()?
            .send(Command::Send(format!("PRIVMSG {channel} :{text}")))
            .await
            .map_err(|_| SessionError::Disconnected)
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

fn endpoint_from_url(url: &str) -> Result<RemoteEndpoint, SessionError> {
    let invalid = |reason: &str| SessionError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri = url.parse::<Uri>().map_err(|e| invalid(&e.to_string()))?;
    let default_port = match uri.scheme_str() {
        Some("wss") => 443,
        Some("ws") => 80,
        _ => return Err(invalid("expected a ws:// or wss:// URL")),
    };
    let host = uri.host().ok_or_else(|| invalid("missing host"))?;

    Ok(RemoteEndpoint::new(host, uri.port_u16().unwrap_or(default_port)))
}

/// Open the socket, authenticate, wait for the welcome and join `channels`.
async fn login(
    config: &IrcTransportConfig,
    identity: &ChatIdentity,
    channels: &[Channel],
) -> Result<WsStream, SessionError> {
    let (mut ws, _) = connect_async(config.url.as_str())
        .await
        .map_err(|e| SessionError::EstablishFailed(format!("{}: {e}", config.url)))?;

    let token = identity.access_token.as_str();
    let token = token.strip_prefix("oauth:").unwrap_or(token);
    for line in [
        CAPABILITIES.to_string(),
        format!("PASS oauth:{token}"),
        format!("NICK {}", identity.username),
    ] {
        ws.send(Message::Text(line.into())).await?;
    }

    tokio::time::timeout(config.welcome_timeout, await_welcome(&mut ws))
        .await
        .map_err(|_| {
            SessionError::EstablishFailed(format!(
                "no welcome from {} within {:?}",
                config.url, config.welcome_timeout
            ))
        })??;

    for channel in channels {
        ws.send(Message::Text(format!("JOIN {channel}").into()))
            .await?;
        debug!(channel = %channel, "joined");
    }

    Ok(ws)
}

async fn await_welcome(ws: &mut WsStream) -> Result<(), SessionError> {
    while let Some(msg) = ws.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                return Err(SessionError::EstablishFailed(format!(
                    "server closed the connection during login: {frame:?}"
                )));
            }
            Ok(_) => continue,
            Err(e) => return Err(SessionError::EstablishFailed(e.to_string())),
        };

        for raw in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(line) = IrcLine::parse(raw) else {
                continue;
            };
            match line.command {
                "001" => return Ok(()),
                "NOTICE" => {
                    let notice = line.trailing().unwrap_or_default();
                    if LOGIN_FAILURES.iter().any(|f| notice.contains(f)) {
                        return Err(SessionError::LoginRejected(notice.to_string()));
                    }
                    debug!(notice, "server notice during login");
                }
                "PING" => {
                    let token = line.trailing().unwrap_or("tmi.twitch.tv");
                    ws.send(Message::Text(format!("PONG :{token}").into()))
                        .await?;
                }
                _ => trace!(line = raw, "login chatter"),
            }
        }
    }

    Err(SessionError::EstablishFailed(
        "connection ended before the welcome".into(),
    ))
}

// ---------------------------------------------------------------------------
// Socket task
// ---------------------------------------------------------------------------

async fn drive(
    mut ws: WsStream,
    mut commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<ChatEvent>,
    config: IrcTransportConfig,
    identity: ChatIdentity,
    channels: Vec<Channel>,
) {
    let mut pending = VecDeque::new();

    loop {
        let reason = match pump(&mut ws, &mut commands, &events, &mut pending).await {
            Stop::Shutdown => {
                debug!("chat transport shutting down");
                let _ = ws.close(None).await;
                return;
            }
            Stop::Lost(reason) => reason,
        };

        for ping in pending.drain(..) {
            let _ = ping.reply.send(Err(SessionError::Disconnected));
        }
        warn!(reason = %reason, url = %config.url, "chat connection lost");

        ws = loop {
            if !wait_disconnected(config.reconnect_interval, &mut commands).await {
                return;
            }
            match login(&config, &identity, &channels).await {
                Ok(ws) => {
                    info!(url = %config.url, "chat connection re-established");
                    break ws;
                }
                Err(e) => warn!(error = %e, "reconnect attempt failed"),
            }
        };
    }
}

/// Serve one live connection until it drops or the transport shuts down.
async fn pump(
    ws: &mut WsStream,
    commands: &mut mpsc::Receiver<Command>,
    events: &mpsc::Sender<ChatEvent>,
    pending: &mut VecDeque<PendingPing>,
) -> Stop {
    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let line = match cmd {
                    Some(Command::Send(line)) => line,
                    Some(Command::Ping(reply)) => {
                        pending.push_back(PendingPing { sent_at: Instant::now(), reply });
                        PING_LINE.to_string()
                    }
                    None => return Stop::Shutdown,
                };
                if let Err(e) = ws.send(Message::Text(line.into())).await {
                    return Stop::Lost(e.to_string());
                }
            }
            msg = ws.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws.send(Message::Pong(data)).await {
                            return Stop::Lost(e.to_string());
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Stop::Lost(format!("server closed the connection: {frame:?}"));
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Stop::Lost(e.to_string()),
                    None => return Stop::Lost("stream ended".into()),
                };

                for raw in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    let Some(line) = IrcLine::parse(raw) else {
                        debug!(line = raw, "unparseable line");
                        continue;
                    };
                    match line.command {
                        "PRIVMSG" => {
                            let Some(event) = line.to_chat_event(raw) else {
                                continue;
                            };
                            if events.send(event).await.is_err() {
                                return Stop::Shutdown;
                            }
                        }
                        "PING" => {
                            let token = line.trailing().unwrap_or("tmi.twitch.tv");
                            let pong = Message::Text(format!("PONG :{token}").into());
                            if let Err(e) = ws.send(pong).await {
                                return Stop::Lost(e.to_string());
                            }
                        }
                        "PONG" => complete_ping(pending),
                        "RECONNECT" => return Stop::Lost("server requested a reconnect".into()),
                        "NOTICE" => info!(notice = line.trailing().unwrap_or_default(), "server notice"),
                        _ => trace!(line = raw, "ignored"),
                    }
                }
            }
        }
    }
}

fn complete_ping(pending: &mut VecDeque<PendingPing>) {
    // Entries whose caller already timed out are skipped.
    while let Some(ping) = pending.pop_front() {
        if ping.reply.is_closed() {
            continue;
        }
        let _ = ping.reply.send(Ok(ping.sent_at.elapsed()));
        return;
    }
}

/// Sleep out the reconnect interval, failing any command that arrives
/// meanwhile.  Returns `false` once the transport is gone.
async fn wait_disconnected(interval: Duration, commands: &mut mpsc::Receiver<Command>) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return true,
            cmd = commands.recv() => match cmd {
                Some(Command::Ping(reply)) => {
                    let _ = reply.send(Err(SessionError::Disconnected));
                }
                Some(Command::Send(_)) => debug!("dropping outbound line while disconnected"),
                None => return false,
            },
        }
    }
}
