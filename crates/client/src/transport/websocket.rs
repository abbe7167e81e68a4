use futures::{SinkExt, StreamExt};
use snafu::{OptionExt, ResultExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::connection::{ChannelEvent, ClientEvent, RealtimeChannel};
use crate::error::{
    ChannelClosedSnafu, ClientResult, ConnectionLostSnafu, HandshakeRejectedSnafu,
    InvalidUrlSnafu, UnsupportedSchemeSnafu, WebSocketSnafu,
};
use crate::transport::socketio::{self, CONNECT_FRAME, OpenHandshake, PONG_FRAME, Packet};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Derives the Socket.IO websocket endpoint from the server's HTTP base URL.
pub fn socket_url(server_url: &str) -> ClientResult<Url> {
    let mut url = Url::parse(server_url).context(InvalidUrlSnafu {
        stage: "parse-server-url",
        raw: server_url.to_string(),
    })?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return UnsupportedSchemeSnafu {
                stage: "derive-socket-url",
                raw: server_url.to_string(),
                scheme: other.to_string(),
            }
            .fail();
        }
    };
    if url.set_scheme(scheme).is_err() {
        return UnsupportedSchemeSnafu {
            stage: "derive-socket-url",
            raw: server_url.to_string(),
            scheme: url.scheme().to_string(),
        }
        .fail();
    }

    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}/socket.io/"));
    url.set_query(Some("EIO=4&transport=websocket"));
    url.set_fragment(None);
    Ok(url)
}

/// Socket.IO client channel over a single websocket.
///
/// Each `connect` spawns one connection task. The task reports `Opened`,
/// `ConnectFailed` or `Closed` to the inbox and forwards decoded server
/// events in between. Outbound frames travel through an unbounded queue
/// owned by the current task.
pub struct WebSocketChannel {
    url: Url,
    inbox: UnboundedSender<ChannelEvent>,
    outbound: Option<UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketChannel {
    pub fn new(url: Url, inbox: UnboundedSender<ChannelEvent>) -> Self {
        Self {
            url,
            inbox,
            outbound: None,
            task: None,
        }
    }
}

impl RealtimeChannel for WebSocketChannel {
    fn connect(&mut self) {
        // A previous task may still be winding down after reporting its end.
        if let Some(stale) = self.task.take() {
            tracing::debug!(url = %self.url, "replacing previous connection task");
            stale.abort();
        }
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        self.outbound = Some(outbound);
        let url = self.url.clone();
        let inbox = self.inbox.clone();
        self.task = Some(tokio::spawn(connection_task(url, outbound_rx, inbox)));
    }

    fn disconnect(&mut self) {
        self.outbound = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn send(&mut self, event: &ClientEvent) -> ClientResult<()> {
        let frame = socketio::encode_client_event(event)?;
        let outbound = self
            .outbound
            .as_ref()
            .context(ChannelClosedSnafu { stage: "send-frame" })?;
        outbound
            .send(frame)
            .ok()
            .context(ChannelClosedSnafu { stage: "send-frame" })
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn connection_task(
    url: Url,
    mut outbound_rx: UnboundedReceiver<String>,
    inbox: UnboundedSender<ChannelEvent>,
) {
    let (socket, handshake) = match open_session(&url).await {
        Ok(session) => session,
        Err(error) => {
            tracing::warn!(%url, %error, "socket session failed to open");
            let _ = inbox.send(ChannelEvent::ConnectFailed {
                reason: error.to_string(),
            });
            return;
        }
    };

    tracing::info!(%url, sid = %handshake.sid, "socket session open");
    if inbox.send(ChannelEvent::Opened).is_err() {
        return;
    }

    let reason = match pump(socket, &handshake, &mut outbound_rx, &inbox).await {
        Ok(()) => "closed by client".to_string(),
        Err(error) => error.to_string(),
    };
    tracing::info!(%url, %reason, "socket session closed");
    let _ = inbox.send(ChannelEvent::Closed { reason });
}

/// Runs the Engine.IO open and Socket.IO namespace handshakes.
async fn open_session(url: &Url) -> ClientResult<(Socket, OpenHandshake)> {
    let (mut socket, _) = connect_async(url.as_str())
        .await
        .context(WebSocketSnafu { stage: "connect" })?;

    let mut handshake = None;
    while let Some(message) = socket.next().await {
        let message = message.context(WebSocketSnafu {
            stage: "read-handshake",
        })?;
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match socketio::decode_packet(&text)? {
            Packet::Open(open) => {
                tracing::debug!(
                    sid = %open.sid,
                    ping_interval = open.ping_interval,
                    "engine session open"
                );
                handshake = Some(open);
                socket
                    .send(Message::Text(CONNECT_FRAME.to_string()))
                    .await
                    .context(WebSocketSnafu {
                        stage: "send-namespace-connect",
                    })?;
            }
            Packet::Ping => {
                socket
                    .send(Message::Text(PONG_FRAME.to_string()))
                    .await
                    .context(WebSocketSnafu { stage: "send-pong" })?;
            }
            Packet::Connect => {
                let handshake = handshake.context(HandshakeRejectedSnafu {
                    stage: "namespace-connect",
                    details: "namespace joined before the engine handshake",
                })?;
                return Ok((socket, handshake));
            }
            Packet::ConnectError(details) => {
                return HandshakeRejectedSnafu {
                    stage: "namespace-connect",
                    details,
                }
                .fail();
            }
            Packet::Close | Packet::Disconnect => break,
            other => tracing::trace!(?other, "frame ignored during handshake"),
        }
    }

    HandshakeRejectedSnafu {
        stage: "namespace-connect",
        details: "server closed the connection during the handshake",
    }
    .fail()
}

async fn pump(
    socket: Socket,
    handshake: &OpenHandshake,
    outbound_rx: &mut UnboundedReceiver<String>,
    inbox: &UnboundedSender<ChannelEvent>,
) -> ClientResult<()> {
    let (mut write, mut read) = socket.split();
    let liveness = handshake.liveness_window();
    let deadline = tokio::time::sleep(liveness);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            incoming = read.next() => {
                let message = match incoming {
                    Some(message) => message.context(WebSocketSnafu { stage: "read-frame" })?,
                    None => {
                        return ConnectionLostSnafu {
                            stage: "read-frame",
                            details: "transport closed",
                        }
                        .fail();
                    }
                };
                let text = match message {
                    Message::Text(text) => text,
                    Message::Close(_) => {
                        return ConnectionLostSnafu {
                            stage: "read-frame",
                            details: "server closed the websocket",
                        }
                        .fail();
                    }
                    _ => continue,
                };
                deadline.as_mut().reset(Instant::now() + liveness);

                let packet = match socketio::decode_packet(&text) {
                    Ok(packet) => packet,
                    Err(error) => {
                        tracing::debug!(%error, "skipping malformed frame");
                        continue;
                    }
                };
                match packet {
                    Packet::Ping => {
                        write
                            .send(Message::Text(PONG_FRAME.to_string()))
                            .await
                            .context(WebSocketSnafu { stage: "send-pong" })?;
                    }
                    Packet::Event { name, data } => {
                        let event = match socketio::decode_server_event(name.clone(), data) {
                            Ok(event) => event,
                            Err(error) => {
                                tracing::debug!(
                                    event = %name,
                                    %error,
                                    "skipping unknown server event"
                                );
                                continue;
                            }
                        };
                        if inbox.send(ChannelEvent::Server(event)).is_err() {
                            return Ok(());
                        }
                    }
                    Packet::Close | Packet::Disconnect => {
                        return ConnectionLostSnafu {
                            stage: "read-frame",
                            details: "server ended the session",
                        }
                        .fail();
                    }
                    other => tracing::trace!(?other, "frame ignored"),
                }
            }
            outgoing = outbound_rx.recv() => {
                let Some(frame) = outgoing else {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                };
                write
                    .send(Message::Text(frame))
                    .await
                    .context(WebSocketSnafu { stage: "send-frame" })?;
            }
            () = &mut deadline => {
                return ConnectionLostSnafu {
                    stage: "await-ping",
                    details: format!("no ping within {}ms", liveness.as_millis()),
                }
                .fail();
            }
        }
    }
}
