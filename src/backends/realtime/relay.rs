// SPDX-License-Identifier: GPL-3.0-only

//! WebSocket relay server
//!
//! Fans broadcasts out to every other member of the same channel name.
//! Each connection may join any number of channels. Frames are JSON text
//! messages tagged by `type`:
//!
//! ```text
//! client ─▶ {"type":"join","channel":"..."}
//!        ◀─ {"type":"joined","channel":"..."}
//! client ─▶ {"type":"broadcast","channel":"...","event":"...","payload":{..}}
//!        ◀─ (same frame, to every other member)
//! client ─▶ {"type":"leave","channel":"..."}
//! ```

use super::local::{Envelope, LocalHub, Membership};
use super::BroadcastEvent;
use crate::errors::ChannelError;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Pause after an accept failure not tied to one connection, such as
/// running out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(250);

/// Frames exchanged between relay and clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    Join {
        channel: String,
    },
    Joined {
        channel: String,
    },
    Broadcast {
        channel: String,
        event: String,
        payload: serde_json::Value,
    },
    Leave {
        channel: String,
    },
    Error {
        message: String,
    },
}

impl RelayFrame {
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|e| ChannelError::Protocol(e.to_string()))
    }

    pub fn to_message(&self) -> Result<Message, ChannelError> {
        let text = serde_json::to_string(self).map_err(|e| ChannelError::Protocol(e.to_string()))?;
        Ok(Message::Text(text.into()))
    }
}

/// WebSocket relay server
pub struct RelayServer {
    listener: TcpListener,
    hub: LocalHub,
}

impl RelayServer {
    /// Bind to `addr` (use port 0 for an ephemeral port)
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Relay listening");
        Ok(Self {
            listener,
            hub: LocalHub::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The hub the relay fans out through
    pub fn hub(&self) -> &LocalHub {
        &self.hub
    }

    /// Accept connections forever
    ///
    /// Accept errors are logged and the loop keeps going.
    pub async fn run(self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    let pause = accept_backoff(&e);
                    warn!(error = %e, pause_ms = pause.as_millis() as u64, "Relay accept failed");
                    tokio::time::sleep(pause).await;
                    continue;
                }
            };
            let hub = self.hub.clone();
            let connection = uuid::Uuid::new_v4();
            tokio::spawn(async move {
                debug!(%peer, %connection, "Relay client connected");
                match serve_connection(hub, stream).await {
                    Ok(()) => debug!(%peer, %connection, "Relay client disconnected"),
                    Err(e) => warn!(%peer, %connection, error = %e, "Relay client dropped"),
                }
            });
        }
    }
}

/// How long to wait before accepting again after `error`
fn accept_backoff(error: &std::io::Error) -> Duration {
    use std::io::ErrorKind;
    match error.kind() {
        // The peer gave up before we got to it, the listener is fine
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted => {
            Duration::ZERO
        }
        _ => ACCEPT_BACKOFF,
    }
}

/// A channel joined by one connection
struct Joined {
    id: u64,
    sender: broadcast::Sender<Envelope>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Membership>,
}

async fn serve_connection(hub: LocalHub, stream: TcpStream) -> Result<(), ChannelError> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| ChannelError::Protocol(e.to_string()))?;
    let (mut write, mut read) = ws.split();

    let (out_tx, mut out_rx) = mpsc::channel::<RelayFrame>(64);
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let Ok(message) = frame.to_message() else {
                continue;
            };
            if write.send(message).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    let mut joined: HashMap<String, Joined> = HashMap::new();
    let mut result = Ok(());

    while let Some(message) = read.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                result = Err(ChannelError::Protocol(e.to_string()));
                break;
            }
        };

        let frame = match RelayFrame::parse(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = out_tx
                    .send(RelayFrame::Error {
                        message: e.to_string(),
                    })
                    .await;
                continue;
            }
        };

        match frame {
            RelayFrame::Join { channel } => {
                if !joined.contains_key(&channel) {
                    let membership = hub.attach(&channel);
                    let (stop, stop_rx) = oneshot::channel();
                    let entry = Joined {
                        id: membership.id,
                        sender: membership.sender.clone(),
                        stop,
                        task: tokio::spawn(forward(membership, stop_rx, out_tx.clone())),
                    };
                    joined.insert(channel.clone(), entry);
                }
                let _ = out_tx.send(RelayFrame::Joined { channel }).await;
            }
            RelayFrame::Broadcast {
                channel,
                event,
                payload,
            } => match joined.get(&channel) {
                Some(member) => {
                    let _ = member.sender.send(Envelope {
                        sender: member.id,
                        event: BroadcastEvent { event, payload },
                    });
                }
                None => {
                    let _ = out_tx
                        .send(RelayFrame::Error {
                            message: format!("not joined to {}", channel),
                        })
                        .await;
                }
            },
            RelayFrame::Leave { channel } => {
                if let Some(member) = joined.remove(&channel) {
                    release(&hub, member).await;
                }
            }
            RelayFrame::Joined { .. } | RelayFrame::Error { .. } => {
                debug!("Ignoring server-only frame from client");
            }
        }
    }

    for (_, member) in joined.drain() {
        release(&hub, member).await;
    }
    drop(out_tx);
    let _ = writer.await;
    result
}

/// Stop forwarding and give the membership back to the hub
async fn release(hub: &LocalHub, member: Joined) {
    let _ = member.stop.send(());
    drop(member.sender);
    if let Ok(membership) = member.task.await {
        hub.detach(membership);
    }
}

/// Push broadcasts from other members to this connection
async fn forward(
    mut membership: Membership,
    mut stop: oneshot::Receiver<()>,
    out: mpsc::Sender<RelayFrame>,
) -> Membership {
    loop {
        tokio::select! {
            _ = &mut stop => break,
            received = membership.receiver.recv() => match received {
                Ok(envelope) if envelope.sender == membership.id => {}
                Ok(envelope) => {
                    let frame = RelayFrame::Broadcast {
                        channel: membership.channel.clone(),
                        event: envelope.event.event,
                        payload: envelope.event.payload,
                    };
                    if out.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %membership.channel, skipped, "Relay member lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
    membership
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_wire_format() {
        let frame = RelayFrame::Broadcast {
            channel: "photobooth-remote-ABCDEF".into(),
            event: "remote-command".into(),
            payload: json!({"v": 1, "action": "ping"}),
        };
        let text = serde_json::to_string(&frame).unwrap();
        assert!(text.starts_with(r#"{"type":"broadcast","channel":"photobooth-remote-ABCDEF""#));
        assert_eq!(RelayFrame::parse(&text).unwrap(), frame);
    }

    #[test]
    fn test_accept_errors_back_off() {
        use std::io::{Error, ErrorKind};
        assert_eq!(accept_backoff(&Error::from(ErrorKind::ConnectionAborted)), Duration::ZERO);
        // EMFILE
        assert_eq!(accept_backoff(&Error::from_raw_os_error(24)), ACCEPT_BACKOFF);
    }

    #[tokio::test]
    async fn test_relay_outlives_a_bad_client() {
        use crate::backends::realtime::{RealtimeService, WebSocketService};
        use tokio::io::AsyncWriteExt;

        let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let hub = server.hub().clone();
        tokio::spawn(server.run());

        // Not a WebSocket handshake
        let mut junk = TcpStream::connect(addr).await.unwrap();
        junk.write_all(b"hello\r\n\r\n").await.unwrap();
        drop(junk);

        let service = WebSocketService::new(&format!("ws://{}", addr));
        let channel = service.join("room").await.unwrap();
        assert_eq!(hub.subscriber_count("room"), 1);
        channel.leave().await;
    }

    #[test]
    fn test_unknown_frame_is_protocol_error() {
        assert!(matches!(
            RelayFrame::parse(r#"{"type":"subscribe"}"#),
            Err(ChannelError::Protocol(_))
        ));
    }
}
