// SPDX-License-Identifier: GPL-3.0-only

//! WebSocket relay client
//!
//! One WebSocket connection per joined channel, speaking the relay frames
//! from [`super::relay`]. Incoming broadcasts are pumped by a read task
//! into an mpsc queue; outgoing frames share the sink behind a mutex.

use super::relay::RelayFrame;
use super::{BroadcastEvent, ConnectionState, RealtimeChannel, RealtimeService};
use crate::constants::realtime::{CHANNEL_CAPACITY, JOIN_TIMEOUT};
use crate::errors::ChannelError;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = Arc<tokio::sync::Mutex<SplitSink<WsStream, Message>>>;

/// Channels on a relay at `ws://host:port`
#[derive(Debug, Clone)]
pub struct WebSocketService {
    url: String,
}

impl WebSocketService {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RealtimeService for WebSocketService {
    async fn join(&self, channel: &str) -> Result<Box<dyn RealtimeChannel>, ChannelError> {
        info!(url = %self.url, channel, "Joining relay channel");

        let (ws, _) = tokio::time::timeout(JOIN_TIMEOUT, tokio_tungstenite::connect_async(self.url.as_str()))
            .await
            .map_err(|_| ChannelError::JoinFailed("connection timed out".into()))?
            .map_err(|e| ChannelError::JoinFailed(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        let join = RelayFrame::Join {
            channel: channel.to_string(),
        };
        write
            .send(join.to_message()?)
            .await
            .map_err(|e| ChannelError::JoinFailed(e.to_string()))?;

        tokio::time::timeout(JOIN_TIMEOUT, wait_joined(&mut read, channel))
            .await
            .map_err(|_| ChannelError::JoinFailed("no answer from relay".into()))??;

        let (status, _) = watch::channel(ConnectionState::Connected);
        let (events_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let reader = tokio::spawn(read_loop(
            read,
            channel.to_string(),
            events_tx,
            status.clone(),
        ));

        debug!(channel, "Relay channel joined");
        Ok(Box::new(WebSocketChannel {
            name: channel.to_string(),
            write: Arc::new(tokio::sync::Mutex::new(write)),
            events,
            status,
            reader,
        }))
    }
}

async fn wait_joined(read: &mut SplitStream<WsStream>, channel: &str) -> Result<(), ChannelError> {
    while let Some(message) = read.next().await {
        let message = message.map_err(|e| ChannelError::JoinFailed(e.to_string()))?;
        let Message::Text(text) = message else {
            continue;
        };
        match RelayFrame::parse(text.as_str())? {
            RelayFrame::Joined { channel: joined } if joined == channel => return Ok(()),
            RelayFrame::Error { message } => return Err(ChannelError::JoinFailed(message)),
            other => debug!(?other, "Frame before join acknowledgement"),
        }
    }
    Err(ChannelError::JoinFailed("relay closed the connection".into()))
}

async fn read_loop(
    mut read: SplitStream<WsStream>,
    channel: String,
    events: mpsc::Sender<BroadcastEvent>,
    status: watch::Sender<ConnectionState>,
) {
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => match RelayFrame::parse(text.as_str()) {
                Ok(RelayFrame::Broadcast {
                    channel: target,
                    event,
                    payload,
                }) if target == channel => {
                    if events.send(BroadcastEvent { event, payload }).await.is_err() {
                        break;
                    }
                }
                Ok(RelayFrame::Error { message }) => warn!(channel = %channel, %message, "Relay error"),
                Ok(_) => {}
                Err(e) => warn!(channel = %channel, error = %e, "Unreadable relay frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(channel = %channel, error = %e, "Relay connection failed");
                status.send_replace(ConnectionState::Error(e.to_string()));
                return;
            }
        }
    }
    status.send_replace(ConnectionState::Disconnected);
    debug!(channel = %channel, "Relay read loop ended");
}

/// A channel joined through a relay
pub struct WebSocketChannel {
    name: String,
    write: WsSink,
    events: mpsc::Receiver<BroadcastEvent>,
    status: watch::Sender<ConnectionState>,
    reader: JoinHandle<()>,
}

#[async_trait]
impl RealtimeChannel for WebSocketChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }

    async fn recv(&mut self) -> Option<BroadcastEvent> {
        self.events.recv().await
    }

    async fn broadcast(&self, event: BroadcastEvent) -> Result<(), ChannelError> {
        if !self.status.borrow().is_connected() {
            return Err(ChannelError::NotConnected);
        }
        let frame = RelayFrame::Broadcast {
            channel: self.name.clone(),
            event: event.event,
            payload: event.payload,
        };
        let mut write = self.write.lock().await;
        write.send(frame.to_message()?).await.map_err(|e| {
            self.status
                .send_replace(ConnectionState::Error(e.to_string()));
            ChannelError::SendFailed(e.to_string())
        })
    }

    async fn leave(self: Box<Self>) {
        let leave = RelayFrame::Leave {
            channel: self.name.clone(),
        };
        {
            let mut write = self.write.lock().await;
            if let Ok(message) = leave.to_message() {
                let _ = write.send(message).await;
            }
            let _ = write.close().await;
        }
        self.reader.abort();
        self.status.send_replace(ConnectionState::Disconnected);
        info!(channel = %self.name, "Left relay channel");
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
