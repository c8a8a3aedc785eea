// SPDX-License-Identifier: MPL-2.0

//! Realtime broadcast channels
//!
//! A channel is a named room: every member receives what any other member
//! broadcasts, the sender excepted. Delivery is best effort, without
//! acknowledgements or replay.
//!
//! - [`local`]: in-process hub, used by tests and single-process setups
//! - [`websocket`]: client for a relay reachable over WebSocket
//! - [`relay`]: the relay server itself, built on the in-process hub

pub mod local;
pub mod relay;
pub mod websocket;

pub use local::LocalHub;
pub use relay::RelayFrame;
pub use websocket::WebSocketService;

use crate::errors::ChannelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Link state of a channel as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Error(String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// One broadcast message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Something that hands out channels by name
#[async_trait]
pub trait RealtimeService: Send + Sync {
    /// Subscribe to `channel`
    ///
    /// Resolves once the subscription is live.
    async fn join(&self, channel: &str) -> Result<Box<dyn RealtimeChannel>, ChannelError>;
}

/// A live subscription, owned by whoever joined
#[async_trait]
pub trait RealtimeChannel: Send {
    fn name(&self) -> &str;

    /// Follows the link state until the channel is left
    fn status(&self) -> watch::Receiver<ConnectionState>;

    /// Next broadcast from another member, `None` once the channel closed
    async fn recv(&mut self) -> Option<BroadcastEvent>;

    /// Publish to the other members
    ///
    /// Fails with `ChannelError::NotConnected` unless the link is up.
    async fn broadcast(&self, event: BroadcastEvent) -> Result<(), ChannelError>;

    /// Release the subscription
    async fn leave(self: Box<Self>);
}

/// Service for the configured relay, `None` when remote control is off
pub fn from_url(relay_url: Option<&str>) -> Option<Arc<dyn RealtimeService>> {
    relay_url
        .filter(|url| !url.trim().is_empty())
        .map(|url| Arc::new(WebSocketService::new(url)) as Arc<dyn RealtimeService>)
}
