// SPDX-License-Identifier: GPL-3.0-only

//! In-process broadcast hub
//!
//! Each channel name maps to a `tokio::sync::broadcast` sender. Members
//! carry an id so their own messages are filtered out on receive. A
//! channel disappears when its last member leaves.

use super::{BroadcastEvent, ConnectionState, RealtimeChannel, RealtimeService};
use crate::constants::realtime::CHANNEL_CAPACITY;
use crate::errors::ChannelError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// A broadcast tagged with its sender
#[derive(Debug, Clone)]
pub struct Envelope {
    pub sender: u64,
    pub event: BroadcastEvent,
}

/// A raw membership, as used by the relay server
pub struct Membership {
    pub id: u64,
    pub channel: String,
    pub sender: broadcast::Sender<Envelope>,
    pub receiver: broadcast::Receiver<Envelope>,
}

struct HubInner {
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    next_id: AtomicU64,
    link: watch::Sender<ConnectionState>,
}

/// In-process broadcast hub
#[derive(Clone)]
pub struct LocalHub {
    inner: Arc<HubInner>,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHub {
    pub fn new() -> Self {
        let (link, _) = watch::channel(ConnectionState::Connected);
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                link,
            }),
        }
    }

    /// Join `channel` without the link-state checks of [`RealtimeService::join`]
    pub fn attach(&self, channel: &str) -> Membership {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channels = self.inner.channels.lock();
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone();
        let receiver = sender.subscribe();
        debug!(channel, member = id, "Member attached");
        Membership {
            id,
            channel: channel.to_string(),
            sender,
            receiver,
        }
    }

    /// Drop a membership, removing the channel once nobody is left
    pub fn detach(&self, membership: Membership) {
        let Membership {
            id,
            channel,
            sender,
            receiver,
        } = membership;
        drop(receiver);
        drop(sender);
        self.prune(&channel);
        debug!(channel = %channel, member = id, "Member detached");
    }

    fn prune(&self, channel: &str) {
        let mut channels = self.inner.channels.lock();
        if channels
            .get(channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(channel);
        }
    }

    /// Members currently subscribed to `channel`
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.inner
            .channels
            .lock()
            .get(channel)
            .map_or(0, |sender| sender.receiver_count())
    }

    /// Number of channels with at least one member
    pub fn channel_count(&self) -> usize {
        self.inner.channels.lock().len()
    }

    /// Change the link state every member sees, e.g. to simulate an outage
    pub fn set_link(&self, state: ConnectionState) {
        self.inner.link.send_replace(state);
    }
}

#[async_trait]
impl RealtimeService for LocalHub {
    async fn join(&self, channel: &str) -> Result<Box<dyn RealtimeChannel>, ChannelError> {
        let link = self.inner.link.borrow().clone();
        if !link.is_connected() {
            return Err(ChannelError::JoinFailed(format!("hub is {}", link)));
        }
        Ok(Box::new(LocalChannel {
            hub: self.clone(),
            membership: Some(self.attach(channel)),
            name: channel.to_string(),
        }))
    }
}

/// A member of a [`LocalHub`] channel
pub struct LocalChannel {
    hub: LocalHub,
    membership: Option<Membership>,
    name: String,
}

#[async_trait]
impl RealtimeChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> watch::Receiver<ConnectionState> {
        self.hub.inner.link.subscribe()
    }

    async fn recv(&mut self) -> Option<BroadcastEvent> {
        let membership = self.membership.as_mut()?;
        loop {
            match membership.receiver.recv().await {
                Ok(envelope) if envelope.sender == membership.id => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.name, skipped, "Receiver lagged, dropping broadcasts");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn broadcast(&self, event: BroadcastEvent) -> Result<(), ChannelError> {
        if !self.hub.inner.link.borrow().is_connected() {
            return Err(ChannelError::NotConnected);
        }
        let membership = self.membership.as_ref().ok_or(ChannelError::NotConnected)?;
        membership
            .sender
            .send(Envelope {
                sender: membership.id,
                event,
            })
            .map(|_| ())
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }

    async fn leave(self: Box<Self>) {
        // Drop does the work
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        if let Some(membership) = self.membership.take() {
            self.hub.detach(membership);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str) -> BroadcastEvent {
        BroadcastEvent {
            event: name.to_string(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn test_members_do_not_hear_themselves() {
        let hub = LocalHub::new();
        let mut a = hub.join("room").await.unwrap();
        let mut b = hub.join("room").await.unwrap();

        a.broadcast(event("hello")).await.unwrap();
        assert_eq!(b.recv().await.unwrap().event, "hello");

        b.broadcast(event("back")).await.unwrap();
        assert_eq!(a.recv().await.unwrap().event, "back");
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let hub = LocalHub::new();
        let a = hub.join("one").await.unwrap();
        let mut b = hub.join("two").await.unwrap();

        a.broadcast(event("lost")).await.unwrap();
        let got = tokio::time::timeout(std::time::Duration::from_millis(50), b.recv()).await;
        assert!(got.is_err());
    }

    #[tokio::test]
    async fn test_last_leave_removes_channel() {
        let hub = LocalHub::new();
        let a = hub.join("room").await.unwrap();
        let b = hub.join("room").await.unwrap();
        assert_eq!(hub.subscriber_count("room"), 2);

        a.leave().await;
        assert_eq!(hub.subscriber_count("room"), 1);
        b.leave().await;
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_outage_blocks_join_and_send() {
        let hub = LocalHub::new();
        let a = hub.join("room").await.unwrap();

        hub.set_link(ConnectionState::Disconnected);
        assert_eq!(a.broadcast(event("x")).await, Err(ChannelError::NotConnected));
        assert!(hub.join("room").await.is_err());
    }
}
