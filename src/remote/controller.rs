// SPDX-License-Identifier: GPL-3.0-only

//! Phone side of the remote channel
//!
//! Joins the channel for a code and publishes commands. Sending is refused
//! while the link is not up; there are no retries or acknowledgements.

use super::command::{RemoteAction, RemoteCommand};
use super::session_code::SessionCode;
use crate::backends::realtime::{ConnectionState, RealtimeChannel, RealtimeService};
use crate::errors::ChannelError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Remote control for one kiosk session
pub struct RemoteController {
    code: SessionCode,
    channel: Option<Box<dyn RealtimeChannel>>,
    status: watch::Receiver<ConnectionState>,
}

impl RemoteController {
    /// Join the channel for `code`
    ///
    /// Never fails: a failed join leaves the controller in the error state.
    pub async fn connect(service: &dyn RealtimeService, code: SessionCode) -> Self {
        match service.join(&code.channel_name()).await {
            Ok(channel) => {
                info!(code = %code, "Remote connected");
                let status = channel.status();
                Self {
                    code,
                    channel: Some(channel),
                    status,
                }
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Remote could not connect");
                let (_, status) = watch::channel(ConnectionState::Error(e.to_string()));
                Self {
                    code,
                    channel: None,
                    status,
                }
            }
        }
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Current link state
    pub fn state(&self) -> ConnectionState {
        self.status.borrow().clone()
    }

    /// Follow link changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.status.clone()
    }

    /// Publish `action` to the kiosk
    pub async fn send(&self, action: RemoteAction) -> Result<(), ChannelError> {
        let channel = self.channel.as_ref().ok_or(ChannelError::NotConnected)?;
        if !self.state().is_connected() {
            return Err(ChannelError::NotConnected);
        }
        debug!(code = %self.code, action = ?action, "Sending remote command");
        channel.broadcast(RemoteCommand::new(action).to_event()).await
    }

    /// Leave the channel
    pub async fn disconnect(mut self) {
        if let Some(channel) = self.channel.take() {
            channel.leave().await;
        }
    }
}
