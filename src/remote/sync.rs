// SPDX-License-Identifier: GPL-3.0-only

//! Kiosk side of the remote channel
//!
//! A background task that holds the subscription for one session code,
//! turns valid broadcasts into commands and reports link changes. When
//! the link drops it joins again after a short delay. Stopping the task
//! releases the subscription before the task ends.

use super::command::RemoteCommand;
use super::session_code::SessionCode;
use crate::backends::realtime::{ConnectionState, RealtimeChannel, RealtimeService};
use crate::constants::realtime::RECONNECT_DELAY;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the sync task reports to the kiosk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A valid command arrived on the channel for `code`
    Command {
        code: SessionCode,
        command: RemoteCommand,
    },
    /// The link state for `code` changed
    Link {
        code: SessionCode,
        state: ConnectionState,
    },
}

/// Receiver of sync events
pub type SyncSink = Arc<dyn Fn(SyncEvent) + Send + Sync>;

/// Handle to a running sync task
pub struct RemoteSync {
    code: SessionCode,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RemoteSync {
    /// Start listening on the channel for `code`
    pub fn spawn(service: Arc<dyn RealtimeService>, code: SessionCode, sink: SyncSink) -> Self {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(service, code.clone(), stop_rx, sink));
        Self {
            code,
            stop: Some(stop),
            task,
        }
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Leave the channel and wait for the task to finish
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(code = %self.code, error = %e, "Remote sync task ended abnormally");
        }
        info!(code = %self.code, "Remote sync stopped");
    }
}

impl Drop for RemoteSync {
    fn drop(&mut self) {
        // Without an explicit stop the subscription must not outlive us
        if self.stop.is_some() {
            self.task.abort();
        }
    }
}

enum SessionEnd {
    Stopped,
    Lost,
}

async fn run(
    service: Arc<dyn RealtimeService>,
    code: SessionCode,
    mut stop: oneshot::Receiver<()>,
    sink: SyncSink,
) {
    let channel_name = code.channel_name();
    let link = |state: ConnectionState| {
        sink(SyncEvent::Link {
            code: code.clone(),
            state,
        })
    };

    loop {
        link(ConnectionState::Connecting);

        let joined = tokio::select! {
            _ = &mut stop => return,
            joined = service.join(&channel_name) => joined,
        };

        match joined {
            Ok(channel) => {
                info!(channel = %channel_name, "Remote channel joined");
                match session(channel, &code, &mut stop, &sink).await {
                    SessionEnd::Stopped => return,
                    SessionEnd::Lost => link(ConnectionState::Disconnected),
                }
            }
            Err(e) => {
                warn!(channel = %channel_name, error = %e, "Could not join remote channel");
                link(ConnectionState::Error(e.to_string()));
            }
        }

        tokio::select! {
            _ = &mut stop => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

async fn session(
    mut channel: Box<dyn RealtimeChannel>,
    code: &SessionCode,
    stop: &mut oneshot::Receiver<()>,
    sink: &SyncSink,
) -> SessionEnd {
    let mut status = channel.status();
    let mut status_open = true;
    sink(SyncEvent::Link {
        code: code.clone(),
        state: status.borrow_and_update().clone(),
    });

    let end = loop {
        tokio::select! {
            _ = &mut *stop => break SessionEnd::Stopped,
            changed = status.changed(), if status_open => {
                if changed.is_err() {
                    status_open = false;
                    continue;
                }
                let state = status.borrow_and_update().clone();
                debug!(code = %code, state = %state, "Remote link changed");
                sink(SyncEvent::Link { code: code.clone(), state });
            }
            received = channel.recv() => match received {
                Some(event) => {
                    if let Some(command) = RemoteCommand::from_event(&event) {
                        debug!(code = %code, action = ?command.action, "Remote command received");
                        sink(SyncEvent::Command { code: code.clone(), command });
                    }
                }
                None => break SessionEnd::Lost,
            },
        }
    };

    channel.leave().await;
    end
}
