// SPDX-License-Identifier: GPL-3.0-only

//! Remote command schema
//!
//! Commands travel as the payload of a `remote-command` broadcast:
//!
//! ```json
//! {"v":1,"action":"set_timer","timer":5,"at":1718000000000}
//! ```
//!
//! `v` is the schema version; payloads with any other version are dropped.
//! `at` is the sender's clock in unix milliseconds, informational only.

use crate::backends::realtime::BroadcastEvent;
use crate::constants::realtime::{COMMAND_SCHEMA_VERSION, REMOTE_COMMAND_EVENT};
use crate::constants::{CaptureMode, TimerDuration};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the remote asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemoteAction {
    TakePhoto,
    SetMode { mode: CaptureMode },
    SetTimer { timer: TimerDuration },
    Reset,
    Ping,
}

/// A versioned remote command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommand {
    pub v: u32,
    #[serde(flatten)]
    pub action: RemoteAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
}

impl RemoteCommand {
    /// A current-version command stamped with the local clock
    pub fn new(action: RemoteAction) -> Self {
        Self {
            v: COMMAND_SCHEMA_VERSION,
            action,
            at: Some(chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Wrap as a broadcast
    pub fn to_event(&self) -> BroadcastEvent {
        BroadcastEvent {
            event: REMOTE_COMMAND_EVENT.to_string(),
            payload: serde_json::to_value(self).unwrap_or_default(),
        }
    }

    /// Read a broadcast, `None` for anything that is not a valid command
    pub fn from_event(event: &BroadcastEvent) -> Option<Self> {
        if event.event != REMOTE_COMMAND_EVENT {
            debug!(event = %event.event, "Ignoring unrelated broadcast");
            return None;
        }
        match serde_json::from_value::<RemoteCommand>(event.payload.clone()) {
            Ok(command) if command.v == COMMAND_SCHEMA_VERSION => Some(command),
            Ok(command) => {
                debug!(version = command.v, "Ignoring command with unknown schema version");
                None
            }
            Err(e) => {
                debug!(error = %e, "Ignoring malformed command");
                None
            }
        }
    }
}

impl From<RemoteAction> for RemoteCommand {
    fn from(action: RemoteAction) -> Self {
        Self::new(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(payload: serde_json::Value) -> BroadcastEvent {
        BroadcastEvent {
            event: REMOTE_COMMAND_EVENT.to_string(),
            payload,
        }
    }

    #[test]
    fn test_set_timer_wire_format() {
        let command = RemoteCommand {
            v: 1,
            action: RemoteAction::SetTimer {
                timer: TimerDuration::Five,
            },
            at: Some(42),
        };
        assert_eq!(
            serde_json::to_value(command).unwrap(),
            json!({"v": 1, "action": "set_timer", "timer": 5, "at": 42})
        );
    }

    #[test]
    fn test_parses_flat_fields() {
        let command =
            RemoteCommand::from_event(&event(json!({"v": 1, "action": "set_mode", "mode": "landscape"})))
                .unwrap();
        assert_eq!(
            command.action,
            RemoteAction::SetMode {
                mode: CaptureMode::Landscape
            }
        );
        assert_eq!(command.at, None);
    }

    #[test]
    fn test_rejects_invalid_payloads() {
        for payload in [
            json!({"v": 2, "action": "take_photo"}),
            json!({"v": 1, "action": "self_destruct"}),
            json!({"v": 1, "action": "set_timer", "timer": 7}),
            json!({"action": "ping"}),
        ] {
            assert_eq!(RemoteCommand::from_event(&event(payload.clone())), None, "{}", payload);
        }
    }

    #[test]
    fn test_rejects_other_events() {
        let other = BroadcastEvent {
            event: "presence".into(),
            payload: json!({"v": 1, "action": "ping"}),
        };
        assert_eq!(RemoteCommand::from_event(&other), None);
    }
}
