// SPDX-License-Identifier: GPL-3.0-only

//! Remote control handlers
//!
//! Remote commands go through the same handlers as local input, so the
//! countdown guards apply to them unchanged.

use crate::app::state::{Effect, SessionState};
use crate::backends::realtime::ConnectionState;
use crate::remote::{RemoteAction, RemoteCommand, SessionCode};
use tracing::{debug, info};

impl SessionState {
    pub(crate) fn handle_session_started(&mut self, code: SessionCode) -> Effect {
        if self.session_code.as_ref() == Some(&code) {
            return Effect::None;
        }
        info!(code = %code, "New session code");
        self.session_code = Some(code.clone());
        self.remote_link = Some(ConnectionState::Connecting);
        Effect::JoinRemote(code)
    }

    pub(crate) fn handle_remote_command(&mut self, code: SessionCode, command: RemoteCommand) -> Effect {
        if self.session_code.as_ref() != Some(&code) {
            debug!(code = %code, "Dropping command for an old session code");
            return Effect::None;
        }
        debug!(action = ?command.action, at = ?command.at, "Remote command");
        match command.action {
            RemoteAction::TakePhoto => self.handle_start_countdown(),
            RemoteAction::SetMode { mode } => self.handle_set_mode(mode),
            RemoteAction::SetTimer { timer } => self.handle_set_timer(timer),
            RemoteAction::Reset => self.handle_reset(),
            RemoteAction::Ping => Effect::None,
        }
    }

    pub(crate) fn handle_remote_link(&mut self, code: SessionCode, state: ConnectionState) -> Effect {
        if self.session_code.as_ref() != Some(&code) {
            return Effect::None;
        }
        if self.remote_link.as_ref() != Some(&state) {
            info!(code = %code, state = %state, "Remote link");
            self.remote_link = Some(state);
        }
        Effect::None
    }
}
