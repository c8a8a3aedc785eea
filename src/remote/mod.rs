// SPDX-License-Identifier: MPL-2.0

//! Phone remote control
//!
//! The kiosk shows a session code and listens on the channel derived from
//! it ([`RemoteSync`]); a phone given the same code publishes commands on
//! that channel ([`RemoteController`]).

pub mod command;
pub mod controller;
pub mod session_code;
pub mod sync;

pub use command::{RemoteAction, RemoteCommand};
pub use controller::RemoteController;
pub use session_code::SessionCode;
pub use sync::{RemoteSync, SyncEvent, SyncSink};
