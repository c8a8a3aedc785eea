// SPDX-License-Identifier: MPL-2.0

//! Kiosk application
//!
//! # Architecture
//!
//! - `state`: session state, messages and effects
//! - `update`: the reducer, dispatching to `handlers`
//! - `handlers`: message handlers grouped by domain
//! - `gallery`: bounded most-recent-first photo list
//! - `kiosk`: the event loop that runs effects and publishes state
//! - `camera_ops`: camera calls made by the event loop
//!
//! # Main Types
//!
//! - `SessionState`: everything the kiosk screen shows
//! - `Message`: local input, remote commands and completed work
//! - `Effect`: work the reducer asks the runtime to do
//! - `Kiosk` / `KioskHandle`: the runtime and its control handle

mod camera_ops;
pub mod gallery;
mod handlers;
pub mod kiosk;
pub mod state;
pub mod update;

pub use gallery::Gallery;
pub use kiosk::{Kiosk, KioskHandle, KioskServices};
pub use state::{Effect, Message, Phase, PhotoRecord, SessionState, UploadStatus};
pub use update::reduce;
