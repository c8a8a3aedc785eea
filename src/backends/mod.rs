// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer
//!
//! Everything the kiosk talks to outside its own process sits here behind
//! a narrow trait, with an in-process implementation for tests:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Kiosk runtime                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐  ┌──────────┐  ┌────────┐  │
//! │  │   Camera    │  │ Realtime │  │ Upload │  │
//! │  │ V4L2/Virtual│  │ Hub/WS   │  │HTTP/PUT│  │
//! │  └─────────────┘  └──────────┘  └────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: `MediaSource` devices and the device manager
//! - [`realtime`]: `RealtimeChannel` pub/sub for the phone remote
//! - [`upload`]: `Uploader` services for sharing

pub mod camera;
pub mod realtime;
pub mod upload;
