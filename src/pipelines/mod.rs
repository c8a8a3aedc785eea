// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │  PNG bytes   │
//! │ (RGBA/YUYV/  │     │  - Crop & scale   │     │              │
//! │   MJPEG)     │     │  - Mirror         │     │              │
//! │              │     │  - Overlay        │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`photo`]: Compositing and PNG encoding

pub mod photo;
