// SPDX-License-Identifier: GPL-3.0-only

//! Message handlers organized by functional domain
//!
//! Each submodule adds `handle_*` methods to
//! [`SessionState`](crate::app::state::SessionState).

mod camera;
mod capture;
mod remote;
mod share;
