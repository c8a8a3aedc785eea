// SPDX-License-Identifier: GPL-3.0-only

//! Terminal screens
//!
//! - `kiosk`: the booth itself, with live preview, countdown and result
//! - `remote`: a phone-style remote control for a running booth
//!
//! Both draw with ratatui on a crossterm alternate screen and poll input
//! without blocking the async runtime.

pub mod kiosk;
pub mod remote;
pub mod widgets;

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout, stdout};
use std::time::Duration;

/// Redraw period of the terminal screens
pub const FRAME_INTERVAL: Duration = Duration::from_millis(50);

pub type Screen = Terminal<CrosstermBackend<Stdout>>;

/// Switch to raw mode on the alternate screen
pub fn enter() -> io::Result<Screen> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

/// Restore the terminal
pub fn leave(terminal: &mut Screen) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
