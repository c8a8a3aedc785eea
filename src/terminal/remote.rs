// SPDX-License-Identifier: GPL-3.0-only

//! Terminal remote control
//!
//! Joins the channel for a session code and sends commands to the booth.
//! Keys are inert while the link is not connected.

use super::widgets::StatusBar;
use super::{FRAME_INTERVAL, Screen};
use crate::backends::realtime::{ConnectionState, RealtimeService};
use crate::constants::{CaptureMode, TimerDuration};
use crate::remote::{RemoteAction, RemoteController, SessionCode};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Run the remote control until the user quits
pub async fn run(
    service: Arc<dyn RealtimeService>,
    code: SessionCode,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = super::enter()?;
    let result = event_loop(&mut terminal, service, code).await;
    super::leave(&mut terminal)?;
    result
}

/// Settings the remote will send next
struct Panel {
    mode: CaptureMode,
    timer: TimerDuration,
    last: String,
}

enum Input {
    Send(RemoteAction),
    Reconnect,
    Quit,
}

async fn event_loop(
    terminal: &mut Screen,
    service: Arc<dyn RealtimeService>,
    code: SessionCode,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut controller = RemoteController::connect(service.as_ref(), code.clone()).await;
    let mut panel = Panel {
        mode: CaptureMode::default(),
        timer: TimerDuration::default(),
        last: String::new(),
    };
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        frames.tick().await;
        let state = controller.state();
        terminal.draw(|f| draw(f, controller.code(), &state, &panel))?;

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key_input(&mut panel, key) {
                Some(Input::Quit) => {
                    controller.disconnect().await;
                    return Ok(());
                }
                Some(Input::Reconnect) => {
                    info!(code = %code, "Reconnecting remote");
                    controller.disconnect().await;
                    controller = RemoteController::connect(service.as_ref(), code.clone()).await;
                    panel.last = String::new();
                }
                Some(Input::Send(action)) => {
                    panel.last = match controller.send(action).await {
                        Ok(()) => format!("Sent {}", describe(&action)),
                        Err(e) => format!("Not sent: {}", e),
                    };
                }
                None => {}
            }
        }
    }
}

fn key_input(panel: &mut Panel, key: KeyEvent) -> Option<Input> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Input::Quit);
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(Input::Quit),
        KeyCode::Char('c') => return Some(Input::Reconnect),
        KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('p') => RemoteAction::TakePhoto,
        KeyCode::Char('m') => {
            panel.mode = panel.mode.toggled();
            RemoteAction::SetMode { mode: panel.mode }
        }
        KeyCode::Char('t') => {
            panel.timer = panel.timer.next();
            RemoteAction::SetTimer { timer: panel.timer }
        }
        KeyCode::Char('r') => RemoteAction::Reset,
        KeyCode::Char('i') => RemoteAction::Ping,
        _ => return None,
    };
    Some(Input::Send(action))
}

fn describe(action: &RemoteAction) -> String {
    match action {
        RemoteAction::TakePhoto => "take photo".to_string(),
        RemoteAction::SetMode { mode } => format!("mode {}", mode.display_name()),
        RemoteAction::SetTimer { timer } => format!("timer {}", timer),
        RemoteAction::Reset => "reset".to_string(),
        RemoteAction::Ping => "ping".to_string(),
    }
}

fn draw(f: &mut Frame, code: &SessionCode, state: &ConnectionState, panel: &Panel) {
    let [body, status] =
        Layout::vertical([Constraint::Min(5), Constraint::Length(1)]).areas(f.area());

    let link_color = match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Connecting => Color::Yellow,
        ConnectionState::Disconnected | ConnectionState::Error(_) => Color::Red,
    };
    let lines = vec![
        Line::from(format!("Booth {}", code)),
        Line::from(state.to_string()).style(Style::default().fg(link_color)),
        Line::from(""),
        Line::from(format!(
            "Next mode: {}   Next timer: {}",
            panel.mode.display_name(),
            panel.timer
        )),
        Line::from(panel.last.clone()),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Photo booth remote")),
        body,
    );

    let message = if state.is_connected() {
        "space photo | m mode | t timer | r reset | i ping | q quit"
    } else {
        "not connected | c reconnect | q quit"
    };
    f.render_widget(StatusBar { message }, status);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> Panel {
        Panel {
            mode: CaptureMode::Portrait,
            timer: TimerDuration::Three,
            last: String::new(),
        }
    }

    fn press(panel: &mut Panel, c: char) -> Option<RemoteAction> {
        match key_input(panel, KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)) {
            Some(Input::Send(action)) => Some(action),
            _ => None,
        }
    }

    #[test]
    fn test_keys_step_settings() {
        let mut panel = panel();
        assert_eq!(
            press(&mut panel, 't'),
            Some(RemoteAction::SetTimer {
                timer: TimerDuration::Five
            })
        );
        assert_eq!(
            press(&mut panel, 'm'),
            Some(RemoteAction::SetMode {
                mode: CaptureMode::Landscape
            })
        );
        assert_eq!(press(&mut panel, ' '), Some(RemoteAction::TakePhoto));
        assert_eq!(press(&mut panel, 'x'), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&RemoteAction::SetTimer {
                timer: TimerDuration::Ten
            }),
            "timer 10s"
        );
    }
}
