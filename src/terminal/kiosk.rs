// SPDX-License-Identifier: GPL-3.0-only

//! Terminal kiosk screen
//!
//! Shows the mirrored live preview, the countdown, the captured photo with
//! its share link, the session code and the camera state. Every key maps
//! to one kiosk message.

use super::widgets::{ImageWidget, StatusBar};
use super::{FRAME_INTERVAL, Screen};
use crate::app::{Kiosk, KioskHandle, Message, Phase, SessionState, UploadStatus};
use crate::backends::camera::CameraBackendManager;
use crate::backends::realtime::ConnectionState;
use crate::constants::CaptureMode;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use image::RgbaImage;
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Width terminal previews are reduced to before drawing
const PREVIEW_WIDTH: u32 = 320;

/// Run the booth on this terminal until the user quits
pub async fn run(
    kiosk: Kiosk,
    overlays: Vec<(CaptureMode, PathBuf)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = kiosk.spawn();
    for (mode, path) in overlays {
        handle.load_overlay(mode, &path).await;
    }

    let mut terminal = super::enter()?;
    let result = event_loop(&mut terminal, &handle).await;
    super::leave(&mut terminal)?;

    handle.shutdown().await;
    result
}

/// What a key press asks for
#[derive(Debug)]
enum Input {
    Message(Message),
    OpenUrl(String),
    ToggleHelp,
    Quit,
}

#[derive(Default)]
struct View {
    preview: Option<RgbaImage>,
    /// Decoded photo on the result screen, by capture time
    result: Option<(i64, RgbaImage)>,
    show_help: bool,
}

impl View {
    async fn refresh(&mut self, state: &SessionState, camera: &CameraBackendManager) {
        match state.phase {
            Phase::Setup | Phase::Countdown => {
                self.preview = if state.stream_ready() {
                    grab_preview(camera).await
                } else {
                    None
                };
            }
            Phase::Result => {
                let Some(record) = &state.current else {
                    self.result = None;
                    return;
                };
                if self.result.as_ref().map(|(t, _)| *t) != Some(record.captured_at) {
                    self.result = match record.image.decode() {
                        Ok(image) => Some((record.captured_at, shrink(image))),
                        Err(e) => {
                            warn!(error = %e, "Could not decode photo for display");
                            None
                        }
                    };
                }
            }
        }
    }
}

async fn event_loop(terminal: &mut Screen, handle: &KioskHandle) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = View::default();
    let mut frames = tokio::time::interval(FRAME_INTERVAL);

    loop {
        frames.tick().await;
        let state = handle.state();
        if !state.running {
            return Ok(());
        }

        view.refresh(&state, handle.camera()).await;
        terminal.draw(|f| draw(f, &state, &view))?;

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                match key_input(&state, key) {
                    Some(Input::Quit) => return Ok(()),
                    Some(Input::Message(message)) => {
                        handle.send(message);
                    }
                    Some(Input::OpenUrl(url)) => {
                        if let Err(e) = open::that_detached(&url) {
                            warn!(url = %url, error = %e, "Could not open share link");
                        }
                    }
                    Some(Input::ToggleHelp) => view.show_help = !view.show_help,
                    None => {}
                }
            }
        }
    }
}

fn key_input(state: &SessionState, key: KeyEvent) -> Option<Input> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Input::Quit);
    }

    let message = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(Input::Quit),
        KeyCode::Char('h') | KeyCode::Char('?') => return Some(Input::ToggleHelp),
        KeyCode::Char('o') => return state.upload.url().map(|url| Input::OpenUrl(url.to_string())),

        KeyCode::Char(' ') | KeyCode::Enter => match state.phase {
            Phase::Result => Message::Retake,
            _ => Message::StartCountdown,
        },
        KeyCode::Char('m') => Message::SetMode(state.mode.toggled()),
        KeyCode::Char('t') => Message::SetTimer(state.timer.next()),
        KeyCode::Char('r') => Message::Reset,
        KeyCode::Char('s') => Message::SaveLocal,
        KeyCode::Char('u') => Message::RetryUpload,
        KeyCode::Char('n') => Message::RegenerateSessionCode,
        KeyCode::Char('c') => Message::RefreshDevices,
        KeyCode::Char('d') => Message::SelectDevice(next_device(state)?),
        KeyCode::Char('g') => Message::OpenFromGallery(state.gallery.latest()?.captured_at),
        KeyCode::Left => Message::OpenFromGallery(gallery_step(state, 1)?),
        KeyCode::Right => Message::OpenFromGallery(gallery_step(state, -1)?),
        _ => return None,
    };
    Some(Input::Message(message))
}

/// Device after the active one, wrapping around
fn next_device(state: &SessionState) -> Option<String> {
    if state.devices.len() < 2 {
        return None;
    }
    let current = state
        .active_device_id
        .as_deref()
        .and_then(|id| state.devices.iter().position(|d| d.id == id))
        .unwrap_or(0);
    Some(state.devices[(current + 1) % state.devices.len()].id.clone())
}

/// Capture time of the gallery record `step` places older than the one on
/// screen (negative is newer)
fn gallery_step(state: &SessionState, step: isize) -> Option<i64> {
    let current = state
        .current
        .as_ref()
        .filter(|_| state.phase == Phase::Result)
        .and_then(|r| state.gallery.position(r.captured_at));
    let index = match current {
        Some(index) => index.checked_add_signed(step)?,
        None => 0,
    };
    state.gallery.nth(index).map(|r| r.captured_at)
}

fn draw(f: &mut Frame, state: &SessionState, view: &View) {
    let [main, info, status] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .areas(f.area());

    match state.phase {
        Phase::Setup | Phase::Countdown => {
            let placeholder = camera_placeholder(state);
            f.render_widget(
                ImageWidget::new(view.preview.as_ref())
                    .mirrored(true)
                    .placeholder(&placeholder),
                main,
            );
            if let Some(remaining) = state.countdown {
                draw_countdown(f, main, remaining);
            }
        }
        Phase::Result => {
            f.render_widget(
                ImageWidget::new(view.result.as_ref().map(|(_, image)| image))
                    .placeholder("Processing photo..."),
                main,
            );
        }
    }

    f.render_widget(Paragraph::new(info_lines(state)), info);

    let message = if view.show_help {
        help_message(state)
    } else {
        status_message(state)
    };
    f.render_widget(StatusBar { message: &message }, status);
}

fn draw_countdown(f: &mut Frame, area: Rect, remaining: u32) {
    let [row] = Layout::vertical([Constraint::Length(3)])
        .flex(Flex::Center)
        .areas(area);
    let [badge] = Layout::horizontal([Constraint::Length(9)])
        .flex(Flex::Center)
        .areas(row);
    let text = if remaining == 0 {
        "SMILE".to_string()
    } else {
        remaining.to_string()
    };
    f.render_widget(Clear, badge);
    f.render_widget(
        Paragraph::new(text)
            .centered()
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL)),
        badge,
    );
}

fn camera_placeholder(state: &SessionState) -> String {
    match (&state.camera_error, &state.opening_device_id) {
        (Some(error), _) => format!("Camera problem: {}", error),
        (None, Some(_)) => "Starting camera...".to_string(),
        (None, None) if state.devices.is_empty() => "Looking for cameras...".to_string(),
        (None, None) => "Waiting for camera...".to_string(),
    }
}

fn info_lines(state: &SessionState) -> Vec<Line<'static>> {
    let camera = state
        .active_device()
        .map(|d| d.label.clone())
        .unwrap_or_else(|| "none".to_string());
    let mut lines = vec![Line::from(format!(
        "Mode: {}   Timer: {}   Camera: {}   Overlay: {}",
        state.mode.display_name(),
        state.timer,
        camera,
        if state.overlay_image().is_some() { "yes" } else { "no" },
    ))];

    lines.push(match (&state.session_code, &state.remote_link) {
        (Some(code), Some(link)) => Line::from(format!("Remote code: {}   ({})", code, link)).style(
            Style::default().fg(if link.is_connected() {
                Color::Green
            } else {
                Color::Yellow
            }),
        ),
        (Some(code), None) => Line::from(format!("Remote code: {}", code)),
        (None, _) => Line::from("Remote control off"),
    });

    let share = match (&state.phase, &state.upload) {
        (Phase::Result, UploadStatus::Uploading) => "Share: uploading...".to_string(),
        (Phase::Result, UploadStatus::Uploaded(url)) => format!("Share: {}", url),
        (Phase::Result, UploadStatus::Failed(e)) => format!("Share failed: {} (save with 's')", e),
        (Phase::Result, UploadStatus::Disabled) => "Sharing not configured (save with 's')".to_string(),
        _ => String::new(),
    };
    lines.push(Line::from(share));

    let mut footer = format!("Gallery: {}/{}", state.gallery.len(), state.gallery.capacity());
    if let Some(notice) = &state.notice {
        footer.push_str("   ");
        footer.push_str(notice);
    }
    lines.push(Line::from(footer));
    lines
}

fn status_message(state: &SessionState) -> String {
    match state.phase {
        Phase::Setup => "space photo | m mode | t timer | g gallery | h help | q quit".to_string(),
        Phase::Countdown => "r cancel | q quit".to_string(),
        Phase::Result => "space retake | s save | o open link | ←/→ gallery | h help | q quit".to_string(),
    }
}

fn help_message(state: &SessionState) -> String {
    let mut msg = String::from("space: photo/retake | m: mode | t: timer | r: reset | s: save | u: retry upload");
    if state.devices.len() > 1 {
        msg.push_str(" | d: next camera");
    }
    msg.push_str(" | c: rescan | n: new code | g/←/→: gallery | q: quit");
    msg
}

async fn grab_preview(camera: &CameraBackendManager) -> Option<RgbaImage> {
    let camera = camera.clone();
    tokio::task::spawn_blocking(move || {
        let frame = camera.capture_frame().ok()?;
        frame.to_rgba().ok().map(shrink)
    })
    .await
    .ok()
    .flatten()
}

fn shrink(image: RgbaImage) -> RgbaImage {
    if image.width() <= PREVIEW_WIDTH || image.height() == 0 {
        return image;
    }
    let height = ((PREVIEW_WIDTH as u64 * image.height() as u64) / image.width() as u64).max(1) as u32;
    image::imageops::thumbnail(&image, PREVIEW_WIDTH, height)
}

/// Parse `portrait=path` / `landscape=path` overlay arguments
pub fn parse_overlay_arg(arg: &str) -> Result<(CaptureMode, PathBuf), String> {
    let (mode, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected MODE=PATH, got '{}'", arg))?;
    let mode = match mode.trim().to_ascii_lowercase().as_str() {
        "portrait" => CaptureMode::Portrait,
        "landscape" => CaptureMode::Landscape,
        other => return Err(format!("unknown mode '{}'", other)),
    };
    info!(mode = ?mode, path, "Overlay requested");
    Ok((mode, PathBuf::from(path)))
}
