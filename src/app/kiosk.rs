// SPDX-License-Identifier: MPL-2.0

//! Kiosk runtime
//!
//! Owns the session state and everything with a side effect: the camera,
//! the countdown ticker, uploads, local saves and the remote channel.
//! Messages arrive on one inbox and are applied in order; each produces
//! an [`Effect`] that is carried out before the next message is read.
//! After every batch the state is published on a `watch` channel.

use crate::app::state::{Effect, Message, SessionState};
use crate::backends::camera::{CameraBackendManager, MediaSource};
use crate::backends::realtime::RealtimeService;
use crate::backends::upload::Uploader;
use crate::config::Config;
use crate::constants::{COUNTDOWN_TICK, CaptureMode, Resolution};
use crate::pipelines::photo::{PhotoPipeline, overlay};
use crate::remote::{RemoteSync, SessionCode, SyncEvent, SyncSink};
use crate::storage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// External collaborators of a kiosk
#[derive(Clone)]
pub struct KioskServices {
    pub source: Arc<dyn MediaSource>,
    pub uploader: Arc<dyn Uploader>,
    /// `None` turns remote control off
    pub realtime: Option<Arc<dyn RealtimeService>>,
}

/// The kiosk event loop
pub struct Kiosk {
    pub(super) state: SessionState,
    pub(super) camera: CameraBackendManager,
    pub(super) pipeline: PhotoPipeline,
    pub(super) ideal_resolution: Resolution,
    uploader: Arc<dyn Uploader>,
    realtime: Option<Arc<dyn RealtimeService>>,
    save_dir: PathBuf,
    device_poll: Option<Duration>,

    pub(super) inbox_tx: mpsc::UnboundedSender<Message>,
    inbox: mpsc::UnboundedReceiver<Message>,
    /// Follow-up messages produced while executing effects
    pub(super) queue: VecDeque<Message>,
    snapshot: watch::Sender<SessionState>,

    ticker: Option<JoinHandle<()>>,
    remote: Option<RemoteSync>,
}

impl Kiosk {
    pub fn new(config: &Config, services: KioskServices) -> Self {
        let state = SessionState::from_config(config);
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (snapshot, _) = watch::channel(state.clone());
        let device_poll =
            (config.device_poll_secs > 0).then(|| Duration::from_secs(config.device_poll_secs));

        Self {
            state,
            camera: CameraBackendManager::new(services.source),
            pipeline: PhotoPipeline::from_config(config),
            ideal_resolution: config.ideal_resolution,
            uploader: services.uploader,
            realtime: services.realtime,
            save_dir: storage::photo_directory(&config.save_folder),
            device_poll,
            inbox_tx,
            inbox,
            queue: VecDeque::new(),
            snapshot,
            ticker: None,
            remote: None,
        }
    }

    /// Save photos to `dir` instead of the pictures folder
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    /// Camera manager shared with the kiosk, for preview rendering
    pub fn camera(&self) -> CameraBackendManager {
        self.camera.clone()
    }

    /// Start the event loop on the current runtime
    pub fn spawn(self) -> KioskHandle {
        let tx = self.inbox_tx.clone();
        let state = self.snapshot.subscribe();
        let camera = self.camera.clone();
        let task = tokio::spawn(self.run());
        KioskHandle {
            tx,
            state,
            camera,
            task: Some(task),
        }
    }

    /// Run until a [`Message::Shutdown`] is processed
    pub async fn run(mut self) {
        info!(
            backend = self.camera.backend_name(),
            uploader = self.uploader.name(),
            remote = self.realtime.is_some(),
            "Kiosk starting"
        );
        self.execute(Effect::batch([Effect::ListDevices, Effect::NewSessionCode]))
            .await;
        self.drain().await;
        self.publish();

        let mut poll = self.device_poll.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        while self.state.running {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => {
                        self.queue.push_back(message);
                        self.drain().await;
                    }
                    None => break,
                },
                _ = next_poll(&mut poll) => {
                    self.spawn_device_poll();
                    continue;
                }
            }
            self.publish();
        }

        self.teardown().await;
        self.publish();
        info!("Kiosk stopped");
    }

    /// Apply queued messages until none are left
    async fn drain(&mut self) {
        while let Some(message) = self.queue.pop_front() {
            let effect = self.state.update(message);
            self.execute(effect).await;
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.state.clone());
    }

    async fn execute(&mut self, effect: Effect) {
        for effect in effect.flatten() {
            match effect {
                Effect::None | Effect::Batch(_) => {}
                Effect::StartTicker { generation } => self.start_ticker(generation),
                Effect::StopTicker => self.stop_ticker(),
                Effect::Capture {
                    generation,
                    mode,
                    overlay,
                } => self.capture(generation, mode, overlay).await,
                Effect::ListDevices => self.spawn_list_devices(),
                Effect::OpenDevice(device_id) => self.open_device(device_id).await,
                Effect::CloseStream => self.close_stream().await,
                Effect::Upload(record) => {
                    let uploader = Arc::clone(&self.uploader);
                    let tx = self.inbox_tx.clone();
                    tokio::spawn(async move {
                        let outcome = uploader.upload(&record.image, record.captured_at).await;
                        let _ = tx.send(Message::UploadFinished {
                            captured_at: record.captured_at,
                            outcome,
                        });
                    });
                }
                Effect::SaveToDevice(record) => {
                    let dir = self.save_dir.clone();
                    let tx = self.inbox_tx.clone();
                    tokio::spawn(async move {
                        let message = match storage::save_photo(&dir, &record).await {
                            Ok(path) => Message::Saved {
                                captured_at: record.captured_at,
                                path,
                            },
                            Err(e) => Message::SaveFailed {
                                captured_at: record.captured_at,
                                error: e.to_string(),
                            },
                        };
                        let _ = tx.send(message);
                    });
                }
                Effect::NewSessionCode => {
                    if self.realtime.is_some() {
                        self.queue.push_back(Message::SessionStarted(SessionCode::generate()));
                    } else {
                        debug!("Remote control disabled, no session code");
                    }
                }
                Effect::JoinRemote(code) => self.join_remote(code).await,
                Effect::LeaveRemote => self.leave_remote().await,
            }
        }
    }

    fn start_ticker(&mut self, generation: u64) {
        self.stop_ticker();
        let tx = self.inbox_tx.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(Instant::now() + COUNTDOWN_TICK, COUNTDOWN_TICK);
            loop {
                interval.tick().await;
                if tx.send(Message::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    async fn join_remote(&mut self, code: SessionCode) {
        self.leave_remote().await;
        let Some(service) = self.realtime.clone() else {
            return;
        };
        let tx = self.inbox_tx.clone();
        let sink: SyncSink = Arc::new(move |event| {
            let message = match event {
                SyncEvent::Command { code, command } => Message::Remote { code, command },
                SyncEvent::Link { code, state } => Message::RemoteLink { code, state },
            };
            let _ = tx.send(message);
        });
        self.remote = Some(RemoteSync::spawn(service, code, sink));
    }

    async fn leave_remote(&mut self) {
        if let Some(remote) = self.remote.take() {
            remote.stop().await;
        }
    }

    async fn teardown(&mut self) {
        self.stop_ticker();
        self.leave_remote().await;
        self.close_stream().await;
    }
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle to a running kiosk
///
/// Dropping the handle shuts the kiosk down without waiting for it.
pub struct KioskHandle {
    tx: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<SessionState>,
    camera: CameraBackendManager,
    task: Option<JoinHandle<()>>,
}

impl KioskHandle {
    /// Queue a message, `false` once the kiosk has stopped
    pub fn send(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Latest published state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Follow state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait for a published state matching `predicate`
    pub async fn wait_for(&mut self, predicate: impl FnMut(&SessionState) -> bool) -> Option<SessionState> {
        self.state.wait_for(predicate).await.ok().map(|state| state.clone())
    }

    pub fn camera(&self) -> &CameraBackendManager {
        &self.camera
    }

    /// Decode an overlay file and install it for `mode`
    ///
    /// An unreadable file is installed as such; captures then go ahead
    /// without an overlay.
    pub async fn load_overlay(&self, mode: CaptureMode, path: &Path) -> bool {
        let overlay = overlay::load_file(path).await;
        self.send(Message::OverlayLoaded { mode, overlay })
    }

    /// Decode overlay bytes and install them for `mode`
    pub async fn load_overlay_bytes(&self, mode: CaptureMode, bytes: Vec<u8>) -> bool {
        let overlay = overlay::decode(bytes).await.into();
        self.send(Message::OverlayLoaded { mode, overlay })
    }

    /// Stop the kiosk and wait for camera and remote to be released
    pub async fn shutdown(mut self) {
        self.send(Message::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Kiosk task ended abnormally");
            }
        }
    }
}

impl Drop for KioskHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(Message::Shutdown);
        }
    }
}
