// SPDX-License-Identifier: MPL-2.0

//! Remote control over a real relay on localhost

use photobooth::app::{Kiosk, KioskServices, Phase};
use photobooth::backends::camera::{VirtualCamera, VirtualDevice};
use photobooth::backends::realtime::relay::RelayServer;
use photobooth::backends::realtime::{BroadcastEvent, ConnectionState, LocalHub, RealtimeService, WebSocketService};
use photobooth::backends::upload::DisabledUploader;
use photobooth::config::Config;
use photobooth::constants::{Resolution, TimerDuration};
use photobooth::errors::ChannelError;
use photobooth::remote::{RemoteAction, RemoteController, RemoteSync, SessionCode, SyncEvent, SyncSink};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(10);

async fn start_relay() -> (WebSocketService, LocalHub) {
    let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let hub = server.hub().clone();
    tokio::spawn(server.run());
    (WebSocketService::new(&format!("ws://{}", addr)), hub)
}

fn sink() -> (SyncSink, mpsc::UnboundedReceiver<SyncEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink: SyncSink = Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (sink, rx)
}

/// Next command, skipping link events
async fn next_command(events: &mut mpsc::UnboundedReceiver<SyncEvent>) -> Option<RemoteAction> {
    loop {
        match events.recv().await? {
            SyncEvent::Command { command, .. } => return Some(command.action),
            SyncEvent::Link { .. } => {}
        }
    }
}

async fn until_connected(events: &mut mpsc::UnboundedReceiver<SyncEvent>) {
    tokio::time::timeout(WAIT, async {
        while let Some(event) = events.recv().await {
            if let SyncEvent::Link {
                state: ConnectionState::Connected,
                ..
            } = event
            {
                return;
            }
        }
        panic!("sync task ended before connecting");
    })
    .await
    .expect("link up");
}

fn code(s: &str) -> SessionCode {
    SessionCode::parse(s).unwrap()
}

#[tokio::test]
async fn test_commands_cross_the_relay() {
    let (service, _hub) = start_relay().await;
    let service: Arc<dyn RealtimeService> = Arc::new(service);
    let (sink, mut events) = sink();
    let sync = RemoteSync::spawn(Arc::clone(&service), code("ABC234"), sink);
    until_connected(&mut events).await;

    let remote = RemoteController::connect(service.as_ref(), code("ABC234")).await;
    assert!(remote.state().is_connected());
    remote
        .send(RemoteAction::SetTimer {
            timer: TimerDuration::Ten,
        })
        .await
        .unwrap();
    remote.send(RemoteAction::TakePhoto).await.unwrap();

    let first = tokio::time::timeout(WAIT, next_command(&mut events)).await.unwrap();
    let second = tokio::time::timeout(WAIT, next_command(&mut events)).await.unwrap();
    assert_eq!(
        first,
        Some(RemoteAction::SetTimer {
            timer: TimerDuration::Ten
        })
    );
    assert_eq!(second, Some(RemoteAction::TakePhoto));

    remote.disconnect().await;
    sync.stop().await;
}

#[tokio::test]
async fn test_other_codes_are_isolated() {
    let (service, _hub) = start_relay().await;
    let service: Arc<dyn RealtimeService> = Arc::new(service);
    let (sink, mut events) = sink();
    let sync = RemoteSync::spawn(Arc::clone(&service), code("ABC234"), sink);
    until_connected(&mut events).await;

    let stranger = RemoteController::connect(service.as_ref(), code("XYZ789")).await;
    stranger.send(RemoteAction::TakePhoto).await.unwrap();

    let got = tokio::time::timeout(Duration::from_millis(300), next_command(&mut events)).await;
    assert!(got.is_err(), "command leaked across session codes");

    stranger.disconnect().await;
    sync.stop().await;
}

#[tokio::test]
async fn test_malformed_broadcasts_are_dropped() {
    let (service, _hub) = start_relay().await;
    let service: Arc<dyn RealtimeService> = Arc::new(service);
    let (sink, mut events) = sink();
    let sync = RemoteSync::spawn(Arc::clone(&service), code("ABC234"), sink);
    until_connected(&mut events).await;

    let raw = service.join(&code("ABC234").channel_name()).await.unwrap();
    for payload in [
        json!({"v": 2, "action": "take_photo"}),
        json!({"v": 1, "action": "set_timer", "timer": 4}),
        json!({"v": 1, "action": "self_destruct"}),
    ] {
        raw.broadcast(BroadcastEvent {
            event: "remote-command".into(),
            payload,
        })
        .await
        .unwrap();
    }
    raw.broadcast(BroadcastEvent {
        event: "remote-command".into(),
        payload: json!({"v": 1, "action": "ping"}),
    })
    .await
    .unwrap();

    // Only the valid command comes through
    let got = tokio::time::timeout(WAIT, next_command(&mut events)).await.unwrap();
    assert_eq!(got, Some(RemoteAction::Ping));

    raw.leave().await;
    sync.stop().await;
}

#[tokio::test]
async fn test_members_do_not_hear_themselves() {
    let (service, _hub) = start_relay().await;
    let mut a = service.join("room").await.unwrap();
    let mut b = service.join("room").await.unwrap();

    a.broadcast(BroadcastEvent {
        event: "hello".into(),
        payload: json!({"n": 1}),
    })
    .await
    .unwrap();

    let got = tokio::time::timeout(WAIT, b.recv()).await.unwrap().unwrap();
    assert_eq!(got.event, "hello");
    assert_eq!(got.payload, json!({"n": 1}));
    assert!(
        tokio::time::timeout(Duration::from_millis(200), a.recv())
            .await
            .is_err()
    );

    a.leave().await;
    b.leave().await;
}

#[tokio::test]
async fn test_stop_releases_the_subscription() {
    let (service, hub) = start_relay().await;
    let (sink, mut events) = sink();
    let sync = RemoteSync::spawn(Arc::new(service), code("ABC234"), sink);
    until_connected(&mut events).await;
    let channel = code("ABC234").channel_name();
    assert_eq!(hub.subscriber_count(&channel), 1);

    sync.stop().await;
    tokio::time::timeout(WAIT, async {
        while hub.subscriber_count(&channel) > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("relay membership released");
    assert_eq!(hub.channel_count(), 0);
}

#[tokio::test]
async fn test_unreachable_relay_refuses_to_send() {
    let service = WebSocketService::new("ws://127.0.0.1:9");
    let remote = RemoteController::connect(&service, code("ABC234")).await;

    assert!(matches!(remote.state(), ConnectionState::Error(_)));
    assert_eq!(
        remote.send(RemoteAction::TakePhoto).await,
        Err(ChannelError::NotConnected)
    );
}

#[tokio::test]
async fn test_phone_triggers_kiosk_through_relay() {
    let (service, _hub) = start_relay().await;
    let service: Arc<dyn RealtimeService> = Arc::new(service);
    let config = Config {
        portrait: Resolution::new(90, 160),
        landscape: Resolution::new(120, 90),
        device_poll_secs: 0,
        ..Config::default()
    };
    let services = KioskServices {
        source: Arc::new(VirtualCamera::new(vec![VirtualDevice::test_pattern(
            "cam-a",
            "Camera",
            Resolution::new(160, 120),
        )])),
        uploader: Arc::new(DisabledUploader),
        realtime: Some(Arc::clone(&service)),
    };
    let mut handle = Kiosk::new(&config, services).spawn();

    let state = tokio::time::timeout(
        WAIT,
        handle.wait_for(|s| s.stream_ready() && s.remote_link == Some(ConnectionState::Connected)),
    )
    .await
    .unwrap()
    .unwrap();
    let code = state.session_code.expect("session code");

    let remote = RemoteController::connect(service.as_ref(), code).await;
    remote.send(RemoteAction::TakePhoto).await.unwrap();

    let state = tokio::time::timeout(WAIT, handle.wait_for(|s| s.phase == Phase::Result))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.gallery.len(), 1);

    remote.disconnect().await;
    handle.shutdown().await;
}
