// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use photobooth::Config;
use photobooth::config::{RealtimeConfig, UploadConfig};
use photobooth::constants::{CaptureMode, Resolution, TimerDuration};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.portrait, Resolution::new(1080, 1920));
    assert_eq!(config.landscape, Resolution::new(1440, 1080));
    assert_eq!(config.default_mode, CaptureMode::Portrait);
    assert_eq!(config.default_timer, TimerDuration::Three);
    assert_eq!(
        config.upload,
        UploadConfig::Disabled,
        "Uploads should be off until credentials are configured"
    );
    assert!(config.realtime.relay_url.is_none());
}

#[test]
fn test_target_size_follows_mode() {
    let config = Config::default();
    assert_eq!(config.target_size(CaptureMode::Portrait), config.portrait);
    assert_eq!(config.target_size(CaptureMode::Landscape), config.landscape);
}

#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        default_mode: CaptureMode::Landscape,
        default_timer: TimerDuration::Ten,
        upload: UploadConfig::Http {
            endpoint: "https://img.example.com/upload".into(),
            api_key: Some("secret".into()),
        },
        realtime: RealtimeConfig {
            relay_url: Some("ws://booth.local:8787".into()),
        },
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    assert_eq!(Config::load_from(&path).unwrap(), config);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "default_timer": 5 }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.default_timer, TimerDuration::Five);
    assert_eq!(config.portrait, Config::default().portrait);
}

#[test]
fn test_broken_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load_or_default(&path), Config::default());
}

#[test]
fn test_unsupported_timer_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "default_timer": 7 }"#).unwrap();

    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_storage_provider_tagged() {
    let upload = UploadConfig::Storage {
        base_url: "https://store.example.com".into(),
        bucket: "booth".into(),
        token: "t".into(),
        public_base_url: "https://cdn.example.com".into(),
    };
    let json = serde_json::to_value(&upload).unwrap();
    assert_eq!(json["provider"], "storage");
}
