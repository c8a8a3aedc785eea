// SPDX-License-Identifier: MPL-2.0

//! Upload services against a mock HTTP server

use image::RgbaImage;
use photobooth::backends::upload::{self, HttpUploader, StorageUploader, Uploader};
use photobooth::config::UploadConfig;
use photobooth::constants::CaptureMode;
use photobooth::errors::UploadError;
use photobooth::pipelines::photo::CompositeResult;
use photobooth::pipelines::photo::encoding::encode_png;

fn composite() -> CompositeResult {
    encode_png(&RgbaImage::new(4, 6), CaptureMode::Portrait).unwrap()
}

#[tokio::test]
async fn test_http_upload_returns_url() {
    let mut server = mockito::Server::new_async().await;
    let image = composite();
    let mock = server
        .mock("POST", "/upload")
        .match_header("content-type", "image/png")
        .match_header("authorization", "Bearer secret")
        .match_header("x-capture-time", "1700000000000")
        .match_body(image.png.to_vec())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": true, "url": "https://img.example.com/abc.png"}"#)
        .create_async()
        .await;

    let uploader = HttpUploader::new(&format!("{}/upload", server.url()), Some("secret".into())).unwrap();
    let url = uploader.upload(&image, 1_700_000_000_000).await.unwrap();

    assert_eq!(url, "https://img.example.com/abc.png");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_rejection_is_service_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(r#"{"success": false, "error": "quota exceeded"}"#)
        .create_async()
        .await;

    let uploader = HttpUploader::new(&format!("{}/upload", server.url()), None).unwrap();
    let err = uploader.upload(&composite(), 1).await.unwrap_err();
    assert_eq!(err, UploadError::Service("quota exceeded".into()));
}

#[tokio::test]
async fn test_http_bad_url_in_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(r#"{"success": true, "url": "ftp://img.example.com/abc.png"}"#)
        .create_async()
        .await;

    let uploader = HttpUploader::new(&format!("{}/upload", server.url()), None).unwrap();
    let err = uploader.upload(&composite(), 1).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_http_credentials_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(401)
        .with_body("bad key")
        .create_async()
        .await;

    let uploader = HttpUploader::new(&format!("{}/upload", server.url()), Some("wrong".into())).unwrap();
    match uploader.upload(&composite(), 1).await {
        Err(UploadError::Service(message)) => assert!(message.contains("credentials")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_storage_put_and_public_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PUT", "/booth/photobooth_42.png")
        .match_header("authorization", "Bearer token")
        .match_header("content-type", "image/png")
        .with_status(200)
        .create_async()
        .await;

    let uploader = StorageUploader::new(
        &format!("{}/", server.url()),
        "booth",
        "token",
        "https://cdn.example.com/",
    )
    .unwrap();
    let url = uploader.upload(&composite(), 42).await.unwrap();

    assert_eq!(url, "https://cdn.example.com/booth/photobooth_42.png");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_storage_server_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/booth/photobooth_7.png")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let uploader = StorageUploader::new(&server.url(), "booth", "token", "https://cdn.example.com").unwrap();
    let err = uploader.upload(&composite(), 7).await.unwrap_err();
    assert!(matches!(err, UploadError::Service(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Nothing listens on the discard port
    let uploader = HttpUploader::new("http://127.0.0.1:9/upload", None).unwrap();
    let err = uploader.upload(&composite(), 1).await.unwrap_err();
    assert!(matches!(err, UploadError::Network(_)));
}

#[tokio::test]
async fn test_disabled_config_never_uploads() {
    let uploader = upload::from_config(&UploadConfig::Disabled);
    assert!(!uploader.is_enabled());
    assert_eq!(uploader.upload(&composite(), 1).await, Err(UploadError::Disabled));
}
