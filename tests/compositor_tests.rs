// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the photo compositor

use image::{Rgba, RgbaImage};
use photobooth::backends::camera::CameraFrame;
use photobooth::constants::{CaptureMode, Resolution};
use photobooth::pipelines::photo::{PhotoPipeline, compose, crop_plan};
use std::sync::Arc;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Left half red, right half blue
fn split_frame(width: u32, height: u32) -> CameraFrame {
    CameraFrame::from_rgba(RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 { RED } else { BLUE }
    }))
}

#[test]
fn test_output_matches_target_exactly() {
    let pipeline = PhotoPipeline::default();
    for (source, mode) in [
        (Resolution::new(640, 480), CaptureMode::Portrait),
        (Resolution::new(640, 480), CaptureMode::Landscape),
        (Resolution::new(1280, 720), CaptureMode::Portrait),
        (Resolution::new(480, 640), CaptureMode::Landscape),
    ] {
        let frame = split_frame(source.width, source.height);
        let result = pipeline.compose(&frame, None, mode).unwrap();
        let target = pipeline.target(mode);
        assert_eq!((result.width, result.height), (target.width, target.height));
        assert_eq!(result.decode().unwrap().dimensions(), (target.width, target.height));
        assert_eq!(result.mode, mode);
    }
}

#[test]
fn test_crop_margins_symmetric() {
    for (source, target) in [
        (Resolution::new(1920, 1080), Resolution::new(1080, 1920)),
        (Resolution::new(1280, 720), Resolution::new(1440, 1080)),
        (Resolution::new(640, 480), Resolution::new(1080, 1920)),
        (Resolution::new(480, 640), Resolution::new(1440, 1080)),
        (Resolution::new(1001, 999), Resolution::new(3, 7)),
    ] {
        let plan = crop_plan(source, target);
        let (left, right) = plan.horizontal_margins(source);
        let (top, bottom) = plan.vertical_margins(source);
        assert_eq!(left, right, "{} -> {}", source, target);
        assert_eq!(top, bottom, "{} -> {}", source, target);
        assert!(left == 0 || top == 0, "only one axis is cropped");
    }
}

#[test]
fn test_video_is_mirrored() {
    let frame = split_frame(4, 2);
    let result = compose(&frame, None, CaptureMode::Landscape, Resolution::new(4, 2)).unwrap();
    let image = result.decode().unwrap();

    assert_eq!(*image.get_pixel(0, 0), BLUE);
    assert_eq!(*image.get_pixel(3, 1), RED);
}

#[test]
fn test_overlay_drawn_unmirrored_on_top() {
    let frame = split_frame(4, 2);
    let mut overlay = RgbaImage::new(4, 2);
    overlay.put_pixel(0, 0, GREEN);

    let result = compose(&frame, Some(&overlay), CaptureMode::Landscape, Resolution::new(4, 2)).unwrap();
    let image = result.decode().unwrap();

    assert_eq!(*image.get_pixel(0, 0), GREEN);
    // Transparent overlay pixels leave the video visible
    assert_eq!(*image.get_pixel(0, 1), BLUE);
    assert_eq!(*image.get_pixel(3, 0), RED);
}

#[test]
fn test_compose_is_deterministic() {
    let frame = split_frame(64, 48);
    let overlay = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 64]));
    let pipeline = PhotoPipeline::new(Resolution::new(30, 40), Resolution::new(40, 30));

    let first = pipeline.compose(&frame, Some(&overlay), CaptureMode::Portrait).unwrap();
    let second = pipeline.compose(&frame, Some(&overlay), CaptureMode::Portrait).unwrap();
    assert!(first == second);
}

#[test]
fn test_data_url_prefix() {
    let frame = split_frame(8, 8);
    let result = compose(&frame, None, CaptureMode::Portrait, Resolution::new(4, 8)).unwrap();
    assert!(result.to_data_url().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_compose_async_matches_sync() {
    let pipeline = PhotoPipeline::new(Resolution::new(20, 30), Resolution::new(30, 20));
    let frame = split_frame(64, 48);
    let overlay = Arc::new(RgbaImage::from_pixel(5, 5, GREEN));

    let sync = pipeline.compose(&frame, Some(&overlay), CaptureMode::Landscape).unwrap();
    let async_result = pipeline
        .compose_async(frame, Some(overlay), CaptureMode::Landscape)
        .await
        .unwrap();
    assert!(sync == async_result);
}
