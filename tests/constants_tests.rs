// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use photobooth::constants::{
    CaptureMode, PORTRAIT_TARGET, LANDSCAPE_TARGET, TimerDuration, photo_file_name, session_code,
};

#[test]
fn test_timer_values() {
    let seconds: Vec<u32> = TimerDuration::ALL.iter().map(|t| t.seconds()).collect();
    assert_eq!(seconds, vec![3, 5, 10]);
}

#[test]
fn test_timer_cycle_visits_all() {
    let mut timer = TimerDuration::Three;
    for expected in [TimerDuration::Five, TimerDuration::Ten, TimerDuration::Three] {
        timer = timer.next();
        assert_eq!(timer, expected);
    }
}

#[test]
fn test_timer_conversion_closed_set() {
    assert_eq!(TimerDuration::try_from(5), Ok(TimerDuration::Five));
    assert!(TimerDuration::try_from(0).is_err());
    assert!(TimerDuration::try_from(4).is_err());
}

#[test]
fn test_mode_targets_orientation() {
    assert!(PORTRAIT_TARGET.height > PORTRAIT_TARGET.width);
    assert!(LANDSCAPE_TARGET.width > LANDSCAPE_TARGET.height);
    assert_eq!(CaptureMode::Portrait.toggled(), CaptureMode::Landscape);
    assert_eq!(CaptureMode::Landscape.toggled(), CaptureMode::Portrait);
}

#[test]
fn test_session_code_alphabet_unambiguous() {
    for c in b"01OIL" {
        assert!(
            !session_code::ALPHABET.contains(c),
            "{} should not be in the alphabet",
            *c as char
        );
    }
}

#[test]
fn test_photo_file_name() {
    assert_eq!(photo_file_name(1700000000123), "photobooth_1700000000123.png");
}
