//! Fixed translation tables from sensor key and gesture codes to input events.
//!
//! The tables are policy, not configuration: they mirror the sensor
//! firmware's abstract codes and are the single artifact to touch when a
//! board wants different key behavior.

use anyhow::Result;
use log::{debug, warn};
use once_cell::sync::Lazy;

use crate::input::{InputSink, codes, emit_pair};

/// Abstract key codes reported by the sensor firmware.
///
/// Codes outside the known range are carried as [`SensorKey::Raw`] and passed
/// through to the input device unchanged — raw passthrough is intentional and
/// part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKey {
    None,
    Home,
    Power,
    Menu,
    Back,
    Capture,
    Up,
    Down,
    Left,
    Right,
    Tap,
    Heavy,
    DoubleTap,
    LongPress,
    Raw(u32),
}

impl SensorKey {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Home,
            2 => Self::Power,
            3 => Self::Menu,
            4 => Self::Back,
            5 => Self::Capture,
            6 => Self::Up,
            7 => Self::Down,
            8 => Self::Left,
            9 => Self::Right,
            10 => Self::Tap,
            11 => Self::Heavy,
            12 => Self::DoubleTap,
            13 => Self::LongPress,
            other => Self::Raw(other),
        }
    }

    /// The abstract wire code this key was parsed from.
    pub fn raw_code(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Home => 1,
            Self::Power => 2,
            Self::Menu => 3,
            Self::Back => 4,
            Self::Capture => 5,
            Self::Up => 6,
            Self::Down => 7,
            Self::Left => 8,
            Self::Right => 9,
            Self::Tap => 10,
            Self::Heavy => 11,
            Self::DoubleTap => 12,
            Self::LongPress => 13,
            Self::Raw(code) => *code,
        }
    }

    /// Linux input code this key translates to.
    ///
    /// Unmapped keys translate to their own raw code (passthrough).
    pub fn input_code(&self) -> u32 {
        match self {
            Self::Home => codes::KEY_SELECT,
            Self::Power => codes::KEY_POWER,
            Self::Capture => codes::KEY_CAMERA,
            Self::LongPress => codes::LONG_PRESS_KEY,
            Self::DoubleTap => codes::DOUBLE_TAP_KEY,
            Self::Tap => codes::TAP_KEY,
            Self::Up => codes::NAV_UP_KEY,
            Self::Down => codes::NAV_DOWN_KEY,
            Self::Left => codes::NAV_LEFT_KEY,
            Self::Right => codes::NAV_RIGHT_KEY,
            other => other.raw_code(),
        }
    }
}

/// Navigation gesture codes reported by the sensor firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavGesture {
    None,
    FingerUp,
    FingerDown,
    Up,
    Down,
    Left,
    Right,
    Click,
    Heavy,
    LongPress,
    DoubleClick,
    Unknown(u32),
}

impl NavGesture {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::None,
            1 => Self::FingerUp,
            2 => Self::FingerDown,
            3 => Self::Up,
            4 => Self::Down,
            5 => Self::Left,
            6 => Self::Right,
            7 => Self::Click,
            8 => Self::Heavy,
            9 => Self::LongPress,
            10 => Self::DoubleClick,
            other => Self::Unknown(other),
        }
    }
}

/// Every input code the virtual device registers at creation time.
pub static REGISTERED_KEYS: Lazy<Vec<u32>> = Lazy::new(|| {
    vec![
        codes::KEY_SELECT,
        codes::KEY_POWER,
        codes::KEY_CAMERA,
        codes::KEY_HOMEPAGE,
        codes::KEY_MENU,
        codes::KEY_BACK,
        codes::TAP_KEY,
        codes::DOUBLE_TAP_KEY,
        codes::LONG_PRESS_KEY,
        codes::NAV_UP_KEY,
        codes::NAV_DOWN_KEY,
        codes::NAV_LEFT_KEY,
        codes::NAV_RIGHT_KEY,
    ]
});

/// Emits the input events for one key-event command.
///
/// POWER and CAPTURE emit a synthetic press+release pair regardless of the
/// caller-supplied value; the directional keys always emit a pair; everything
/// else is a single report carrying the caller's value.
pub fn emit_key_event(sink: &dyn InputSink, key: SensorKey, value: i32) -> Result<()> {
    debug!(
        "key event: key={key:?} input_code={} value={value}",
        key.input_code()
    );

    match key {
        SensorKey::Power | SensorKey::Capture => emit_pair(sink, key.input_code()),
        SensorKey::Up => emit_pair(sink, codes::NAV_UP_KEY),
        SensorKey::Down => emit_pair(sink, codes::NAV_DOWN_KEY),
        SensorKey::Left => emit_pair(sink, codes::NAV_LEFT_KEY),
        SensorKey::Right => emit_pair(sink, codes::NAV_RIGHT_KEY),
        other => sink.emit_key(other.input_code(), value),
    }
}

/// Emits the input events for one navigation gesture.
///
/// Directional swipes emit a press+release pair of the opposite navigation
/// key (the firmware reports swipe direction, the UI consumes scroll
/// direction). Gestures with no input mapping are logged only — navigation
/// has no raw-passthrough concept, unlike keys.
pub fn emit_nav_event(sink: &dyn InputSink, gesture: NavGesture) -> Result<()> {
    match gesture {
        NavGesture::FingerDown => {
            debug!("nav finger down");
            Ok(())
        }
        NavGesture::FingerUp => {
            debug!("nav finger up");
            Ok(())
        }
        NavGesture::Down => {
            debug!("nav down");
            emit_pair(sink, codes::NAV_UP_KEY)
        }
        NavGesture::Up => {
            debug!("nav up");
            emit_pair(sink, codes::NAV_DOWN_KEY)
        }
        NavGesture::Left => {
            debug!("nav left");
            emit_pair(sink, codes::NAV_RIGHT_KEY)
        }
        NavGesture::Right => {
            debug!("nav right");
            emit_pair(sink, codes::NAV_LEFT_KEY)
        }
        NavGesture::Click | NavGesture::None => {
            debug!("nav click");
            Ok(())
        }
        NavGesture::Heavy | NavGesture::LongPress | NavGesture::DoubleClick => {
            debug!("nav gesture {gesture:?} has no input mapping");
            Ok(())
        }
        NavGesture::Unknown(code) => {
            warn!("unknown nav event: {code}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::testing::RecordingSink;
    use pretty_assertions::assert_eq;

    #[test]
    fn key_codes_round_trip() {
        for code in 0..32 {
            assert_eq!(SensorKey::from_code(code).raw_code(), code);
        }
    }

    #[test]
    fn translation_table_is_fixed() {
        assert_eq!(SensorKey::Home.input_code(), codes::KEY_SELECT);
        assert_eq!(SensorKey::Power.input_code(), codes::KEY_POWER);
        assert_eq!(SensorKey::Capture.input_code(), codes::KEY_CAMERA);
        assert_eq!(SensorKey::LongPress.input_code(), codes::LONG_PRESS_KEY);
        assert_eq!(SensorKey::DoubleTap.input_code(), codes::DOUBLE_TAP_KEY);
        assert_eq!(SensorKey::Tap.input_code(), codes::TAP_KEY);
    }

    #[test]
    fn unmapped_keys_pass_their_raw_code_through() {
        assert_eq!(SensorKey::Menu.input_code(), 3);
        assert_eq!(SensorKey::Back.input_code(), 4);
        assert_eq!(SensorKey::Raw(999).input_code(), 999);
    }

    #[test]
    fn power_emits_pair_regardless_of_value() {
        for value in [0, 1, 7] {
            let sink = RecordingSink::new();
            emit_key_event(&sink, SensorKey::Power, value).unwrap();
            assert_eq!(sink.events(), vec![(codes::KEY_POWER, 1), (codes::KEY_POWER, 0)]);
        }
    }

    #[test]
    fn capture_emits_pair_regardless_of_value() {
        let sink = RecordingSink::new();
        emit_key_event(&sink, SensorKey::Capture, 0).unwrap();
        assert_eq!(sink.events(), vec![(codes::KEY_CAMERA, 1), (codes::KEY_CAMERA, 0)]);
    }

    #[test]
    fn directional_keys_emit_pairs() {
        let cases = [
            (SensorKey::Up, codes::NAV_UP_KEY),
            (SensorKey::Down, codes::NAV_DOWN_KEY),
            (SensorKey::Left, codes::NAV_LEFT_KEY),
            (SensorKey::Right, codes::NAV_RIGHT_KEY),
        ];
        for (key, expected) in cases {
            let sink = RecordingSink::new();
            emit_key_event(&sink, key, 0).unwrap();
            assert_eq!(sink.events(), vec![(expected, 1), (expected, 0)]);
        }
    }

    #[test]
    fn other_keys_emit_single_report_with_caller_value() {
        let sink = RecordingSink::new();
        emit_key_event(&sink, SensorKey::Home, 1).unwrap();
        emit_key_event(&sink, SensorKey::Raw(42), 0).unwrap();
        assert_eq!(sink.events(), vec![(codes::KEY_SELECT, 1), (42, 0)]);
    }

    #[test]
    fn nav_swipes_emit_inverted_pairs() {
        let cases = [
            (NavGesture::Down, codes::NAV_UP_KEY),
            (NavGesture::Up, codes::NAV_DOWN_KEY),
            (NavGesture::Left, codes::NAV_RIGHT_KEY),
            (NavGesture::Right, codes::NAV_LEFT_KEY),
        ];
        for (gesture, expected) in cases {
            let sink = RecordingSink::new();
            emit_nav_event(&sink, gesture).unwrap();
            assert_eq!(sink.events(), vec![(expected, 1), (expected, 0)]);
        }
    }

    #[test]
    fn unmapped_nav_gestures_emit_nothing() {
        let gestures = [
            NavGesture::FingerDown,
            NavGesture::FingerUp,
            NavGesture::Click,
            NavGesture::Heavy,
            NavGesture::LongPress,
            NavGesture::DoubleClick,
            NavGesture::Unknown(77),
        ];
        for gesture in gestures {
            let sink = RecordingSink::new();
            emit_nav_event(&sink, gesture).unwrap();
            assert_eq!(sink.events(), Vec::<(u32, i32)>::new(), "{gesture:?}");
        }
    }

    #[test]
    fn registered_keys_cover_the_translation_targets() {
        for key in [SensorKey::Home, SensorKey::Power, SensorKey::Capture, SensorKey::Tap] {
            assert!(REGISTERED_KEYS.contains(&key.input_code()));
        }
    }
}
