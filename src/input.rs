//! Virtual input device boundary and the fixed key code table.

use std::fmt;

use anyhow::Result;

/// Linux input key codes emitted by the sensor.
///
/// These mirror the kernel's `KEY_*` values; the gesture navigation keys are
/// the plain directional codes.
pub mod codes {
    pub const KEY_SELECT: u32 = 0x161;
    pub const KEY_POWER: u32 = 116;
    pub const KEY_CAMERA: u32 = 212;
    pub const KEY_HOMEPAGE: u32 = 172;
    pub const KEY_MENU: u32 = 139;
    pub const KEY_BACK: u32 = 158;

    pub const TAP_KEY: u32 = 114;
    pub const DOUBLE_TAP_KEY: u32 = 115;
    pub const LONG_PRESS_KEY: u32 = 217;

    pub const NAV_UP_KEY: u32 = 103;
    pub const NAV_DOWN_KEY: u32 = 108;
    pub const NAV_LEFT_KEY: u32 = 105;
    pub const NAV_RIGHT_KEY: u32 = 106;
}

/// Sink for key reports on a registered virtual input device.
///
/// Each `emit_key` call is one report followed by a sync, matching the
/// kernel's report/sync pairing. Implementations must be callable from any
/// thread.
pub trait InputSink: Send + Sync + fmt::Debug {
    /// Reports `code` with the given value (1 press, 0 release).
    fn emit_key(&self, code: u32, value: i32) -> Result<()>;
}

/// Emits a full synthetic press+release pair for `code`.
pub fn emit_pair(sink: &dyn InputSink, code: u32) -> Result<()> {
    sink.emit_key(code, 1)?;
    sink.emit_key(code, 0)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording sink shared by the core's unit tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        events: Mutex<Vec<(u32, i32)>>,
    }

    impl RecordingSink {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn events(&self) -> Vec<(u32, i32)> {
            self.events.lock().unwrap().clone()
        }
    }

    impl fmt::Debug for RecordingSink {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "RecordingSink")
        }
    }

    impl InputSink for RecordingSink {
        fn emit_key(&self, code: u32, value: i32) -> Result<()> {
            self.events.lock().unwrap().push((code, value));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn emit_pair_presses_then_releases() {
        let sink = RecordingSink::new();
        emit_pair(&sink, codes::KEY_POWER).unwrap();
        assert_eq!(sink.events(), vec![(codes::KEY_POWER, 1), (codes::KEY_POWER, 0)]);
    }
}
