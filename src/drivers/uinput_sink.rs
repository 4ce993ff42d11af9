//! Virtual input device implementation of [`InputSink`].

use std::fmt;
use std::sync::Mutex;

use anyhow::{Context, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use log::debug;

use crate::error::SensorError;
use crate::input::InputSink;
use crate::keymap::REGISTERED_KEYS;

/// Key sink backed by a uinput virtual device.
///
/// The device registers every code in [`REGISTERED_KEYS`] at creation time;
/// raw passthrough codes outside that set are still written, the input layer
/// just drops reports for unregistered codes.
pub struct UinputSink {
    device: Mutex<VirtualDevice>,
}

impl UinputSink {
    /// Creates the virtual device. Failure here means the input subsystem
    /// refused the allocation and the sensor cannot deliver key events;
    /// it surfaces as [`SensorError::Exhausted`].
    pub fn create(name: &str) -> Result<Self, SensorError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in REGISTERED_KEYS.iter() {
            keys.insert(Key::new(*code as u16));
        }

        let device = Self::allocate(name, &keys)
            .map_err(|e| SensorError::Exhausted(format!("virtual input device: {e}")))?;

        debug!("virtual input device '{name}' registered");
        Ok(Self {
            device: Mutex::new(device),
        })
    }

    fn allocate(name: &str, keys: &AttributeSet<Key>) -> std::io::Result<VirtualDevice> {
        VirtualDeviceBuilder::new()?.name(name).with_keys(keys)?.build()
    }
}

impl fmt::Debug for UinputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UinputSink")
    }
}

impl InputSink for UinputSink {
    fn emit_key(&self, code: u32, value: i32) -> Result<()> {
        let event = InputEvent::new(EventType::KEY, code as u16, value);
        self.device
            .lock()
            .unwrap()
            .emit(&[event])
            .context("writing key report")
    }
}
