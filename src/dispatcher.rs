//! Command dispatch for the control surface.
//!
//! Every command is validated the same way before any effect runs: the code
//! is decoded, the payload direction and size are checked, then availability
//! gating is applied. Only after all three pass does the command body touch
//! the device.

use std::sync::Arc;

use log::{debug, info};

use crate::config::ConfigManager;
use crate::device::SensorDevice;
use crate::error::SensorError;
use crate::input::InputSink;
use crate::keymap::{self, NavGesture, SensorKey};

/// Route number reported to callers of the init command. Clients use it to
/// subscribe to the right event stream.
const TRANSPORT_ROUTE: u8 = 25;

/// Reset pulse width used by the reset command.
const RESET_HOLD: std::time::Duration = std::time::Duration::from_millis(3);

/// Payload transfer direction, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No payload.
    None,
    /// The daemon fills the payload for the caller to read back.
    Read,
    /// The caller supplies the payload.
    Write,
}

/// Decoded control-surface commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Init,
    Exit,
    Reset,
    EnableIrq,
    DisableIrq,
    EnableSpiClk,
    DisableSpiClk,
    EnablePower,
    DisablePower,
    KeyEvent,
    EnterSleep,
    FwInfo,
    Remove,
    ChipInfo,
    NavEvent,
    EnableGpio,
    ReleaseGpio,
}

impl Command {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Init,
            1 => Self::Exit,
            2 => Self::Reset,
            3 => Self::EnableIrq,
            4 => Self::DisableIrq,
            5 => Self::EnableSpiClk,
            6 => Self::DisableSpiClk,
            7 => Self::EnablePower,
            8 => Self::DisablePower,
            9 => Self::KeyEvent,
            10 => Self::EnterSleep,
            11 => Self::FwInfo,
            12 => Self::Remove,
            13 => Self::ChipInfo,
            14 => Self::NavEvent,
            15 => Self::EnableGpio,
            16 => Self::ReleaseGpio,
            _ => return None,
        })
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Init | Self::FwInfo => Direction::Read,
            Self::EnableSpiClk | Self::KeyEvent | Self::ChipInfo | Self::NavEvent => {
                Direction::Write
            }
            _ => Direction::None,
        }
    }

    pub fn payload_len(&self) -> usize {
        match self {
            Self::Init | Self::FwInfo => 1,
            Self::EnableSpiClk | Self::NavEvent => 4,
            Self::KeyEvent | Self::ChipInfo => 8,
            _ => 0,
        }
    }

    /// Whether the command requires an available device.
    ///
    /// Init, exit, the power pair, and GPIO rebinding stay reachable while
    /// the device is down; they are how a client brings it back up.
    pub fn is_gated(&self) -> bool {
        !matches!(
            self,
            Self::Init | Self::Exit | Self::EnablePower | Self::DisablePower | Self::EnableGpio
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Exit => "exit",
            Self::Reset => "reset",
            Self::EnableIrq => "enable-irq",
            Self::DisableIrq => "disable-irq",
            Self::EnableSpiClk => "enable-spi-clk",
            Self::DisableSpiClk => "disable-spi-clk",
            Self::EnablePower => "enable-power",
            Self::DisablePower => "disable-power",
            Self::KeyEvent => "key-event",
            Self::EnterSleep => "enter-sleep",
            Self::FwInfo => "fw-info",
            Self::Remove => "remove",
            Self::ChipInfo => "chip-info",
            Self::NavEvent => "nav-event",
            Self::EnableGpio => "enable-gpio",
            Self::ReleaseGpio => "release-gpio",
        }
    }
}

/// Executes control-surface commands against the device registry.
pub struct CommandDispatcher {
    device: Arc<SensorDevice>,
    input: Arc<dyn InputSink>,
    config: ConfigManager,
}

impl CommandDispatcher {
    pub fn new(device: Arc<SensorDevice>, input: Arc<dyn InputSink>, config: ConfigManager) -> Self {
        Self {
            device,
            input,
            config,
        }
    }

    /// Runs one command. Read-direction commands write their result back
    /// into `payload`.
    ///
    /// An unrecognized code is logged and reported as success; clients built
    /// against newer command tables keep working against older daemons.
    pub async fn dispatch(&self, code: u32, payload: &mut Vec<u8>) -> Result<(), SensorError> {
        let Some(command) = Command::from_code(code) else {
            info!("unsupported command code {code}, ignoring");
            return Ok(());
        };

        if payload.len() != command.payload_len() {
            return Err(SensorError::AccessFault(format!(
                "{} expects a {}-byte payload, got {}",
                command.name(),
                command.payload_len(),
                payload.len()
            )));
        }

        if command.is_gated() && !self.device.is_available().await {
            debug!("{} refused, sensor unavailable", command.name());
            return Err(SensorError::Unavailable);
        }

        debug!("dispatching {}", command.name());
        match command {
            Command::Init => {
                payload[0] = TRANSPORT_ROUTE;
                Ok(())
            }
            Command::Exit => {
                info!("client requested exit");
                Ok(())
            }
            Command::Reset => {
                self.device.hardware_reset(RESET_HOLD).await;
                Ok(())
            }
            Command::EnableIrq => {
                self.device.enable_irq().await;
                Ok(())
            }
            Command::DisableIrq => {
                self.device.disable_irq().await;
                Ok(())
            }
            Command::EnableSpiClk => {
                let rate = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                info!("bus clock enable requested at {rate} Hz, nothing to do");
                Ok(())
            }
            Command::DisableSpiClk => {
                info!("bus clock disable requested, nothing to do");
                Ok(())
            }
            Command::EnablePower => self.device.power_on().await,
            Command::DisablePower => self.device.power_off().await,
            Command::KeyEvent => {
                let key_code = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let value = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
                let key = SensorKey::from_code(key_code);
                keymap::emit_key_event(self.input.as_ref(), key, value)
                    .map_err(|e| SensorError::Hardware(e.to_string()))
            }
            Command::EnterSleep => {
                info!("sensor entering low-power mode");
                Ok(())
            }
            Command::FwInfo => {
                // No in-band firmware query on this part.
                payload[0] = 0;
                Ok(())
            }
            Command::Remove => {
                info!("client requested removal, nothing to do");
                Ok(())
            }
            Command::ChipInfo => {
                let vendor_id = payload[0];
                let mode = payload[1];
                let operation = payload[2];
                info!("chip info: vendor_id=0x{vendor_id:02x} mode=0x{mode:02x} operation=0x{operation:02x}");
                Ok(())
            }
            Command::NavEvent => {
                if !self.config.get().await.nav_events {
                    info!("navigation events disabled by configuration");
                    return Ok(());
                }
                let gesture_code =
                    u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                let gesture = NavGesture::from_code(gesture_code);
                keymap::emit_nav_event(self.input.as_ref(), gesture)
                    .map_err(|e| SensorError::Hardware(e.to_string()))
            }
            Command::EnableGpio => self.device.partial_reinit().await,
            Command::ReleaseGpio => {
                self.device.release_gpio().await;
                Ok(())
            }
        }
    }
}
