//! Board wiring description and the hardware access boundary.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use futures::Stream;

use crate::config::BoardCfg;

/// Stream of interrupt pulses delivered by the board's IRQ line.
///
/// Each item is one rising edge; the stream ends when the line request is
/// released.
pub type IrqStream = Pin<Box<dyn Stream<Item = ()> + Send>>;

/// Validated GPIO wiring for the sensor.
///
/// All three lines are mandatory and must be pairwise distinct; a config that
/// violates either rule is the hardware/config fault of the reinit path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardWiring {
    /// Path to the GPIO character device.
    pub chip: PathBuf,
    /// Reset line offset on the chip.
    pub reset_line: u32,
    /// Interrupt line offset on the chip.
    pub irq_line: u32,
    /// Power enable line offset on the chip.
    pub power_line: u32,
}

impl BoardWiring {
    /// Parses and validates wiring from the board config section.
    pub fn from_cfg(cfg: &BoardCfg) -> Result<Self> {
        let Some(reset_line) = cfg.reset_line else {
            bail!("board wiring is missing reset_line");
        };
        let Some(irq_line) = cfg.irq_line else {
            bail!("board wiring is missing irq_line");
        };
        let Some(power_line) = cfg.power_line else {
            bail!("board wiring is missing power_line");
        };

        if reset_line == irq_line || reset_line == power_line || irq_line == power_line {
            bail!(
                "board wiring lines must be distinct (reset={reset_line}, irq={irq_line}, power={power_line})"
            );
        }

        Ok(Self {
            chip: cfg.chip.clone(),
            reset_line,
            irq_line,
            power_line,
        })
    }
}

/// Access boundary to the sensor's GPIO lines.
///
/// The core never touches hardware directly; everything goes through this
/// trait so the whole state machine is testable with an in-memory fake.
/// Blocking or sleeping operations are async; `set_irq_wake` and
/// `request_irq` are synchronous and bounded because they run under short
/// critical sections.
#[async_trait]
pub trait BoardIo: Send + Sync + fmt::Debug {
    /// (Re)acquires the wired lines. Any previously held request is replaced.
    async fn acquire(&self, wiring: &BoardWiring) -> Result<()>;

    /// Releases all held line requests. Safe to call when nothing is held.
    fn release(&self);

    /// Drives the power line high.
    async fn power_on(&self) -> Result<()>;

    /// Drives the power line low.
    async fn power_off(&self) -> Result<()>;

    /// Pulses the reset line low for `hold`, then returns it high.
    async fn reset_pulse(&self, hold: Duration) -> Result<()>;

    /// Marks the interrupt line as a system wake source (or unmarks it).
    ///
    /// Best-effort: callers log a failure and continue.
    fn set_irq_wake(&self, armed: bool) -> Result<()>;

    /// Requests edge events on the interrupt line.
    fn request_irq(&self) -> Result<IrqStream>;
}
