//! GPIO character-device implementation of [`BoardIo`].

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use gpio_cdev::{Chip, EventRequestFlags, Line, LineHandle, LineRequestFlags};
use log::{debug, warn};

use crate::board::{BoardIo, BoardWiring, IrqStream};

struct Acquired {
    reset: LineHandle,
    power: LineHandle,
    irq: Line,
}

/// Drives the sensor's reset, power, and interrupt lines through gpiochip
/// line requests.
///
/// `acquire` replaces any previously held request wholesale; the kernel
/// releases the old requests when the handles drop.
#[derive(Default)]
pub struct GpioBoard {
    inner: Mutex<Option<Acquired>>,
}

impl GpioBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for GpioBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held = self.inner.lock().unwrap().is_some();
        f.debug_struct("GpioBoard").field("acquired", &held).finish()
    }
}

#[async_trait]
impl BoardIo for GpioBoard {
    async fn acquire(&self, wiring: &BoardWiring) -> Result<()> {
        let mut chip = Chip::new(&wiring.chip)
            .with_context(|| format!("opening GPIO chip {}", wiring.chip.display()))?;

        // Reset idles high, power idles low until the power command runs.
        let reset = chip
            .get_line(wiring.reset_line)?
            .request(LineRequestFlags::OUTPUT, 1, "fpsensord-reset")
            .with_context(|| format!("requesting reset line {}", wiring.reset_line))?;
        let power = chip
            .get_line(wiring.power_line)?
            .request(LineRequestFlags::OUTPUT, 0, "fpsensord-power")
            .with_context(|| format!("requesting power line {}", wiring.power_line))?;
        let irq = chip.get_line(wiring.irq_line)?;

        *self.inner.lock().unwrap() = Some(Acquired { reset, power, irq });
        debug!(
            "acquired GPIO lines on {} (reset={}, irq={}, power={})",
            wiring.chip.display(),
            wiring.reset_line,
            wiring.irq_line,
            wiring.power_line
        );
        Ok(())
    }

    fn release(&self) {
        if self.inner.lock().unwrap().take().is_some() {
            debug!("released GPIO lines");
        }
    }

    async fn power_on(&self) -> Result<()> {
        let guard = self.inner.lock().unwrap();
        let acquired = guard.as_ref().ok_or_else(|| anyhow!("GPIO lines not acquired"))?;
        acquired.power.set_value(1).context("driving power line high")
    }

    async fn power_off(&self) -> Result<()> {
        let guard = self.inner.lock().unwrap();
        let acquired = guard.as_ref().ok_or_else(|| anyhow!("GPIO lines not acquired"))?;
        acquired.power.set_value(0).context("driving power line low")
    }

    async fn reset_pulse(&self, hold: Duration) -> Result<()> {
        {
            let guard = self.inner.lock().unwrap();
            let acquired = guard.as_ref().ok_or_else(|| anyhow!("GPIO lines not acquired"))?;
            acquired.reset.set_value(0).context("driving reset line low")?;
        }

        tokio::time::sleep(hold).await;

        let guard = self.inner.lock().unwrap();
        let acquired = guard
            .as_ref()
            .ok_or_else(|| anyhow!("GPIO lines released mid-reset"))?;
        acquired.reset.set_value(1).context("returning reset line high")
    }

    fn set_irq_wake(&self, armed: bool) -> Result<()> {
        // Wake-source arming lives in the kernel's irqchip; from userspace
        // this is bookkeeping only.
        debug!("IRQ wake source {}", if armed { "armed" } else { "disarmed" });
        Ok(())
    }

    fn request_irq(&self) -> Result<IrqStream> {
        let guard = self.inner.lock().unwrap();
        let acquired = guard.as_ref().ok_or_else(|| anyhow!("GPIO lines not acquired"))?;

        let events = acquired
            .irq
            .async_events(
                LineRequestFlags::INPUT,
                EventRequestFlags::RISING_EDGE,
                "fpsensord-irq",
            )
            .context("requesting interrupt edge events")?;

        Ok(Box::pin(events.filter_map(|event| async move {
            match event {
                Ok(_) => Some(()),
                Err(e) => {
                    warn!("interrupt line event error: {e}");
                    None
                }
            }
        })))
    }
}
