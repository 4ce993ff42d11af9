//! Device registry: session tracking, availability, and the reinit path.
//!
//! One async mutex guards the whole registry. Every lifecycle operation takes
//! it for the full duration of its transition, so observers never see a
//! half-applied state. The interrupt handler runs outside this lock by
//! design; see [`crate::irq`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::board::{BoardIo, BoardWiring, IrqStream};
use crate::config::ConfigManager;
use crate::error::SensorError;
use crate::irq::IrqController;

/// Reset pulse width used by the reinit path.
const REINIT_RESET_HOLD: Duration = Duration::from_millis(10);

/// A live interrupt listener task bound to one line request.
struct IrqRegistration {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl IrqRegistration {
    /// Stops the listener. Cancellation is advisory; abort guarantees the
    /// task is gone before the line request is dropped.
    fn release(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

#[derive(Default)]
struct DeviceState {
    attached: bool,
    available: bool,
    screen_off: bool,
    openers: HashSet<Uuid>,
    registration: Option<IrqRegistration>,
}

/// Owned registry for the one sensor this daemon manages.
pub struct SensorDevice {
    state: Mutex<DeviceState>,
    board: Arc<dyn BoardIo>,
    irq: Arc<IrqController>,
    config: ConfigManager,
}

impl SensorDevice {
    pub fn new(board: Arc<dyn BoardIo>, irq: Arc<IrqController>, config: ConfigManager) -> Self {
        Self {
            state: Mutex::new(DeviceState::default()),
            board,
            irq,
            config,
        }
    }

    /// Marks the daemon as attached to its hardware. Sessions are refused
    /// until this runs.
    pub async fn mark_attached(&self) {
        self.state.lock().await.attached = true;
    }

    /// Opens a session and returns its token.
    pub async fn open(&self) -> Result<Uuid, SensorError> {
        let mut state = self.state.lock().await;
        if !state.attached {
            return Err(SensorError::Unavailable);
        }

        let token = Uuid::new_v4();
        state.openers.insert(token);
        state.available = true;
        info!("session opened ({} active)", state.openers.len());
        Ok(token)
    }

    /// Releases a session. An unknown token is a warning and a no-op.
    ///
    /// The last release tears down in fixed order: wake source off, interrupt
    /// listener gone, availability cleared, then power. Later steps never see
    /// the resources freed by earlier ones.
    pub async fn release(&self, token: Uuid) {
        let mut state = self.state.lock().await;
        if !state.openers.remove(&token) {
            warn!("release for unknown session token {token}");
            return;
        }

        info!("session released ({} remaining)", state.openers.len());
        if !state.openers.is_empty() {
            return;
        }

        self.irq.disable();
        if let Some(registration) = state.registration.take() {
            registration.release();
        }
        state.available = false;
        if let Err(e) = self.board.power_off().await {
            warn!("power-off on last release failed: {e}");
        }
        info!("last session closed, sensor powered down");
    }

    /// Powers the sensor on. Already-on is an informational no-op.
    pub async fn power_on(&self) -> Result<(), SensorError> {
        let mut state = self.state.lock().await;
        if state.available {
            info!("sensor has already powered on");
            return Ok(());
        }
        self.board
            .power_on()
            .await
            .map_err(|e| SensorError::Hardware(e.to_string()))?;
        state.available = true;
        Ok(())
    }

    /// Powers the sensor off. Already-off is an informational no-op.
    pub async fn power_off(&self) -> Result<(), SensorError> {
        let mut state = self.state.lock().await;
        if !state.available {
            info!("sensor has already powered off");
            return Ok(());
        }
        self.board
            .power_off()
            .await
            .map_err(|e| SensorError::Hardware(e.to_string()))?;
        state.available = false;
        Ok(())
    }

    pub async fn enable_irq(&self) {
        let _state = self.state.lock().await;
        self.irq.enable();
    }

    pub async fn disable_irq(&self) {
        let _state = self.state.lock().await;
        self.irq.disable();
    }

    pub async fn is_available(&self) -> bool {
        self.state.lock().await.available
    }

    /// Records a screen blank/unblank transition.
    ///
    /// Returns whether the transition should be announced: an unavailable
    /// device swallows display notifications entirely.
    pub async fn note_screen_off(&self, off: bool) -> bool {
        let mut state = self.state.lock().await;
        if !state.available {
            debug!("display transition ignored, sensor unavailable");
            return false;
        }
        state.screen_off = off;
        true
    }

    /// (Re)initializes the hardware bindings: wiring parse, line acquisition,
    /// interrupt registration, then a reset pulse.
    ///
    /// Failure at any step unwinds to a fully released, unavailable device so
    /// a later enable-gpio command starts from a clean slate.
    pub async fn partial_reinit(&self) -> Result<(), SensorError> {
        let mut state = self.state.lock().await;
        state.available = true;

        let cfg = self.config.get().await;
        let wiring = match BoardWiring::from_cfg(&cfg.board) {
            Ok(wiring) => wiring,
            Err(e) => return Err(self.unwind(&mut state, e.to_string())),
        };
        drop(cfg);

        if let Err(e) = self.board.acquire(&wiring).await {
            return Err(self.unwind(&mut state, e.to_string()));
        }

        let stream = match self.board.request_irq() {
            Ok(stream) => stream,
            Err(e) => return Err(self.unwind(&mut state, e.to_string())),
        };

        if let Some(old) = state.registration.take() {
            old.release();
        }
        state.registration = Some(spawn_irq_listener(stream, self.irq.clone()));

        // Exercise the wake-source machinery once so it settles disabled.
        self.irq.enable();
        self.irq.disable();
        drop(state);

        self.hardware_reset(REINIT_RESET_HOLD).await;
        info!("sensor hardware initialized");
        Ok(())
    }

    fn unwind(&self, state: &mut DeviceState, reason: String) -> SensorError {
        if let Some(registration) = state.registration.take() {
            registration.release();
        }
        self.board.release();
        state.available = false;
        warn!("hardware init failed, sensor unavailable: {reason}");
        SensorError::Hardware(reason)
    }

    /// Pulses the reset line. Best-effort: a failed pulse is logged and the
    /// registry state is untouched.
    pub async fn hardware_reset(&self, hold: Duration) {
        if let Err(e) = self.board.reset_pulse(hold).await {
            warn!("reset pulse failed: {e}");
        }
    }

    /// Releases the GPIO bindings without touching availability, so a
    /// follow-up enable-gpio can rebind.
    pub async fn release_gpio(&self) {
        let mut state = self.state.lock().await;
        self.irq.disable();
        if let Some(registration) = state.registration.take() {
            registration.release();
        }
        self.board.release();
        info!("sensor GPIO bindings released");
    }

    /// System suspend notification. The wake-source registration set up via
    /// enable-irq does the actual work; this is bookkeeping.
    pub async fn on_suspend(&self) {
        info!("sensor suspend");
    }

    pub async fn on_resume(&self) {
        info!("sensor resume");
    }

    /// Final teardown on daemon shutdown.
    pub async fn detach(&self) {
        let mut state = self.state.lock().await;
        if let Some(registration) = state.registration.take() {
            registration.release();
        }
        self.board.release();
        state.attached = false;
        state.available = false;
    }

    #[cfg(test)]
    pub(crate) async fn session_count(&self) -> usize {
        self.state.lock().await.openers.len()
    }

    #[cfg(test)]
    pub(crate) async fn has_registration(&self) -> bool {
        self.state.lock().await.registration.is_some()
    }
}

/// Drains the interrupt edge stream into the interrupt handler until
/// cancelled or the line request is dropped.
fn spawn_irq_listener(mut stream: IrqStream, irq: Arc<IrqController>) -> IrqRegistration {
    let token = CancellationToken::new();
    let child = token.clone();
    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = child.cancelled() => break,
                edge = stream.next() => match edge {
                    Some(()) => {
                        irq.handle_interrupt();
                    }
                    None => {
                        debug!("interrupt stream closed");
                        break;
                    }
                },
            }
        }
    });
    IrqRegistration { token, handle }
}
